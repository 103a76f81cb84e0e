//! Connectors module
//!
//! This module provides the signal ingestion SDK including:
//! - The `Connector` trait defining the interface for all source adapters
//! - The resilience primitives (retry policy, circuit breaker) and the
//!   harness that composes them with the dead-letter queue
//! - The concrete connector implementations (git, ci, logs, metrics, traces)

pub mod ci;
pub mod git;
pub mod harness;
mod http;
pub mod logs;
pub mod metrics;
pub mod registry;
pub mod resilience;
pub mod traces;
pub mod trait_;

pub use harness::ConnectorHarness;
pub use registry::{ConnectorRegistry, RegistryError};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState, RetryPolicy,
};
pub use trait_::{Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch};

pub use ci::{CiConnector, CiFeed};
pub use git::GitConnector;
pub use logs::{LogFeed, LogsConnector};
pub use metrics::{MetricsConnector, MetricsFeed};
pub use traces::{TracesConnector, TracesFeed};
