//! Connector registry
//!
//! Holds the harnessed connector instances the service was configured with.
//! Built once at startup and shared through the application state; a
//! connector is only registered when its source location is configured.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::config::AppConfig;
use crate::connectors::ci::{CiConnector, CiFeed};
use crate::connectors::git::GitConnector;
use crate::connectors::harness::ConnectorHarness;
use crate::connectors::logs::{LogFeed, LogsConnector};
use crate::connectors::metrics::{MetricsConnector, MetricsFeed};
use crate::connectors::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
use crate::connectors::trait_::Connector;
use crate::connectors::traces::{TracesConnector, TracesFeed};
use crate::models::types::EventSource;
use crate::repositories::DlqRepository;

/// Error type for registry operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Connector '{source_name}' not registered")]
    SourceNotRegistered { source_name: String },
}

/// Registry of harnessed connectors, keyed by source.
pub struct ConnectorRegistry {
    harnesses: BTreeMap<&'static str, Arc<ConnectorHarness>>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            harnesses: BTreeMap::new(),
        }
    }

    /// Build the registry from configuration. Connectors with unusable
    /// settings are skipped with a warning rather than failing startup.
    pub fn from_config(
        config: &AppConfig,
        dlq: DlqRepository,
        shutdown: CancellationToken,
    ) -> Self {
        let mut registry = Self::new();
        let retry = RetryPolicy::from_config(&config.retry);
        let breaker_config = CircuitBreakerConfig::from_config(&config.circuit);

        let mut register = |connector: Arc<dyn Connector>| {
            registry.register(Arc::new(ConnectorHarness::new(
                connector,
                retry,
                CircuitBreaker::new(breaker_config),
                dlq.clone(),
                shutdown.clone(),
            )));
        };

        if let Some(repo_path) = &config.connectors.git_repo_path {
            register(Arc::new(GitConnector::new(
                repo_path.clone(),
                config.connectors.git_lookback_commits,
            )));
        }

        if let Some(endpoint) = &config.connectors.ci_endpoint {
            match Url::parse(endpoint) {
                Ok(url) => register(Arc::new(CiConnector::new(CiFeed::Http(url)))),
                Err(err) => warn!(endpoint, error = %err, "CI connector not registered: invalid endpoint"),
            }
        }

        if let Some(path) = &config.connectors.logs_path {
            register(Arc::new(LogsConnector::new(LogFeed::File(path.into()))));
        }

        if let Some(endpoint) = &config.connectors.metrics_endpoint {
            match Url::parse(endpoint) {
                Ok(url) => register(Arc::new(MetricsConnector::new(MetricsFeed::Http(url)))),
                Err(err) => {
                    warn!(endpoint, error = %err, "Metrics connector not registered: invalid endpoint")
                }
            }
        }

        if let Some(endpoint) = &config.connectors.traces_endpoint {
            match Url::parse(endpoint) {
                Ok(url) => register(Arc::new(TracesConnector::new(TracesFeed::Http(url)))),
                Err(err) => {
                    warn!(endpoint, error = %err, "Traces connector not registered: invalid endpoint")
                }
            }
        }

        registry
    }

    /// Register a harnessed connector under its source.
    pub fn register(&mut self, harness: Arc<ConnectorHarness>) {
        self.harnesses.insert(harness.source().as_str(), harness);
    }

    /// Get the harness for a source.
    pub fn get(&self, source: EventSource) -> Result<Arc<ConnectorHarness>, RegistryError> {
        self.harnesses
            .get(source.as_str())
            .cloned()
            .ok_or_else(|| RegistryError::SourceNotRegistered {
                source_name: source.to_string(),
            })
    }

    /// All registered harnesses in stable (source-name) order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConnectorHarness>> {
        self.harnesses.values()
    }

    /// Registered sources in stable order.
    pub fn sources(&self) -> Vec<EventSource> {
        self.harnesses
            .values()
            .map(|harness| harness.source())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.harnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.harnesses.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
