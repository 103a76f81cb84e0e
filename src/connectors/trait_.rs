//! Connector trait definition
//!
//! Defines the standard interface that all connector implementations must
//! follow, plus the normalized event value they emit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::types::{EventSeverity, EventSource};

/// Connector-specific error types for structured error handling
#[derive(Debug, Clone)]
pub enum ConnectorError {
    /// HTTP error from the upstream source
    HttpError { status: u16, body: Option<String> },
    /// Malformed response from the source
    MalformedResponse { details: String },
    /// Network or connectivity error
    NetworkError { details: String },
    /// Local I/O error (file feeds, subprocess failures)
    IoError { details: String },
    /// Configuration or setup error
    ConfigurationError { details: String },
    /// Unknown error
    Unknown { details: String },
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::HttpError { status, body } => {
                write!(
                    f,
                    "HTTP error {}: {}",
                    status,
                    body.as_deref().unwrap_or("No body")
                )
            }
            ConnectorError::MalformedResponse { details } => {
                write!(f, "Malformed response: {}", details)
            }
            ConnectorError::NetworkError { details } => write!(f, "Network error: {}", details),
            ConnectorError::IoError { details } => write!(f, "I/O error: {}", details),
            ConnectorError::ConfigurationError { details } => {
                write!(f, "Configuration error: {}", details)
            }
            ConnectorError::Unknown { details } => write!(f, "Unknown error: {}", details),
        }
    }
}

impl std::error::Error for ConnectorError {}

/// Normalized event value emitted by connectors.
///
/// Stores hold canonical copies; connectors return fresh values. The id is
/// assigned at construction so the dead-letter queue can key rows before the
/// event ever reaches the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub id: Uuid,
    pub source: EventSource,
    pub event_type: String,
    pub severity: EventSeverity,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

impl NormalizedEvent {
    pub fn new(
        source: EventSource,
        event_type: impl Into<String>,
        severity: EventSeverity,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            event_type: event_type.into(),
            severity,
            occurred_at,
            payload: JsonValue::Object(serde_json::Map::new()),
            tags: Vec::new(),
            source_ref: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }
}

/// A raw item that failed per-event transformation. Valid siblings still
/// flow; rejects are logged and, when they carry an identifier, dead-lettered.
#[derive(Debug, Clone)]
pub struct RejectedItem {
    pub source_ref: Option<String>,
    pub error: String,
    pub raw: JsonValue,
}

/// Result of a single fetch-and-transform pass over the source.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub events: Vec<NormalizedEvent>,
    pub rejects: Vec<RejectedItem>,
}

impl SourceBatch {
    pub fn from_events(events: Vec<NormalizedEvent>) -> Self {
        Self {
            events,
            rejects: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// The source this connector pulls from.
    fn source(&self) -> EventSource;

    /// Fetch a raw batch from the source and transform it into normalized
    /// events. Raised errors are trapped by the harness and drive the retry
    /// loop; per-item failures belong in the batch's rejects instead.
    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError>;
}
