//! Logs connector
//!
//! Parses structured JSON log lines into events: filters to warning level and
//! above, infers severity from level and message content, and extracts
//! request/service context fields.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::connectors::trait_::{
    Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch,
};
use crate::models::types::{EventSeverity, EventSource};

/// Where the connector reads log lines from.
pub enum LogFeed {
    /// JSON-lines file on disk
    File(PathBuf),
    /// Pre-parsed entries, used by tests and manual replays
    Static(Vec<JsonValue>),
}

/// Collect and parse structured logs into events.
pub struct LogsConnector {
    feed: LogFeed,
}

impl LogsConnector {
    pub fn new(feed: LogFeed) -> Self {
        Self { feed }
    }

    fn feed_name(&self) -> String {
        match &self.feed {
            LogFeed::File(path) => path.display().to_string(),
            LogFeed::Static(_) => "static".to_string(),
        }
    }

    async fn fetch_entries(&self) -> Result<Vec<Result<JsonValue, String>>, ConnectorError> {
        match &self.feed {
            LogFeed::Static(entries) => Ok(entries.iter().cloned().map(Ok).collect()),
            LogFeed::File(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
                    ConnectorError::IoError {
                        details: format!("failed to read {}: {}", path.display(), err),
                    }
                })?;

                Ok(contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| {
                        serde_json::from_str::<JsonValue>(line)
                            .map_err(|err| format!("invalid JSON line: {}", err))
                    })
                    .collect())
            }
        }
    }

    fn parse_entry(&self, entry: &JsonValue) -> Result<Option<NormalizedEvent>, String> {
        let level = entry
            .get("level")
            .and_then(|v| v.as_str())
            .unwrap_or("info")
            .to_lowercase();

        // Only warning level and above become events.
        if !matches!(
            level.as_str(),
            "warn" | "warning" | "error" | "critical" | "fatal"
        ) {
            return Ok(None);
        }

        let message = entry
            .get("message")
            .or_else(|| entry.get("msg"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let timestamp_raw = entry.get("timestamp").and_then(|v| v.as_str());
        let occurred_at = match timestamp_raw {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| format!("invalid timestamp '{}': {}", raw, err))?,
            None => Utc::now(),
        };

        let severity = classify_severity(&level, &message);
        let context = extract_context(entry);
        let tags = extract_tags(entry, &level, &message);

        let mut payload = serde_json::Map::new();
        payload.insert("level".to_string(), JsonValue::String(level));
        payload.insert("message".to_string(), JsonValue::String(message));
        for (key, value) in context {
            payload.insert(key, value);
        }

        let source_ref = timestamp_raw.map(|ts| format!("{}:{}", self.feed_name(), ts));

        let mut event = NormalizedEvent::new(EventSource::Logs, "log_entry", severity, occurred_at)
            .with_payload(JsonValue::Object(payload))
            .with_tags(tags);
        if let Some(source_ref) = source_ref {
            event = event.with_source_ref(source_ref);
        }

        Ok(Some(event))
    }
}

#[async_trait]
impl Connector for LogsConnector {
    fn source(&self) -> EventSource {
        EventSource::Logs
    }

    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError> {
        let entries = self.fetch_entries().await?;
        let mut batch = SourceBatch::default();

        for entry in entries {
            match entry {
                Err(parse_error) => {
                    batch.rejects.push(RejectedItem {
                        source_ref: None,
                        error: parse_error,
                        raw: JsonValue::Null,
                    });
                }
                Ok(raw) => match self.parse_entry(&raw) {
                    Ok(Some(event)) => batch.events.push(event),
                    Ok(None) => {}
                    Err(error) => {
                        let source_ref = raw
                            .get("timestamp")
                            .and_then(|v| v.as_str())
                            .map(|ts| format!("{}:{}", self.feed_name(), ts));
                        batch.rejects.push(RejectedItem {
                            source_ref,
                            error,
                            raw,
                        });
                    }
                },
            }
        }

        Ok(batch)
    }
}

fn classify_severity(level: &str, message: &str) -> EventSeverity {
    match level {
        "critical" | "fatal" => EventSeverity::Critical,
        "error" => EventSeverity::High,
        "warn" | "warning" => {
            let message_lower = message.to_lowercase();
            if ["deadlock", "timeout", "out of memory"]
                .iter()
                .any(|needle| message_lower.contains(needle))
            {
                EventSeverity::High
            } else {
                EventSeverity::Medium
            }
        }
        _ => EventSeverity::Low,
    }
}

fn extract_context(entry: &JsonValue) -> Vec<(String, JsonValue)> {
    let mut context = Vec::new();

    if let Some(trace) = entry.get("stacktrace").or_else(|| entry.get("stack_trace")) {
        context.push(("stack_trace".to_string(), trace.clone()));
    }

    for field in [
        "request_id",
        "trace_id",
        "correlation_id",
        "request_path",
        "method",
        "user_id",
    ] {
        if let Some(value) = entry.get(field) {
            context.push((field.to_string(), value.clone()));
        }
    }

    if let Some(service) = entry.get("service").or_else(|| entry.get("component")) {
        context.push(("service".to_string(), service.clone()));
    }

    context
}

fn extract_tags(entry: &JsonValue, level: &str, message: &str) -> Vec<String> {
    let mut tags = Vec::new();

    if matches!(level, "error" | "critical" | "fatal") {
        tags.push("error".to_string());
    }
    if matches!(level, "warn" | "warning") {
        tags.push("warning".to_string());
    }

    if let Some(service) = entry.get("service").and_then(|v| v.as_str()) {
        tags.push(format!("service:{}", service));
    }

    let message_lower = message.to_lowercase();
    if message_lower.contains("timeout") {
        tags.push("timeout".to_string());
    }
    if message_lower.contains("connection") {
        tags.push("connection_error".to_string());
    }
    if message_lower.contains("authentication") || message_lower.contains("permission") {
        tags.push("auth_error".to_string());
    }
    if message_lower.contains("database") || message_lower.contains("sql") {
        tags.push("database".to_string());
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn collect_static(entries: Vec<JsonValue>) -> SourceBatch {
        LogsConnector::new(LogFeed::Static(entries))
            .fetch_and_transform()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn error_log_becomes_high_severity_event() {
        let batch = collect_static(vec![json!({
            "level": "error",
            "message": "Database connection failed",
            "timestamp": "2026-01-27T10:00:00Z",
            "service": "api",
        })])
        .await;

        assert_eq!(batch.events.len(), 1);
        let event = &batch.events[0];
        assert_eq!(event.source, EventSource::Logs);
        assert_eq!(event.event_type, "log_entry");
        assert_eq!(event.severity, EventSeverity::High);
        assert_eq!(
            event.occurred_at,
            DateTime::parse_from_rfc3339("2026-01-27T10:00:00Z").unwrap()
        );

        for tag in ["error", "connection_error", "database"] {
            assert!(event.tags.contains(&tag.to_string()), "missing tag {}", tag);
        }
        assert_eq!(event.payload["service"], "api");
    }

    #[tokio::test]
    async fn info_logs_are_skipped() {
        let batch = collect_static(vec![
            json!({"level": "info", "message": "started"}),
            json!({"level": "debug", "message": "noise"}),
        ])
        .await;

        assert!(batch.events.is_empty());
        assert!(batch.rejects.is_empty());
    }

    #[tokio::test]
    async fn warning_with_timeout_escalates_to_high() {
        let batch = collect_static(vec![json!({
            "level": "warning",
            "message": "request timeout while calling billing",
            "timestamp": "2026-01-27T10:00:00Z",
        })])
        .await;

        assert_eq!(batch.events[0].severity, EventSeverity::High);
        assert!(batch.events[0].tags.contains(&"warning".to_string()));
        assert!(batch.events[0].tags.contains(&"timeout".to_string()));
    }

    #[tokio::test]
    async fn plain_warning_is_medium() {
        let batch = collect_static(vec![json!({
            "level": "warn",
            "message": "cache miss rate rising",
        })])
        .await;

        assert_eq!(batch.events[0].severity, EventSeverity::Medium);
    }

    #[tokio::test]
    async fn fatal_is_critical_and_context_extracted() {
        let batch = collect_static(vec![json!({
            "level": "fatal",
            "message": "segfault in worker",
            "timestamp": "2026-01-27T11:00:00Z",
            "stack_trace": "0x0001 ...",
            "request_id": "req-9",
            "trace_id": "trace-4",
            "component": "worker",
        })])
        .await;

        let event = &batch.events[0];
        assert_eq!(event.severity, EventSeverity::Critical);
        assert_eq!(event.payload["stack_trace"], "0x0001 ...");
        assert_eq!(event.payload["request_id"], "req-9");
        assert_eq!(event.payload["trace_id"], "trace-4");
        assert_eq!(event.payload["service"], "worker");
    }

    #[tokio::test]
    async fn bad_timestamp_rejects_item_but_siblings_survive() {
        let batch = collect_static(vec![
            json!({
                "level": "error",
                "message": "good entry",
                "timestamp": "2026-01-27T10:00:00Z",
            }),
            json!({
                "level": "error",
                "message": "bad entry",
                "timestamp": "not-a-time",
            }),
        ])
        .await;

        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.rejects.len(), 1);
        assert!(batch.rejects[0].error.contains("invalid timestamp"));
        assert!(batch.rejects[0].source_ref.as_deref().unwrap().contains("not-a-time"));
    }

    #[tokio::test]
    async fn reads_json_lines_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{}",
            json!({"level": "error", "message": "disk failure", "timestamp": "2026-01-27T09:00:00Z"})
        )
        .unwrap();
        writeln!(file, "not json at all").unwrap();

        let connector = LogsConnector::new(LogFeed::File(file.path().to_path_buf()));
        let batch = connector.fetch_and_transform().await.unwrap();

        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.rejects.len(), 1);
        assert!(batch.rejects[0].source_ref.is_none());
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let connector = LogsConnector::new(LogFeed::File(PathBuf::from("/nonexistent/app.log")));
        let result = connector.fetch_and_transform().await;
        assert!(matches!(result, Err(ConnectorError::IoError { .. })));
    }
}
