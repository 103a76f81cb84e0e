//! Traces connector
//!
//! Pulls distributed traces and emits latency and error events: one
//! `slow_trace` event per trace whose total duration crosses a threshold
//! tier, and one `span_error` event per span tagged `error=true`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use url::Url;

use crate::connectors::http::fetch_json;
use crate::connectors::trait_::{
    Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch,
};
use crate::models::types::{EventSeverity, EventSource};

/// Latency tiers in milliseconds, checked most severe first.
const LATENCY_TIERS: [(EventSeverity, f64); 3] = [
    (EventSeverity::Critical, 5000.0),
    (EventSeverity::High, 1000.0),
    (EventSeverity::Medium, 500.0),
];

/// Where traces come from.
pub enum TracesFeed {
    /// HTTP endpoint returning a JSON array of traces
    Http(Url),
    /// Pre-populated traces, used by tests
    Static(Vec<JsonValue>),
}

/// Collect and analyze traces to detect performance issues.
pub struct TracesConnector {
    feed: TracesFeed,
    client: reqwest::Client,
}

impl TracesConnector {
    pub fn new(feed: TracesFeed) -> Self {
        Self {
            feed,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_traces(&self) -> Result<Vec<JsonValue>, ConnectorError> {
        match &self.feed {
            TracesFeed::Static(traces) => Ok(traces.clone()),
            TracesFeed::Http(url) => {
                let body = fetch_json(&self.client, url).await?;
                match body {
                    JsonValue::Array(traces) => Ok(traces),
                    // Jaeger-style envelope: {"data": [...]}
                    JsonValue::Object(mut map) => match map.remove("data") {
                        Some(JsonValue::Array(traces)) => Ok(traces),
                        _ => Err(ConnectorError::MalformedResponse {
                            details: "traces endpoint did not return an array".to_string(),
                        }),
                    },
                    _ => Err(ConnectorError::MalformedResponse {
                        details: "traces endpoint did not return an array".to_string(),
                    }),
                }
            }
        }
    }

    fn analyze_trace(&self, trace: &JsonValue) -> Result<Vec<NormalizedEvent>, String> {
        let trace_id = trace
            .get("traceID")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "trace has no traceID".to_string())?;
        let spans = trace
            .get("spans")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut events = Vec::new();

        if let Some(slow) = self.detect_slow_trace(trace, trace_id, &spans) {
            events.push(slow);
        }
        events.extend(self.detect_span_errors(trace, trace_id, &spans));

        Ok(events)
    }

    fn detect_slow_trace(
        &self,
        trace: &JsonValue,
        trace_id: &str,
        spans: &[JsonValue],
    ) -> Option<NormalizedEvent> {
        if spans.is_empty() {
            return None;
        }

        // Total duration = max span end - min span start, microseconds to ms.
        let starts: Vec<f64> = spans
            .iter()
            .map(|span| span.get("startTime").and_then(|v| v.as_f64()).unwrap_or(0.0))
            .collect();
        let ends: Vec<f64> = spans
            .iter()
            .map(|span| {
                let start = span.get("startTime").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let duration = span.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0);
                start + duration
            })
            .collect();

        let min_start = starts.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_end = ends.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let total_duration_ms = (max_end - min_start) / 1000.0;

        let (severity, threshold_ms) = LATENCY_TIERS
            .iter()
            .find(|(_, threshold)| total_duration_ms > *threshold)
            .copied()?;

        let slowest_span = spans.iter().max_by(|a, b| {
            let da = a.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let db = b.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })?;

        let event = NormalizedEvent::new(EventSource::Traces, "slow_trace", severity, Utc::now())
            .with_payload(json!({
                "trace_id": trace_id,
                "service": service_name(trace),
                "total_duration_ms": total_duration_ms,
                "threshold_ms": threshold_ms,
                "slowest_span": slowest_span.get("operationName"),
                "slowest_span_duration_ms":
                    slowest_span.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0) / 1000.0,
                "span_count": spans.len(),
            }))
            .with_tags(vec!["slow_trace".to_string(), "performance".to_string()])
            .with_source_ref(format!("trace:{}", trace_id));

        Some(event)
    }

    fn detect_span_errors(
        &self,
        trace: &JsonValue,
        trace_id: &str,
        spans: &[JsonValue],
    ) -> Vec<NormalizedEvent> {
        let mut events = Vec::new();

        for span in spans {
            if !span_has_error_tag(span) {
                continue;
            }

            let span_id = span.get("spanID").and_then(|v| v.as_str()).unwrap_or("");
            let error_message = extract_error_message(span);

            let event = NormalizedEvent::new(
                EventSource::Traces,
                "span_error",
                EventSeverity::High,
                Utc::now(),
            )
            .with_payload(json!({
                "trace_id": trace_id,
                "span_id": span_id,
                "operation": span.get("operationName"),
                "error_message": error_message,
                "service": service_name(trace),
            }))
            .with_tags(vec!["span_error".to_string(), "error".to_string()])
            .with_source_ref(format!("span:{}", span_id));

            events.push(event);
        }

        events
    }
}

#[async_trait]
impl Connector for TracesConnector {
    fn source(&self) -> EventSource {
        EventSource::Traces
    }

    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError> {
        let traces = self.fetch_traces().await?;
        let mut batch = SourceBatch::default();

        for trace in &traces {
            match self.analyze_trace(trace) {
                Ok(events) => batch.events.extend(events),
                Err(error) => {
                    let source_ref = trace
                        .get("traceID")
                        .and_then(|v| v.as_str())
                        .map(|id| format!("trace:{}", id));
                    batch.rejects.push(RejectedItem {
                        source_ref,
                        error,
                        raw: trace.clone(),
                    });
                }
            }
        }

        Ok(batch)
    }
}

fn service_name(trace: &JsonValue) -> Option<String> {
    trace
        .get("processes")
        .and_then(|p| p.get("p1"))
        .and_then(|p| p.get("serviceName"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn span_has_error_tag(span: &JsonValue) -> bool {
    span.get("tags")
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter().any(|tag| {
                tag.get("key").and_then(|k| k.as_str()) == Some("error")
                    && match tag.get("value") {
                        Some(JsonValue::Bool(flag)) => *flag,
                        Some(JsonValue::String(s)) => s == "true",
                        // Jaeger emits bare `error` tags without a value.
                        None => true,
                        _ => false,
                    }
            })
        })
        .unwrap_or(false)
}

fn extract_error_message(span: &JsonValue) -> Option<String> {
    let logs = span.get("logs").and_then(|v| v.as_array())?;

    for log in logs {
        let Some(fields) = log.get("fields").and_then(|v| v.as_array()) else {
            continue;
        };
        for field in fields {
            let key = field.get("key").and_then(|k| k.as_str());
            if matches!(key, Some("message") | Some("error.msg")) {
                if let Some(value) = field.get("value").and_then(|v| v.as_str()) {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}
