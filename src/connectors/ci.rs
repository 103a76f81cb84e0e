//! CI connector
//!
//! Pulls recent CI runs and emits one `ci_run` event per run. Severity is
//! inferred from the run status: failure patterns map to high, success
//! patterns to low, anything else (queued, in progress) to medium.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Value as JsonValue, json};
use std::sync::LazyLock;
use url::Url;

use crate::connectors::http::fetch_json;
use crate::connectors::trait_::{
    Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch,
};
use crate::models::types::{EventSeverity, EventSource};

static FAILURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"failed|failure|error|errored|broken|cancelled|aborted|timeout|timed_out")
        .expect("failure pattern compiles")
});

static SUCCESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"success|passed|completed|succeeded").expect("success pattern compiles"));

/// Where CI runs come from.
pub enum CiFeed {
    /// HTTP endpoint returning a JSON array of runs
    Http(Url),
    /// Pre-populated runs, used by tests
    Static(Vec<JsonValue>),
}

/// Monitor CI pipelines for run results.
pub struct CiConnector {
    feed: CiFeed,
    client: reqwest::Client,
}

impl CiConnector {
    pub fn new(feed: CiFeed) -> Self {
        Self {
            feed,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_runs(&self) -> Result<Vec<JsonValue>, ConnectorError> {
        match &self.feed {
            CiFeed::Static(runs) => Ok(runs.clone()),
            CiFeed::Http(url) => {
                let body = fetch_json(&self.client, url).await?;
                match body {
                    JsonValue::Array(runs) => Ok(runs),
                    _ => Err(ConnectorError::MalformedResponse {
                        details: "CI endpoint did not return an array".to_string(),
                    }),
                }
            }
        }
    }

    fn transform_run(&self, run: &JsonValue) -> Result<NormalizedEvent, String> {
        let run_id = run
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "run has no id".to_string())?;
        let status = run
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "run has no status".to_string())?
            .to_lowercase();
        let run_time = run
            .get("run_time")
            .or_else(|| run.get("timestamp"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| "run has no run_time".to_string())?;

        let occurred_at = DateTime::parse_from_rfc3339(run_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| format!("invalid run_time '{}': {}", run_time, err))?;

        let severity = classify_status(&status);

        let workflow = run
            .get("workflow")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let branch = run.get("branch").and_then(|v| v.as_str()).unwrap_or("");
        let duration = run
            .get("duration_seconds")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let event = NormalizedEvent::new(EventSource::Ci, "ci_run", severity, occurred_at)
            .with_payload(json!({
                "job": workflow,
                "workflow": workflow,
                "status": status,
                "branch": branch,
                "commit": run.get("commit"),
                "message": format!("CI {}: {}", workflow, status),
                "duration_seconds": duration,
                "jobs_count": run.get("jobs"),
                "artifacts_count": run.get("artifacts"),
            }))
            .with_tags(vec![
                "ci".to_string(),
                status.clone(),
                workflow.to_string(),
            ])
            .with_source_ref(run_id);

        Ok(event)
    }
}

#[async_trait]
impl Connector for CiConnector {
    fn source(&self) -> EventSource {
        EventSource::Ci
    }

    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError> {
        let runs = self.fetch_runs().await?;
        let mut batch = SourceBatch::default();

        for run in &runs {
            match self.transform_run(run) {
                Ok(event) => batch.events.push(event),
                Err(error) => batch.rejects.push(RejectedItem {
                    source_ref: run.get("id").and_then(|v| v.as_str()).map(str::to_string),
                    error,
                    raw: run.clone(),
                }),
            }
        }

        Ok(batch)
    }
}

fn classify_status(status: &str) -> EventSeverity {
    if FAILURE_PATTERN.is_match(status) {
        EventSeverity::High
    } else if SUCCESS_PATTERN.is_match(status) {
        EventSeverity::Low
    } else {
        EventSeverity::Medium
    }
}
