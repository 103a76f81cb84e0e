//! Metrics connector
//!
//! Pulls metric series (current value plus history window) and emits anomaly
//! events when the z-score of the current value against the historical
//! baseline exceeds the per-metric-type threshold.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use url::Url;

use crate::connectors::http::fetch_json;
use crate::connectors::trait_::{
    Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch,
};
use crate::models::types::{EventSeverity, EventSource};

/// Where metric series come from.
pub enum MetricsFeed {
    /// HTTP endpoint returning `{ "<name>": { "value": f64, "history": [f64] } }`
    Http(Url),
    /// Pre-populated series, used by tests
    Static(BTreeMap<String, JsonValue>),
}

/// Collect and analyze metrics to detect anomalies.
pub struct MetricsConnector {
    feed: MetricsFeed,
    client: reqwest::Client,
}

impl MetricsConnector {
    pub fn new(feed: MetricsFeed) -> Self {
        Self {
            feed,
            client: reqwest::Client::new(),
        }
    }

    /// Detection threshold in standard deviations for a metric type.
    fn threshold_for(metric_type: &str) -> f64 {
        match metric_type {
            "latency" => 2.5,
            _ => 2.0,
        }
    }

    async fn fetch_series(&self) -> Result<BTreeMap<String, JsonValue>, ConnectorError> {
        match &self.feed {
            MetricsFeed::Static(series) => Ok(series.clone()),
            MetricsFeed::Http(url) => {
                let body = fetch_json(&self.client, url).await?;
                let JsonValue::Object(map) = body else {
                    return Err(ConnectorError::MalformedResponse {
                        details: "metrics endpoint did not return an object".to_string(),
                    });
                };
                Ok(map.into_iter().collect())
            }
        }
    }

    fn detect_anomaly(
        &self,
        metric_name: &str,
        series: &JsonValue,
    ) -> Result<Option<NormalizedEvent>, String> {
        let value = series
            .get("value")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| format!("metric {} has no numeric value", metric_name))?;

        let history: Vec<f64> = series
            .get("history")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|item| item.as_f64()).collect())
            .unwrap_or_default();

        // A baseline needs at least two samples and some variance.
        if history.len() < 2 {
            return Ok(None);
        }

        let mean = history.iter().sum::<f64>() / history.len() as f64;
        let variance = history
            .iter()
            .map(|sample| (sample - mean).powi(2))
            .sum::<f64>()
            / (history.len() - 1) as f64;
        let stdev = variance.sqrt();

        if stdev == 0.0 {
            return Ok(None);
        }

        let z_score = (value - mean) / stdev;
        let metric_type = classify_metric(metric_name);
        let threshold = Self::threshold_for(metric_type);

        if z_score.abs() < threshold {
            return Ok(None);
        }

        let severity = classify_severity(z_score, threshold);

        let event = NormalizedEvent::new(
            EventSource::Metrics,
            "metric_anomaly",
            severity,
            Utc::now(),
        )
        .with_payload(json!({
            "metric_name": metric_name,
            "current_value": value,
            "baseline_mean": mean,
            "baseline_stdev": stdev,
            "z_score": z_score,
            "threshold": threshold,
            "metric_type": metric_type,
        }))
        .with_tags(vec![metric_type.to_string(), "anomaly".to_string()])
        .with_source_ref(format!("metrics:{}", metric_name));

        Ok(Some(event))
    }
}

#[async_trait]
impl Connector for MetricsConnector {
    fn source(&self) -> EventSource {
        EventSource::Metrics
    }

    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError> {
        let series_map = self.fetch_series().await?;
        let mut batch = SourceBatch::default();

        for (name, series) in &series_map {
            match self.detect_anomaly(name, series) {
                Ok(Some(event)) => batch.events.push(event),
                Ok(None) => {}
                Err(error) => batch.rejects.push(RejectedItem {
                    source_ref: Some(format!("metrics:{}", name)),
                    error,
                    raw: series.clone(),
                }),
            }
        }

        Ok(batch)
    }
}

/// Classify metric type by name substring.
fn classify_metric(metric_name: &str) -> &'static str {
    let name = metric_name.to_lowercase();

    if name.contains("cpu") || name.contains("processor") {
        "cpu"
    } else if name.contains("memory") || name.contains("mem") || name.contains("heap") {
        "memory"
    } else if name.contains("disk") || name.contains("io") {
        "disk"
    } else if name.contains("latency") || name.contains("duration") || name.contains("response_time")
    {
        "latency"
    } else if name.contains("error") || name.contains("failure") {
        "error_rate"
    } else {
        "other"
    }
}

/// Severity scales with how far past the threshold the z-score landed.
fn classify_severity(z_score: f64, threshold: f64) -> EventSeverity {
    let abs_z = z_score.abs();

    if abs_z > threshold * 2.0 {
        EventSeverity::Critical
    } else if abs_z > threshold * 1.5 {
        EventSeverity::High
    } else {
        EventSeverity::Medium
    }
}
