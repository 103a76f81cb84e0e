//! Connector resilience harness
//!
//! Wraps a concrete connector with the shared retry policy, circuit breaker,
//! and dead-letter queue. `collect()` is the single public entry point for
//! ingestion; it traps every error, so operators observe failure through the
//! circuit state and DLQ contents rather than through crashes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::counter;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::connectors::resilience::{CircuitBreaker, CircuitSnapshot, RetryPolicy};
use crate::connectors::trait_::{Connector, NormalizedEvent, RejectedItem};
use crate::models::types::{EventSeverity, EventSource};
use crate::repositories::DlqRepository;

/// A connector composed with its resilience wrapper.
///
/// The harness owns the circuit breaker exclusively and holds a handle to the
/// shared DLQ store. Collect invocations are serialized per instance.
pub struct ConnectorHarness {
    connector: Arc<dyn Connector>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    dlq: DlqRepository,
    collect_lock: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl ConnectorHarness {
    pub fn new(
        connector: Arc<dyn Connector>,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
        dlq: DlqRepository,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            connector,
            retry,
            breaker,
            dlq,
            collect_lock: tokio::sync::Mutex::new(()),
            shutdown,
        }
    }

    pub fn source(&self) -> EventSource {
        self.connector.source()
    }

    pub fn dlq(&self) -> &DlqRepository {
        &self.dlq
    }

    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.breaker.snapshot()
    }

    /// Collect a batch of normalized events from the source.
    ///
    /// 1. A disallowing circuit returns an empty list immediately.
    /// 2. Each attempt runs under the remaining share of `deadline`; success
    ///    records on the circuit and returns the batch, failure sleeps the
    ///    retry delay and tries again until attempts are exhausted, which
    ///    records a circuit failure and returns an empty list.
    /// 3. Per-item rejects are logged and, when they carry a source
    ///    identifier, appended to the DLQ; valid siblings still return.
    ///
    /// Deadline expiry cancels the in-flight attempt and returns what has
    /// been produced so far without touching the circuit.
    pub async fn collect(&self, deadline: Duration) -> Vec<NormalizedEvent> {
        let _guard = self.collect_lock.lock().await;
        let source = self.source();

        if !self.breaker.can_execute() {
            warn!(source = %source, "Circuit breaker open, skipping collect");
            counter!("connector_collect_skipped_total", "source" => source.as_str()).increment(1);
            return Vec::new();
        }

        let started = Instant::now();
        let max_retries = self.retry.max_retries;

        for attempt in 0..=max_retries {
            let Some(remaining) = deadline.checked_sub(started.elapsed()) else {
                warn!(source = %source, "Collect deadline expired before attempt");
                return Vec::new();
            };

            match tokio::time::timeout(remaining, self.connector.fetch_and_transform()).await {
                Err(_elapsed) => {
                    warn!(source = %source, attempt, "Collect deadline expired mid-attempt");
                    return Vec::new();
                }
                Ok(Ok(batch)) => {
                    self.breaker.record_success();
                    self.handle_rejects(source, &batch.rejects).await;

                    counter!("connector_events_collected_total", "source" => source.as_str())
                        .increment(batch.events.len() as u64);
                    debug!(
                        source = %source,
                        events = batch.events.len(),
                        rejects = batch.rejects.len(),
                        "Collect succeeded"
                    );
                    return batch.events;
                }
                Ok(Err(err)) => {
                    warn!(
                        source = %source,
                        attempt = attempt + 1,
                        error = %err,
                        "Collection attempt failed"
                    );

                    if attempt < max_retries {
                        let delay = self.retry.delay(attempt as i32);
                        debug!(source = %source, delay_ms = delay.as_millis() as u64, "Retrying collect");
                        tokio::select! {
                            _ = sleep(delay) => {}
                            _ = self.shutdown.cancelled() => {
                                warn!(source = %source, "Collect cancelled during retry sleep");
                                return Vec::new();
                            }
                        }
                    } else {
                        self.breaker.record_failure();
                        counter!("connector_collect_failures_total", "source" => source.as_str())
                            .increment(1);
                        error!(
                            source = %source,
                            attempts = max_retries + 1,
                            "Collection failed after all attempts"
                        );
                        return Vec::new();
                    }
                }
            }
        }

        Vec::new()
    }

    async fn handle_rejects(&self, source: EventSource, rejects: &[RejectedItem]) {
        for reject in rejects {
            warn!(
                source = %source,
                source_ref = reject.source_ref.as_deref().unwrap_or("<none>"),
                error = %reject.error,
                "Skipping raw item that failed transformation"
            );

            // Only identifiable items are worth parking for replay.
            let Some(source_ref) = reject.source_ref.as_deref() else {
                continue;
            };

            let event = NormalizedEvent {
                id: Uuid::new_v4(),
                source,
                event_type: "raw_item".to_string(),
                severity: EventSeverity::Info,
                occurred_at: Utc::now(),
                payload: reject.raw.clone(),
                tags: vec!["transform_failed".to_string()],
                source_ref: Some(source_ref.to_string()),
            };

            if self.dlq.put(&event, &reject.error, 0).await {
                counter!("connector_events_dead_lettered_total", "source" => source.as_str())
                    .increment(1);
            }
        }
    }
}
