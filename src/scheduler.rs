//! # Ingest Scheduler
//!
//! One long-lived task per registered connector. Each loop sleeps a jittered
//! interval, collects a batch through the resilience harness, and inserts the
//! events into the event store in the order the connector returned them.
//! Shutdown is prompt: the sleep and the in-flight collect both race the
//! cancellation token.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::SchedulerConfig;
use crate::connectors::harness::ConnectorHarness;
use crate::connectors::registry::ConnectorRegistry;
use crate::repositories::{CreateOutcome, EventRepository};

/// Outcome of a single ingest pass over one connector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub collected: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub storage_failures: u64,
}

/// Background ingestion service.
pub struct IngestScheduler {
    config: SchedulerConfig,
    db: DatabaseConnection,
    registry: Arc<ConnectorRegistry>,
}

impl IngestScheduler {
    pub fn new(
        config: SchedulerConfig,
        db: DatabaseConnection,
        registry: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            config,
            db,
            registry,
        }
    }

    /// Spawn one ingest loop per registered connector. Returns the task
    /// handles so the caller can await them on shutdown.
    pub fn spawn(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Ingest scheduler disabled by configuration");
            return Vec::new();
        }

        let mut handles = Vec::new();

        for harness in self.registry.iter() {
            let harness = Arc::clone(harness);
            let db = self.db.clone();
            let config = self.config.clone();
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                run_connector_loop(config, db, harness, shutdown).await;
            }));
        }

        handles
    }
}

#[instrument(skip_all, fields(source = %harness.source()))]
async fn run_connector_loop(
    config: SchedulerConfig,
    db: DatabaseConnection,
    harness: Arc<ConnectorHarness>,
    shutdown: CancellationToken,
) {
    info!("Starting ingest loop");

    loop {
        let interval = jittered_interval(&config, &mut rand::thread_rng());

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Ingest loop shutdown requested");
                break;
            }
            _ = sleep(interval) => {
                let started = Instant::now();
                let stats = ingest_once(
                    &db,
                    &harness,
                    Duration::from_secs(config.collect_timeout_seconds),
                ).await;

                histogram!("ingest_pass_duration_ms", "source" => harness.source().as_str())
                    .record(started.elapsed().as_secs_f64() * 1_000.0);
                debug!(
                    collected = stats.collected,
                    inserted = stats.inserted,
                    duplicates = stats.duplicates,
                    storage_failures = stats.storage_failures,
                    "Ingest pass completed"
                );
            }
        }
    }

    info!("Ingest loop stopped");
}

/// Collect one batch and persist it, preserving connector order. Duplicate
/// (source, source_ref) pairs are counted, not errors; storage failures are
/// dead-lettered so the batch is not lost.
pub async fn ingest_once(
    db: &DatabaseConnection,
    harness: &ConnectorHarness,
    collect_timeout: Duration,
) -> IngestStats {
    let source = harness.source();
    let events = harness.collect(collect_timeout).await;
    let repo = EventRepository::new(db);

    let mut stats = IngestStats {
        collected: events.len() as u64,
        ..Default::default()
    };

    for event in &events {
        match repo.create(event).await {
            Ok(CreateOutcome::Created) => stats.inserted += 1,
            Ok(CreateOutcome::AlreadyExists) => stats.duplicates += 1,
            Err(err) => {
                stats.storage_failures += 1;
                error!(
                    source = %source,
                    event_id = %event.id,
                    error = %err,
                    "Failed to persist collected event"
                );
                harness.dlq().put(event, &err.to_string(), 0).await;
            }
        }
    }

    counter!("ingest_events_inserted_total", "source" => source.as_str())
        .increment(stats.inserted);
    counter!("ingest_events_duplicate_total", "source" => source.as_str())
        .increment(stats.duplicates);

    stats
}

fn jittered_interval<R: Rng + ?Sized>(config: &SchedulerConfig, rng: &mut R) -> Duration {
    let base = config.interval_seconds as f64;
    let min = config.jitter_pct_min.max(0.0);
    let max = config.jitter_pct_max.max(min);

    let jitter_pct = if (max - min).abs() < f64::EPSILON {
        min
    } else {
        rng.gen_range(min..=max)
    };

    Duration::from_secs_f64(base * (1.0 + jitter_pct))
}
