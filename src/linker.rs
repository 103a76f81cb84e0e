//! # Event Linker
//!
//! Correlates stored events with investigations by temporal proximity and
//! keyword overlap, records the resulting associations, and powers the
//! search and suggestion endpoints.
//!
//! The linker never raises to its caller: a missing investigation yields an
//! empty result and per-event failures are logged and skipped. Candidates
//! come from the event store only; pulling fresh connector batches here
//! would duplicate ingestion that the scheduler already performs.

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::event::Model as EventModel;
use crate::models::event_link::Model as LinkModel;
use crate::models::types::EventSource;
use crate::repositories::{EventFilter, EventRepository, InvestigationRepository};

/// Default half-window for auto-linking, in minutes.
pub const DEFAULT_TIME_WINDOW_MINUTES: i64 = 60;
/// Fixed half-window for suggestions, in minutes.
const SUGGESTION_WINDOW_MINUTES: i64 = 30;
/// Tokens shorter than this never participate in semantic matching.
const MIN_TOKEN_LEN: usize = 4;
/// How many recent events a search scans before field matching.
const SEARCH_SCAN_LIMIT: u64 = 500;

/// Payload fields consulted by `search`.
const SEARCH_FIELDS: [&str; 6] = ["message", "repo", "branch", "author", "job", "status"];

/// Service for automatically linking events to investigations.
pub struct EventLinker<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> EventLinker<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Discover and link events for an investigation.
    ///
    /// Keeps events whose occurrence time falls within ±`time_window_minutes`
    /// of the investigation's creation instant, optionally filtered by
    /// keyword overlap with the investigation title, and records a link for
    /// each survivor. Returns the links newly created this call.
    pub async fn auto_link(
        &self,
        investigation_id: Uuid,
        time_window_minutes: i64,
        semantic_matching: bool,
    ) -> Vec<LinkModel> {
        let candidates = match self
            .window_candidates(investigation_id, time_window_minutes, semantic_matching)
            .await
        {
            Some(candidates) => candidates,
            None => return Vec::new(),
        };

        let event_repo = EventRepository::new(self.db);
        let mut created = Vec::new();

        for event in candidates {
            match event_repo
                .link_to_investigation(event.id, investigation_id)
                .await
            {
                Ok(true) => match event_repo.get_link(event.id, investigation_id).await {
                    Ok(Some(link)) => created.push(link),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(event_id = %event.id, error = %err, "Failed to read back created link")
                    }
                },
                Ok(false) => {}
                Err(err) => {
                    // Tolerate and skip individual link failures.
                    warn!(
                        event_id = %event.id,
                        investigation_id = %investigation_id,
                        error = %err,
                        "Failed to link event"
                    );
                }
            }
        }

        debug!(
            investigation_id = %investigation_id,
            linked = created.len(),
            "Auto-link completed"
        );

        created
    }

    /// Suggest relevant events without linking them: fixed ±30 minute
    /// window, semantic matching on, already-linked events excluded.
    pub async fn suggest(&self, investigation_id: Uuid, limit: usize) -> Vec<EventModel> {
        let candidates = match self
            .window_candidates(investigation_id, SUGGESTION_WINDOW_MINUTES, true)
            .await
        {
            Some(candidates) => candidates,
            None => return Vec::new(),
        };

        let event_repo = EventRepository::new(self.db);
        let linked: std::collections::HashSet<Uuid> =
            match event_repo.linked_event_ids(investigation_id).await {
                Ok(ids) => ids.into_iter().collect(),
                Err(err) => {
                    warn!(investigation_id = %investigation_id, error = %err, "Failed to load linked ids");
                    return Vec::new();
                }
            };

        candidates
            .into_iter()
            .filter(|event| !linked.contains(&event.id))
            .take(limit)
            .collect()
    }

    /// Case-insensitive substring search over a fixed list of payload
    /// fields, newest occurrence first, truncated to `limit`.
    pub async fn search(
        &self,
        query: &str,
        source: Option<EventSource>,
        event_type: Option<String>,
        limit: usize,
    ) -> Vec<EventModel> {
        let event_repo = EventRepository::new(self.db);

        let events = match event_repo
            .list(&EventFilter {
                source,
                event_type,
                limit: Some(SEARCH_SCAN_LIMIT),
                ..Default::default()
            })
            .await
        {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "Event search query failed");
                return Vec::new();
            }
        };

        events
            .into_iter()
            .filter(|event| matches_query(event, query))
            .take(limit)
            .collect()
    }

    /// Shared windowing + semantic filter for auto-link and suggest.
    /// None means the investigation is missing or unreadable.
    async fn window_candidates(
        &self,
        investigation_id: Uuid,
        half_window_minutes: i64,
        semantic_matching: bool,
    ) -> Option<Vec<EventModel>> {
        let investigation_repo = InvestigationRepository::new(self.db);
        let investigation = match investigation_repo.get_active(investigation_id).await {
            Ok(Some(investigation)) => investigation,
            Ok(None) => {
                debug!(investigation_id = %investigation_id, "Investigation not found for linking");
                return None;
            }
            Err(err) => {
                warn!(investigation_id = %investigation_id, error = %err, "Failed to load investigation");
                return None;
            }
        };

        let reference: DateTime<Utc> = investigation.created_at.with_timezone(&Utc);
        let window = Duration::minutes(half_window_minutes);
        let start = reference - window;
        let end = reference + window;

        let event_repo = EventRepository::new(self.db);
        let mut events = match event_repo.in_time_range(start, end).await {
            Ok(events) => events,
            Err(err) => {
                warn!(investigation_id = %investigation_id, error = %err, "Failed to load candidate events");
                return None;
            }
        };

        if semantic_matching {
            let tokens = title_tokens(&investigation.title);
            // An empty token set matches all events.
            if !tokens.is_empty() {
                events.retain(|event| semantic_match(&tokens, event));
            }
        }

        Some(events)
    }
}

/// Tokens of length > 3 from the investigation title, lowercased.
fn title_tokens(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// The event's searchable text: lowercased concatenation of its scalar
/// payload values plus event type and tags.
fn searchable_text(event: &EventModel) -> String {
    let mut parts = vec![event.event_type.to_lowercase()];

    if let Some(map) = event.payload.as_object() {
        for value in map.values() {
            match value {
                serde_json::Value::String(s) => parts.push(s.to_lowercase()),
                serde_json::Value::Number(n) => parts.push(n.to_string()),
                _ => {}
            }
        }
    }

    for tag in event.tag_list() {
        parts.push(tag.to_lowercase());
    }

    parts.join(" ")
}

fn semantic_match(tokens: &[String], event: &EventModel) -> bool {
    let text = searchable_text(event);
    tokens.iter().any(|token| text.contains(token))
}

fn matches_query(event: &EventModel, query: &str) -> bool {
    let query_lower = query.to_lowercase();

    let Some(map) = event.payload.as_object() else {
        return false;
    };

    SEARCH_FIELDS.iter().any(|field| {
        map.get(*field)
            .and_then(|value| value.as_str())
            .map(|value| value.to_lowercase().contains(&query_lower))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::trait_::NormalizedEvent;
    use crate::models::types::{EventSeverity, ImpactSeverity};
    use crate::repositories::investigation::NewInvestigation;
    use crate::repositories::test_support::test_db;
    use chrono::Duration;
    use serde_json::json;

    async fn make_investigation(db: &DatabaseConnection, title: &str) -> Uuid {
        InvestigationRepository::new(db)
            .create(NewInvestigation {
                title: title.to_string(),
                impact_severity: ImpactSeverity::High,
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn make_event(
        db: &DatabaseConnection,
        occurred_at: DateTime<Utc>,
        message: &str,
    ) -> Uuid {
        let event = NormalizedEvent::new(
            EventSource::Logs,
            "log_entry",
            EventSeverity::High,
            occurred_at,
        )
        .with_payload(json!({"message": message}));

        EventRepository::new(db).create(&event).await.unwrap();
        event.id
    }

    #[tokio::test]
    async fn auto_link_honors_time_window() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "a b c").await;

        let now = Utc::now();
        let near = make_event(&db, now - Duration::minutes(30), "near miss").await;
        let far = make_event(&db, now + Duration::hours(3), "far away").await;

        let linker = EventLinker::new(&db);
        let links = linker.auto_link(investigation_id, 60, true).await;

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].event_id, near);

        let linked = EventRepository::new(&db)
            .linked_event_ids(investigation_id)
            .await
            .unwrap();
        assert!(linked.contains(&near));
        assert!(!linked.contains(&far));
    }

    #[tokio::test]
    async fn linked_events_stay_inside_window_invariant() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "a b c").await;
        let investigation = InvestigationRepository::new(&db)
            .get(investigation_id)
            .await
            .unwrap()
            .unwrap();
        let reference = investigation.created_at.with_timezone(&Utc);

        let now = Utc::now();
        for offset_minutes in [-90, -45, 0, 45, 90] {
            make_event(
                &db,
                now + Duration::minutes(offset_minutes),
                "window probe",
            )
            .await;
        }

        let window_minutes = 60;
        let linker = EventLinker::new(&db);
        linker.auto_link(investigation_id, window_minutes, false).await;

        let linked = EventRepository::new(&db)
            .by_investigation(investigation_id, None, None, None, None)
            .await
            .unwrap();

        assert_eq!(linked.len(), 3);
        for event in linked {
            let distance = (event.occurred_at.with_timezone(&Utc) - reference)
                .num_minutes()
                .abs();
            assert!(distance <= window_minutes);
        }
    }

    #[tokio::test]
    async fn semantic_matching_filters_by_title_tokens() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "Database Connection Timeout").await;

        let now = Utc::now();
        let relevant = make_event(&db, now, "Database connection pool fix").await;
        let unrelated = make_event(&db, now, "UI refactor").await;

        let linker = EventLinker::new(&db);
        let links = linker.auto_link(investigation_id, 600, true).await;

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].event_id, relevant);

        let linked = EventRepository::new(&db)
            .linked_event_ids(investigation_id)
            .await
            .unwrap();
        assert!(!linked.contains(&unrelated));
    }

    #[tokio::test]
    async fn short_title_tokens_match_everything() {
        let db = test_db().await;
        // Every word is <= 3 chars, so the token set is empty.
        let investigation_id = make_investigation(&db, "db is bad").await;

        let now = Utc::now();
        make_event(&db, now, "anything at all").await;

        let linker = EventLinker::new(&db);
        let links = linker.auto_link(investigation_id, 60, true).await;
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn semantic_matching_off_links_regardless_of_text() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "Database Connection Timeout").await;

        let now = Utc::now();
        make_event(&db, now, "UI refactor").await;

        let linker = EventLinker::new(&db);
        let links = linker.auto_link(investigation_id, 60, false).await;
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn auto_link_is_idempotent_across_calls() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "a b c").await;
        make_event(&db, Utc::now(), "some event").await;

        let linker = EventLinker::new(&db);
        let first = linker.auto_link(investigation_id, 60, false).await;
        let second = linker.auto_link(investigation_id, 60, false).await;

        assert_eq!(first.len(), 1);
        assert!(second.is_empty(), "already-linked events create no new links");
    }

    #[tokio::test]
    async fn missing_investigation_yields_empty_results() {
        let db = test_db().await;
        let linker = EventLinker::new(&db);

        assert!(linker.auto_link(Uuid::new_v4(), 60, true).await.is_empty());
        assert!(linker.suggest(Uuid::new_v4(), 10).await.is_empty());
    }

    #[tokio::test]
    async fn suggest_excludes_already_linked_events() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "Database Connection Timeout").await;

        let now = Utc::now();
        let linked = make_event(&db, now, "database connection reset").await;
        let fresh = make_event(&db, now, "database connection dropped").await;

        EventRepository::new(&db)
            .link_to_investigation(linked, investigation_id)
            .await
            .unwrap();

        let linker = EventLinker::new(&db);
        let suggestions = linker.suggest(investigation_id, 10).await;

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, fresh);
    }

    #[tokio::test]
    async fn suggest_does_not_create_links() {
        let db = test_db().await;
        let investigation_id = make_investigation(&db, "Database Connection Timeout").await;
        make_event(&db, Utc::now(), "database connection refused").await;

        let linker = EventLinker::new(&db);
        assert_eq!(linker.suggest(investigation_id, 10).await.len(), 1);

        let linked = EventRepository::new(&db)
            .linked_event_ids(investigation_id)
            .await
            .unwrap();
        assert!(linked.is_empty());
    }

    #[tokio::test]
    async fn search_matches_fixed_fields_case_insensitively() {
        let db = test_db().await;
        let repo = EventRepository::new(&db);

        let now = Utc::now();
        let ci_event = NormalizedEvent::new(EventSource::Ci, "ci_run", EventSeverity::High, now)
            .with_payload(json!({"job": "Deploy-Production", "status": "failed"}));
        repo.create(&ci_event).await.unwrap();

        let log_event =
            NormalizedEvent::new(EventSource::Logs, "log_entry", EventSeverity::Medium, now)
                .with_payload(json!({"message": "deploy finished cleanly"}));
        repo.create(&log_event).await.unwrap();

        let linker = EventLinker::new(&db);

        let results = linker.search("deploy", None, None, 50).await;
        assert_eq!(results.len(), 2);

        let results = linker
            .search("deploy", Some(EventSource::Ci), None, 50)
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, ci_event.id);

        let results = linker.search("FAILED", None, None, 50).await;
        assert_eq!(results.len(), 1);

        // Payload fields outside the fixed list do not match.
        let hidden = NormalizedEvent::new(EventSource::Logs, "log_entry", EventSeverity::Low, now)
            .with_payload(json!({"note": "deploy mentioned only here"}));
        repo.create(&hidden).await.unwrap();
        let results = linker.search("mentioned", None, None, 50).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_orders_newest_first_and_truncates() {
        let db = test_db().await;

        let base = Utc::now();
        for index in 0..5 {
            make_event(
                &db,
                base - Duration::minutes(index),
                &format!("rollout step {}", index),
            )
            .await;
        }

        let linker = EventLinker::new(&db);
        let results = linker.search("rollout", None, None, 3).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].occurred_at >= results[1].occurred_at);
        assert!(results[1].occurred_at >= results[2].occurred_at);
    }

    #[test]
    fn title_tokenization_rules() {
        assert_eq!(
            title_tokens("Database Connection Timeout"),
            vec!["database", "connection", "timeout"]
        );
        assert!(title_tokens("db is ok").is_empty());
        assert_eq!(title_tokens("API 500s rising"), vec!["500s", "rising"]);
    }
}
