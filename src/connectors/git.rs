//! Git connector
//!
//! Reads a bounded window of recent commits from a repository and emits one
//! `commit` event per commit, with severity inferred from the scale of the
//! change and concerning keywords in the subject.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use tokio::process::Command;

use crate::connectors::trait_::{
    Connector, ConnectorError, NormalizedEvent, RejectedItem, SourceBatch,
};
use crate::models::types::{EventSeverity, EventSource};

/// Record separator / unit separator markers used in the pretty format.
const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';

static SHORTSTAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?")
        .expect("shortstat pattern compiles")
});

const CONCERNING_KEYWORDS: [&str; 5] = ["fix", "bug", "error", "fail", "break"];

/// A commit parsed out of `git log` output.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

/// Monitor a git repository for recent commits.
pub struct GitConnector {
    repo_path: PathBuf,
    lookback_commits: u32,
}

impl GitConnector {
    pub fn new(repo_path: impl Into<PathBuf>, lookback_commits: u32) -> Self {
        Self {
            repo_path: repo_path.into(),
            lookback_commits,
        }
    }

    async fn run_git_log(&self) -> Result<String, ConnectorError> {
        let output = Command::new("git")
            .arg("log")
            .arg(format!("-{}", self.lookback_commits))
            .arg("--no-merges")
            .arg("--shortstat")
            .arg(format!(
                "--pretty=format:{}%H{}%an <%ae>{}%aI{}%s",
                RECORD_SEP, FIELD_SEP, FIELD_SEP, FIELD_SEP
            ))
            .current_dir(&self.repo_path)
            .output()
            .await
            .map_err(|err| ConnectorError::IoError {
                details: format!("failed to run git log in {}: {}", self.repo_path.display(), err),
            })?;

        if !output.status.success() {
            return Err(ConnectorError::IoError {
                details: format!(
                    "git log exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Connector for GitConnector {
    fn source(&self) -> EventSource {
        EventSource::Git
    }

    async fn fetch_and_transform(&self) -> Result<SourceBatch, ConnectorError> {
        let output = self.run_git_log().await?;
        let mut batch = SourceBatch::default();

        for record in parse_git_log(&output) {
            match commit_to_event(&record) {
                Ok(event) => batch.events.push(event),
                Err(error) => batch.rejects.push(RejectedItem {
                    source_ref: Some(record.hash.clone()),
                    error,
                    raw: json!({
                        "hash": record.hash,
                        "author": record.author,
                        "date": record.date,
                        "subject": record.subject,
                    }),
                }),
            }
        }

        Ok(batch)
    }
}

/// Parse `git log --shortstat` output produced with the connector's pretty
/// format into commit records.
pub fn parse_git_log(output: &str) -> Vec<CommitRecord> {
    let mut commits = Vec::new();

    for section in output.split(RECORD_SEP).skip(1) {
        let mut lines = section.lines();
        let Some(header) = lines.next() else {
            continue;
        };

        let fields: Vec<&str> = header.split(FIELD_SEP).collect();
        if fields.len() < 4 || fields[0].is_empty() {
            continue;
        }

        let mut record = CommitRecord {
            hash: fields[0].to_string(),
            author: fields[1].to_string(),
            date: fields[2].to_string(),
            subject: fields[3].to_string(),
            files_changed: 0,
            insertions: 0,
            deletions: 0,
        };

        for line in lines {
            if let Some(captures) = SHORTSTAT_PATTERN.captures(line) {
                record.files_changed = captures
                    .get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                record.insertions = captures
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                record.deletions = captures
                    .get(3)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                break;
            }
        }

        commits.push(record);
    }

    commits
}

/// Severity from the scale of the change against fixed thresholds, with a
/// floor of medium when the subject carries concerning keywords.
pub fn severity_for_commit(record: &CommitRecord) -> EventSeverity {
    let mut severity = EventSeverity::Info;

    let subject_lower = record.subject.to_lowercase();
    if CONCERNING_KEYWORDS
        .iter()
        .any(|keyword| subject_lower.contains(keyword))
    {
        severity = severity.max(EventSeverity::Medium);
    }

    if record.files_changed > 50 {
        severity = severity.max(EventSeverity::High);
    }

    if record.insertions + record.deletions > 10_000 {
        severity = severity.max(EventSeverity::Critical);
    }

    severity
}

fn commit_to_event(record: &CommitRecord) -> Result<NormalizedEvent, String> {
    let occurred_at = DateTime::parse_from_rfc3339(&record.date)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("invalid commit date '{}': {}", record.date, err))?;

    let severity = severity_for_commit(record);
    let author_name = record
        .author
        .split('<')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let event = NormalizedEvent::new(EventSource::Git, "commit", severity, occurred_at)
        .with_payload(json!({
            "commit_hash": record.hash,
            "author": record.author,
            "message": record.subject,
            "files_changed": record.files_changed,
            "insertions": record.insertions,
            "deletions": record.deletions,
            "repo": "",
        }))
        .with_tags(vec!["commit".to_string(), author_name])
        .with_source_ref(record.hash.clone());

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_fixture() -> String {
        format!(
            "{rs}aaa111{fs}Ada Lovelace <ada@example.com>{fs}2026-01-27T09:30:00+00:00{fs}Fix race in pool\n\n 3 files changed, 40 insertions(+), 12 deletions(-)\n{rs}bbb222{fs}Grace Hopper <grace@example.com>{fs}2026-01-27T08:00:00+00:00{fs}Add retry helper\n\n 1 file changed, 9 insertions(+)\n",
            rs = RECORD_SEP,
            fs = FIELD_SEP
        )
    }

    #[test]
    fn parses_commits_and_shortstats() {
        let commits = parse_git_log(&log_fixture());

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "aaa111");
        assert_eq!(commits[0].author, "Ada Lovelace <ada@example.com>");
        assert_eq!(commits[0].subject, "Fix race in pool");
        assert_eq!(commits[0].files_changed, 3);
        assert_eq!(commits[0].insertions, 40);
        assert_eq!(commits[0].deletions, 12);

        assert_eq!(commits[1].files_changed, 1);
        assert_eq!(commits[1].insertions, 9);
        assert_eq!(commits[1].deletions, 0);
    }

    #[test]
    fn empty_output_parses_to_no_commits() {
        assert!(parse_git_log("").is_empty());
    }

    #[test]
    fn severity_thresholds() {
        let base = CommitRecord {
            hash: "h".into(),
            author: "a <a@x>".into(),
            date: "2026-01-27T09:30:00+00:00".into(),
            subject: "Refactor module layout".into(),
            files_changed: 2,
            insertions: 10,
            deletions: 5,
        };
        assert_eq!(severity_for_commit(&base), EventSeverity::Info);

        let keyword = CommitRecord {
            subject: "Fix broken pagination".into(),
            ..base.clone()
        };
        assert_eq!(severity_for_commit(&keyword), EventSeverity::Medium);

        let sweeping = CommitRecord {
            files_changed: 80,
            ..base.clone()
        };
        assert_eq!(severity_for_commit(&sweeping), EventSeverity::High);

        let massive = CommitRecord {
            insertions: 9000,
            deletions: 2000,
            ..base.clone()
        };
        assert_eq!(severity_for_commit(&massive), EventSeverity::Critical);
    }

    #[test]
    fn commit_event_shape() {
        let record = CommitRecord {
            hash: "aaa111".into(),
            author: "Ada Lovelace <ada@example.com>".into(),
            date: "2026-01-27T09:30:00+00:00".into(),
            subject: "Fix race in pool".into(),
            files_changed: 3,
            insertions: 40,
            deletions: 12,
        };

        let event = commit_to_event(&record).unwrap();
        assert_eq!(event.source, EventSource::Git);
        assert_eq!(event.event_type, "commit");
        assert_eq!(event.severity, EventSeverity::Medium);
        assert_eq!(event.source_ref.as_deref(), Some("aaa111"));
        assert_eq!(event.payload["commit_hash"], "aaa111");
        assert!(event.tags.contains(&"Ada Lovelace".to_string()));
    }

    #[test]
    fn commit_with_bad_date_errors() {
        let record = CommitRecord {
            hash: "aaa111".into(),
            author: "a <a@x>".into(),
            date: "yesterday".into(),
            subject: "whatever".into(),
            files_changed: 0,
            insertions: 0,
            deletions: 0,
        };

        assert!(commit_to_event(&record).is_err());
    }

    #[tokio::test]
    async fn missing_repository_is_a_fetch_error() {
        let connector = GitConnector::new("/nonexistent/repo", 10);
        let result = connector.fetch_and_transform().await;
        assert!(matches!(result, Err(ConnectorError::IoError { .. })));
    }
}
