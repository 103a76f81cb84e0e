//! Domain enumerations shared across models, repositories, and handlers.
//!
//! Entities store these as plain text columns; parsing happens at the API
//! boundary and inside connectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Origin of a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Git,
    Ci,
    Logs,
    Metrics,
    Traces,
    Manual,
}

impl EventSource {
    pub const ALL: [EventSource; 6] = [
        EventSource::Git,
        EventSource::Ci,
        EventSource::Logs,
        EventSource::Metrics,
        EventSource::Traces,
        EventSource::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Git => "git",
            EventSource::Ci => "ci",
            EventSource::Logs => "logs",
            EventSource::Metrics => "metrics",
            EventSource::Traces => "traces",
            EventSource::Manual => "manual",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(EventSource::Git),
            "ci" => Ok(EventSource::Ci),
            "logs" => Ok(EventSource::Logs),
            "metrics" => Ok(EventSource::Metrics),
            "traces" => Ok(EventSource::Traces),
            "manual" => Ok(EventSource::Manual),
            other => Err(format!("unknown event source: {}", other)),
        }
    }
}

/// Event severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "info",
            EventSeverity::Low => "low",
            EventSeverity::Medium => "medium",
            EventSeverity::High => "high",
            EventSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(EventSeverity::Info),
            "low" => Ok(EventSeverity::Low),
            "medium" => Ok(EventSeverity::Medium),
            "high" => Ok(EventSeverity::High),
            "critical" => Ok(EventSeverity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Investigation lifecycle status. Transitions are monotonic toward closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl InvestigationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestigationStatus::Open => "open",
            InvestigationStatus::InProgress => "in_progress",
            InvestigationStatus::Resolved => "resolved",
            InvestigationStatus::Closed => "closed",
        }
    }

    /// Position on the open → closed axis, used to enforce monotonicity.
    pub fn rank(&self) -> u8 {
        match self {
            InvestigationStatus::Open => 0,
            InvestigationStatus::InProgress => 1,
            InvestigationStatus::Resolved => 2,
            InvestigationStatus::Closed => 3,
        }
    }

    /// A transition is allowed when it moves forward or stays in place.
    pub fn can_transition_to(&self, next: InvestigationStatus) -> bool {
        next.rank() >= self.rank()
    }
}

impl fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestigationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(InvestigationStatus::Open),
            "in_progress" => Ok(InvestigationStatus::InProgress),
            "resolved" => Ok(InvestigationStatus::Resolved),
            "closed" => Ok(InvestigationStatus::Closed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Business impact of an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImpactSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ImpactSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactSeverity::Critical => "critical",
            ImpactSeverity::High => "high",
            ImpactSeverity::Medium => "medium",
            ImpactSeverity::Low => "low",
        }
    }
}

impl fmt::Display for ImpactSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(ImpactSeverity::Critical),
            "high" => Ok(ImpactSeverity::High),
            "medium" => Ok(ImpactSeverity::Medium),
            "low" => Ok(ImpactSeverity::Low),
            other => Err(format!("unknown impact severity: {}", other)),
        }
    }
}

/// Investigation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "p0",
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p0" => Ok(Priority::P0),
            "p1" => Ok(Priority::P1),
            "p2" => Ok(Priority::P2),
            "p3" => Ok(Priority::P3),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}
