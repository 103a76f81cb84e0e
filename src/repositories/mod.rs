//! # Repositories
//!
//! Data access layer over the SeaORM entities. Each repository owns the rows
//! of its aggregate; cross-aggregate references are by id only.

use chrono::{DateTime, FixedOffset, Utc};

pub mod annotation;
pub mod dlq;
pub mod event;
pub mod investigation;

pub use annotation::AnnotationRepository;
pub use dlq::DlqRepository;
pub use event::{CreateOutcome, EventFilter, EventRepository};
pub use investigation::{InvestigationFilter, InvestigationPatch, InvestigationRepository};

/// Convert a UTC instant into the fixed-offset representation SeaORM stores.
pub(crate) fn to_db_time(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    DateTime::from_naive_utc_and_offset(dt.naive_utc(), FixedOffset::east_opt(0).expect("UTC offset"))
}
