//! # Data Models
//!
//! This module contains all the data models used throughout the Faultline
//! service: SeaORM entities plus the domain enumerations they share.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod annotation;
pub mod dlq_event;
pub mod event;
pub mod event_link;
pub mod investigation;
pub mod investigation_relation;
pub mod revoked_token;
pub mod types;

pub use annotation::Entity as Annotation;
pub use dlq_event::Entity as DlqEvent;
pub use event::Entity as Event;
pub use event_link::Entity as EventLink;
pub use investigation::Entity as Investigation;
pub use investigation_relation::Entity as InvestigationRelation;
pub use revoked_token::Entity as RevokedToken;
pub use types::{EventSeverity, EventSource, ImpactSeverity, InvestigationStatus, Priority};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "faultline".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
