//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Faultline API.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod connectors;
pub mod events;
pub mod investigations;
pub mod links;
pub mod tokens;
pub mod types;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
