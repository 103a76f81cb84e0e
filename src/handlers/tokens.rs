//! # Token Endpoint Handlers
//!
//! Bearer-token revocation.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{OperatorAuth, revoke_token};
use crate::error::{ApiError, validation_error};
use crate::handlers::types::now_rfc3339;
use crate::server::AppState;

/// Body for revoking a token
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeTokenRequest {
    pub token: String,
}

/// Revoke a bearer token; subsequent requests with it are rejected
#[utoipa::path(
    post,
    path = "/api/auth/revoke",
    security(("bearer_auth" = [])),
    request_body = RevokeTokenRequest,
    responses(
        (status = 200, description = "Token revoked"),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn revoke(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Json(body): Json<RevokeTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(validation_error("token must not be empty"));
    }

    revoke_token(&state.db, &body.token).await?;

    Ok(Json(serde_json::json!({
        "revoked": true,
        "timestamp": now_rfc3339(),
    })))
}
