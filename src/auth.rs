//! # Authentication and Authorization
//!
//! Static bearer-token authentication for the API. Operator tokens may
//! mutate; viewer tokens are read-only. Tokens are compared in constant time
//! and checked against the persisted revocation list (SHA-256 digests only).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::revoked_token::{ActiveModel as RevokedTokenActiveModel, Entity as RevokedToken};
use crate::repositories::to_db_time;
use crate::server::AppState;

/// Role attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Operator,
    Viewer,
}

/// Request extension carrying the authenticated role.
#[derive(Debug, Clone, Copy)]
pub struct AuthRole(pub Role);

/// Extractor for handlers that mutate state; rejects viewer tokens.
#[derive(Debug, Clone, Copy)]
pub struct OperatorAuth;

impl<S> FromRequestParts<S> for OperatorAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthRole>() {
            Some(AuthRole(Role::Operator)) => Ok(OperatorAuth),
            Some(AuthRole(Role::Viewer)) => {
                Err(forbidden(Some("Operator token required for this action")))
            }
            None => Err(unauthorized(None)),
        }
    }
}

/// Authentication middleware validating bearer tokens and the revocation
/// list, attaching the resolved role to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?.to_string();
    let role = resolve_role(&state.config, &token)
        .ok_or_else(|| unauthorized(Some("Invalid bearer token")))?;

    if is_revoked(&state.db, &token).await? {
        return Err(unauthorized(Some("Token has been revoked")));
    }

    let mut request = request;
    request.extensions_mut().insert(AuthRole(role));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

fn resolve_role(config: &AppConfig, token: &str) -> Option<Role> {
    let matches = |configured: &String| {
        ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into()
    };

    if config.operator_tokens.iter().any(matches) {
        Some(Role::Operator)
    } else if config.viewer_tokens.iter().any(matches) {
        Some(Role::Viewer)
    } else {
        None
    }
}

/// Hex SHA-256 digest used to persist revocations without storing tokens.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

async fn is_revoked(db: &DatabaseConnection, token: &str) -> Result<bool, ApiError> {
    let digest = token_digest(token);
    let row = RevokedToken::find_by_id(digest)
        .one(db)
        .await
        .map_err(ApiError::from)?;
    Ok(row.is_some())
}

/// Persist a revocation. Idempotent: revoking twice keeps a single row.
pub async fn revoke_token(db: &DatabaseConnection, token: &str) -> Result<(), ApiError> {
    let digest = token_digest(token);

    if RevokedToken::find_by_id(digest.clone())
        .one(db)
        .await
        .map_err(ApiError::from)?
        .is_some()
    {
        return Ok(());
    }

    let active = RevokedTokenActiveModel {
        token_digest: Set(digest),
        revoked_at: Set(to_db_time(chrono::Utc::now())),
    };
    active.insert(db).await.map_err(ApiError::from)?;

    Ok(())
}
