//! Authentication middleware: bearer token extraction and the two-phase
//! signature + revocation check.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use nekolc_core::models::auth::TokenClaims;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Claims of the caller, placed in request extensions by [`require_auth`]
/// and [`optional_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization header required".into()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".into()))
}

/// Requires `Authorization: Bearer <access token>` whose record is live.
///
/// With authentication disabled the request passes through untouched.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.is_enabled() {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())?.to_owned();
    let claims = state.auth.authenticate(&token).await?;
    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}

/// Attaches [`AuthenticatedUser`] when a valid bearer token is present.
///
/// A missing or rejected token lets the request through anonymously. Store
/// failures still surface as errors.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.is_enabled() {
        return Ok(next.run(request).await);
    }

    let Ok(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return Ok(next.run(request).await);
    };
    match state.auth.authenticate(&token).await {
        Ok(claims) => {
            request.extensions_mut().insert(AuthenticatedUser(claims));
        }
        Err(AppError::Unauthorized(reason)) => {
            debug!(%reason, "ignoring bearer token on optional route");
        }
        Err(e) => return Err(e),
    }

    Ok(next.run(request).await)
}
