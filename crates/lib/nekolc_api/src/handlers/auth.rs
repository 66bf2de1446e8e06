//! Authentication request handlers.
//!
//! Each handler checks that authentication is enabled before looking at the
//! body, so a disabled server answers 501 even for malformed JSON.

use axum::Json;
use axum::extract::rejection::{ExtensionRejection, JsonRejection};
use axum::extract::{Extension, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse,
    RevokeAllResponse, ValidateRequest,
};

/// `POST /v0/api/auth/login`: password or device-signature login.
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    state.auth.ensure_enabled()?;
    let Json(body) = payload?;
    let pair = state.auth.login(&body.auth).await?;
    Ok(Json(LoginResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        meta: state.meta(),
    }))
}

/// `POST /v0/api/auth/refresh`: new access token from a refresh token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<RefreshResponse>> {
    state.auth.ensure_enabled()?;
    let Json(body) = payload?;
    let access = state.auth.refresh(&body.refresh_token).await?;
    Ok(Json(RefreshResponse {
        access_token: access.token,
        meta: state.meta(),
    }))
}

/// `POST /v0/api/auth/validate`: 204 if the token is live.
pub async fn validate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    state.auth.ensure_enabled()?;
    let Json(body) = payload?;
    state.auth.validate(&body.access_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v0/api/auth/logout`: always 204 once the body parses.
pub async fn logout_handler(
    State(state): State<AppState>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    state.auth.ensure_enabled()?;
    let Json(body) = payload?;
    state
        .auth
        .logout(&body.logout.access_token, &body.logout.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v0/api/auth/revokeAll`: revoke every session of the caller.
/// Requires authentication.
pub async fn revoke_all_handler(
    State(state): State<AppState>,
    user: Result<Extension<AuthenticatedUser>, ExtensionRejection>,
) -> AppResult<Json<RevokeAllResponse>> {
    state.auth.ensure_enabled()?;
    let Extension(AuthenticatedUser(claims)) =
        user.map_err(|_| AppError::Unauthorized("Authorization header required".into()))?;
    let revoked = state.auth.revoke_all(&claims.sub).await?;
    Ok(Json(RevokeAllResponse {
        revoked,
        meta: state.meta(),
    }))
}
