//! Diagnostics endpoints under `/v0/testing`.

use axum::Json;
use axum::extract::rejection::{ExtensionRejection, JsonRejection};
use axum::extract::{Extension, State};
use serde_json::Value;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{EchoResponse, PingResponse};

/// `GET /v0/testing/ping`
pub async fn ping_handler(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".into(),
        status: "ok".into(),
        meta: state.meta(),
    })
}

/// `POST /v0/testing/echo`: returns the JSON body, plus the caller's subject
/// when a valid bearer token came with it. Debug mode only.
pub async fn echo_handler(
    State(state): State<AppState>,
    user: Result<Extension<AuthenticatedUser>, ExtensionRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<EchoResponse>> {
    let Json(echo) = payload?;
    Ok(Json(EchoResponse {
        echo,
        subject: user.ok().map(|Extension(AuthenticatedUser(claims))| claims.sub),
        meta: state.meta(),
    }))
}
