//! Stamps error envelopes with the configured version block.

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::models::{ErrorInfo, ErrorResponse};

/// Re-render any [`crate::error::AppError`] response with `state`'s meta.
pub async fn attach_meta(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(info) = response.extensions().get::<ErrorInfo>().cloned() else {
        return response;
    };
    let body = ErrorResponse {
        errors: vec![info],
        meta: state.meta(),
    };
    (response.status(), Json(body)).into_response()
}
