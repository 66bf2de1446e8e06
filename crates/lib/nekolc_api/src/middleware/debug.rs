//! Gate for diagnostics routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Answers `NotFound` unless the server runs in debug mode.
pub async fn require_debug(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.debug {
        return Err(AppError::NotFound(
            "Endpoint not available in production".into(),
        ));
    }
    Ok(next.run(request).await)
}
