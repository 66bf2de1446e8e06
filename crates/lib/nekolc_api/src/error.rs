//! Application error types.
//!
//! Every failure leaves the API as the standard error envelope. The `meta`
//! block is filled with default version info here and replaced with the
//! configured one by [`crate::middleware::meta::attach_meta`].

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nekolc_core::auth::{ClaimsError, IssueError};
use nekolc_core::store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::config::VersionInfo;
use crate::models::{ErrorInfo, ErrorResponse, Meta};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotImplemented(_) => "NotImplemented",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Message shown to the client. Internal details never leave the process.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::NotImplemented(m)
            | AppError::InvalidRequest(m)
            | AppError::NotFound(m)
            | AppError::Unauthorized(m) => m.as_str(),
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// The single entry of the error envelope.
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.error_type(), self.client_message())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(%detail, "request failed with internal error");
        }
        let info = self.info();
        let body = Json(ErrorResponse {
            errors: vec![info.clone()],
            meta: Meta::new(&VersionInfo::default()),
        });
        let mut response = (self.status(), body).into_response();
        response.extensions_mut().insert(info);
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        match e {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::InvalidRequest("Content-Type must be application/json".into())
            }
            _ => AppError::InvalidRequest("Invalid JSON format".into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<ClaimsError> for AppError {
    fn from(e: ClaimsError) -> Self {
        match e {
            ClaimsError::Encoding(msg) => AppError::Internal(msg),
            _ => AppError::Unauthorized("Invalid or expired token".into()),
        }
    }
}

impl From<IssueError> for AppError {
    fn from(e: IssueError) -> Self {
        match e {
            IssueError::NotARefreshToken => {
                AppError::Unauthorized("Invalid or expired refresh token".into())
            }
            IssueError::Claims(e) => AppError::from(e),
        }
    }
}
