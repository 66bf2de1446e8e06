//! # nekolc_api
//!
//! HTTP API library for the NekoLc server.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, testing};
use crate::models::Meta;
use crate::services::auth::AuthService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub config: ApiConfig,
}

impl AppState {
    /// Fresh `meta` block for a response.
    pub fn meta(&self) -> Meta {
        Meta::new(&self.config.versions)
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route(routes::GET_TESTING_PING, get(testing::ping_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_VALIDATE, post(auth::validate_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    let protected = Router::new()
        .route(routes::POST_AUTH_REVOKE_ALL, post(auth::revoke_all_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Layers run outside-in: the debug gate answers before any token lookup.
    let diagnostics = Router::new()
        .route(routes::POST_TESTING_ECHO, post(testing::echo_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::debug::require_debug,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(diagnostics)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::meta::attach_meta,
        ))
        .layer(cors)
        .with_state(state)
}
