//! # DriveHub Backend Library
//!
//! DriveHub links a user's access tokens for a remote document drive service and returns,
//! in one request, the complete folder and file tree behind every connected token.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server and routing
//! - **SQLx**: credential and session storage in SQLite
//! - **Tokio**: async runtime; all provider calls are non-blocking
//! - **Reqwest**: HTTP client for the drive provider
//!
//! ## Core Components
//!
//! - [`provider`]: typed client for the remote drive service
//! - [`tree`]: recursive drive/folder/file tree construction for one token
//! - [`aggregate`]: fan-out over all connected credentials of a user
//! - [`response`]: wire entries for the aggregated response
//! - [`store`]: credential and session persistence
//! - [`config`]: layered configuration
//! - [`db`]: schema initialization
//! - [`error`]: error type and HTTP error responses
//! - [`metrics`]: counters for fetches and provider calls
//! - [`middleware`]: sessions, rate limiting and security headers
//! - [`routes`]: HTTP handlers
//! - [`state`]: shared application state
//! - [`types`]: tree nodes, credentials and request/response DTOs

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod provider;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tests;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Router with every route and the middleware stack applied.
pub fn app(state: AppState) -> Router {
    let cfg = state.config.clone();
    let limiter = state.global_limiter.clone();
    let app = routes::router(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(from_fn_with_state(limiter, middleware::rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, middleware::security_headers::security_headers_middleware));

    // CORS only for local development against a separately served UI
    if cfg!(debug_assertions) {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
