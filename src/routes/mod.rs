//! HTTP route handlers.
//!
//! - `credentials`: linking and unlinking provider tokens
//! - `drives`: single-credential tree fetch and multi-credential aggregation
//! - `health`: liveness, readiness, metrics and version

pub mod credentials;
pub mod drives;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// All routes with state applied. Layers are added by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/api/drives/connect", get(drives::connect_drive))
        .route("/api/drives/disconnect", get(drives::disconnect_drive))
        .route("/api/drives/load", post(drives::load_drives))
        .route("/api/drives/connected", get(drives::connected_credentials))
        .route(
            "/api/credentials",
            post(credentials::add_credential)
                .get(credentials::list_credentials)
                .delete(credentials::delete_credential),
        )
        .route("/api/credentials/connect", post(credentials::connect_credential))
        .with_state(state)
}
