use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight, no rate limiting
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let series: [(&str, &str, &str, u64); 9] = [
        ("aggregations_started", "counter", "Aggregation requests started", m.aggregations_started),
        ("aggregations_completed", "counter", "Aggregation requests completed", m.aggregations_completed),
        ("credentials_succeeded", "counter", "Credential tree fetches that succeeded", m.credentials_succeeded),
        ("credentials_failed", "counter", "Credential tree fetches that failed", m.credentials_failed),
        ("provider_calls", "counter", "Calls made to the drive provider", m.provider_calls),
        ("provider_failures", "counter", "Drive provider calls that failed", m.provider_failures),
        ("folders_discovered", "counter", "Folders returned in fetched trees", m.folders_discovered),
        ("files_discovered", "counter", "Files returned in fetched trees", m.files_discovered),
        ("uptime_seconds", "gauge", "Uptime seconds", m.uptime_seconds),
    ];
    let body: String = series
        .iter()
        .map(|(name, kind, help, value)| {
            format!(
                "# HELP drivehub_{name} {help}\n# TYPE drivehub_{name} {kind}\ndrivehub_{name} {value}\n"
            )
        })
        .collect();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
