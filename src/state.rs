use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::middleware::EndpointRateLimiter;
use crate::provider::DriveProvider;
use crate::store::{CredentialStore, SessionResolver, SqliteCredentialStore, SqliteSessionStore};
use crate::tree::{TreeFetcher, TreeOptions};

/// Endpoint keys used by the per-endpoint rate limiter.
pub const DRIVE_LOAD_ENDPOINT: &str = "/api/drives/load";
pub const DRIVE_CONNECT_ENDPOINT: &str = "/api/drives/connect";

/// The shared application state.
///
/// Everything in here is either immutable or internally synchronised, so handlers receive
/// a cheap clone per request.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool. Used directly only by the readiness probe.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    pub rate_limiter: EndpointRateLimiter,
    /// Applies to every route, see `middleware::rate_limit::rate_limit_middleware`.
    pub global_limiter: RateLimiter,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionResolver>,
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    /// Wires the SQLite-backed stores and the aggregation pipeline around `provider`.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig, provider: Arc<dyn DriveProvider>) -> Self {
        let limits = &config.rate_limit;
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            (DRIVE_LOAD_ENDPOINT, limits.drive_load_per_minute, 60),
            (DRIVE_CONNECT_ENDPOINT, limits.drive_connect_per_minute, 60),
        ]);
        let global_limiter = RateLimiter::new(limits.global_max_requests, limits.global_window_seconds);

        let metrics = Metrics::new();
        let fetcher = TreeFetcher::new(provider, TreeOptions::from(&config.tree), metrics.clone());
        let aggregator = Aggregator::new(fetcher, &config.aggregator, metrics.clone());

        Self {
            credentials: Arc::new(SqliteCredentialStore::new(db.clone())),
            sessions: Arc::new(SqliteSessionStore::new(db.clone())),
            db,
            config: Arc::new(config),
            metrics,
            rate_limiter,
            global_limiter,
            aggregator: Arc::new(aggregator),
        }
    }
}
