use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide counters, shared by cloning.
#[derive(Clone)]
pub struct Metrics {
    pub aggregations_started: Arc<AtomicU64>,
    pub aggregations_completed: Arc<AtomicU64>,
    pub credentials_succeeded: Arc<AtomicU64>,
    pub credentials_failed: Arc<AtomicU64>,
    pub provider_calls: Arc<AtomicU64>,
    pub provider_failures: Arc<AtomicU64>,
    pub folders_discovered: Arc<AtomicU64>,
    pub files_discovered: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            aggregations_started: Arc::new(AtomicU64::new(0)),
            aggregations_completed: Arc::new(AtomicU64::new(0)),
            credentials_succeeded: Arc::new(AtomicU64::new(0)),
            credentials_failed: Arc::new(AtomicU64::new(0)),
            provider_calls: Arc::new(AtomicU64::new(0)),
            provider_failures: Arc::new(AtomicU64::new(0)),
            folders_discovered: Arc::new(AtomicU64::new(0)),
            files_discovered: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_aggregations_started(&self) {
        self.aggregations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_aggregations_completed(&self) {
        self.aggregations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_credentials_succeeded(&self) {
        self.credentials_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_credentials_failed(&self) {
        self.credentials_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_calls(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provider_failures(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_folders(&self, count: u64) {
        self.folders_discovered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_files(&self, count: u64) {
        self.files_discovered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            aggregations_started: self.aggregations_started.load(Ordering::Relaxed),
            aggregations_completed: self.aggregations_completed.load(Ordering::Relaxed),
            credentials_succeeded: self.credentials_succeeded.load(Ordering::Relaxed),
            credentials_failed: self.credentials_failed.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            folders_discovered: self.folders_discovered.load(Ordering::Relaxed),
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub aggregations_started: u64,
    pub aggregations_completed: u64,
    pub credentials_succeeded: u64,
    pub credentials_failed: u64,
    pub provider_calls: u64,
    pub provider_failures: u64,
    pub folders_discovered: u64,
    pub files_discovered: u64,
    pub uptime_seconds: u64,
}
