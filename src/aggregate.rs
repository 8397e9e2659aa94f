//! Runs the tree fetch for every connected credential of a user.
//!
//! Credentials are fetched concurrently (bounded by `credential_concurrency`) through an
//! ordered buffered stream, so outcome `i` always belongs to input credential `i`. Branches
//! are plain futures, never spawned: dropping the aggregation future drops every branch.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::config::AggregatorConfig;
use crate::error::AppResult;
use crate::metrics::Metrics;
use crate::store::CredentialStore;
use crate::tree::{TreeError, TreeFetcher};
use crate::types::{Credential, DriveNode, UserId};

/// Result of fetching one credential.
#[derive(Debug)]
pub struct CredentialOutcome {
    pub credential: Credential,
    pub result: Result<Vec<DriveNode>, TreeError>,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    /// In input credential order.
    pub outcomes: Vec<CredentialOutcome>,
}

impl Aggregation {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_partial_failure(&self) -> bool {
        let failed = self.failed();
        failed > 0 && failed < self.outcomes.len()
    }
}

#[derive(Clone)]
pub struct Aggregator {
    fetcher: TreeFetcher,
    credential_concurrency: usize,
    credential_timeout: Duration,
    metrics: Metrics,
}

impl Aggregator {
    pub fn new(fetcher: TreeFetcher, cfg: &AggregatorConfig, metrics: Metrics) -> Self {
        Self {
            fetcher,
            credential_concurrency: cfg.credential_concurrency.max(1),
            credential_timeout: cfg.credential_timeout(),
            metrics,
        }
    }

    /// Full tree for a single token, bounded by the per-credential timeout.
    pub async fn fetch_single(&self, token: &str) -> Result<Vec<DriveNode>, TreeError> {
        match tokio::time::timeout(self.credential_timeout, self.fetcher.fetch(token)).await {
            Ok(res) => res,
            Err(_) => Err(TreeError::TimedOut(self.credential_timeout)),
        }
    }

    /// Loads `user`'s connected credentials and aggregates them.
    pub async fn aggregate_for_user(&self, store: &dyn CredentialStore, user: UserId) -> AppResult<Aggregation> {
        let credentials = store.list_connected(user).await?;
        tracing::info!(%user, credentials = credentials.len(), "aggregating drive trees");
        Ok(self.aggregate(credentials).await)
    }

    /// Fetches every connected credential. Disconnected ones are skipped even if passed in.
    pub async fn aggregate(&self, credentials: Vec<Credential>) -> Aggregation {
        self.metrics.inc_aggregations_started();

        let connected: Vec<Credential> = credentials
            .into_iter()
            .filter(|c| {
                if !c.is_connected {
                    tracing::debug!(credential_id = c.id, "skipping disconnected credential");
                }
                c.is_connected
            })
            .collect();

        let outcomes: Vec<CredentialOutcome> = stream::iter(connected)
            .map(|credential| async move {
                let span = tracing::info_span!("credential", credential_id = credential.id);
                let result = self.fetch_single(&credential.token).instrument(span).await;
                match &result {
                    Ok(drives) => {
                        self.metrics.inc_credentials_succeeded();
                        tracing::debug!(credential_id = credential.id, drives = drives.len(), "credential fetched");
                    }
                    Err(e) => {
                        self.metrics.inc_credentials_failed();
                        tracing::warn!(credential_id = credential.id, title = %credential.title, "credential fetch failed: {}", e);
                    }
                }
                CredentialOutcome { credential, result }
            })
            .buffered(self.credential_concurrency)
            .collect()
            .await;

        let aggregation = Aggregation { outcomes };
        if aggregation.failed() > 0 {
            tracing::warn!(
                failed = aggregation.failed(),
                total = aggregation.outcomes.len(),
                "aggregation finished with failed credentials"
            );
        }
        self.metrics.inc_aggregations_completed();
        aggregation
    }
}
