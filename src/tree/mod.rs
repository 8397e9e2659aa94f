//! Recursive folder/file discovery for a single credential.
//!
//! A fetch lists the credential's drives, then for every drive walks the folder hierarchy
//! from the root. Each folder is expanded at most once per fetch:
//!
//! - sub-folders are requested only when the provider flags `hasFolders`,
//! - files are requested for every folder and filtered to `type == "file"`.
//!
//! Sibling folders and a folder's two listings run concurrently; a per-fetch semaphore
//! caps how many provider calls are in flight. With `max_inflight_calls = 1` the walk is
//! strictly sequential and depth-first.
//!
//! Any provider failure aborts the whole fetch. Partially built drives are discarded.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::TreeConfig;
use crate::metrics::Metrics;
use crate::provider::{DriveProvider, EntryKind, FailureKind, ProviderCallFailed, RemoteDrive, RemoteFolder};
use crate::types::{DriveNode, FileNode, FolderNode};

#[derive(Debug, Clone, Error)]
pub enum TreeError {
    #[error("listing drives failed: {0}")]
    Drives(#[source] ProviderCallFailed),
    #[error("fetching drive {drive_id} failed: {source}")]
    Drive {
        drive_id: String,
        #[source]
        source: ProviderCallFailed,
    },
    #[error("tree fetch did not finish within {0:?}")]
    TimedOut(Duration),
}

impl TreeError {
    pub fn provider_failure(&self) -> Option<&ProviderCallFailed> {
        match self {
            TreeError::Drives(e) | TreeError::Drive { source: e, .. } => Some(e),
            TreeError::TimedOut(_) => None,
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        self.provider_failure().and_then(|e| e.status)
    }

    pub fn drive_id(&self) -> Option<&str> {
        match self {
            TreeError::Drive { drive_id, .. } => Some(drive_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_inflight_calls: usize,
    /// Levels of sub-folders below the root folders. `None` = unlimited.
    pub max_depth: Option<u32>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self { max_inflight_calls: 8, max_depth: None }
    }
}

impl From<&TreeConfig> for TreeOptions {
    fn from(cfg: &TreeConfig) -> Self {
        Self { max_inflight_calls: cfg.max_inflight_calls.max(1), max_depth: cfg.max_depth }
    }
}

/// Builds complete drive trees for one token at a time. Holds no per-fetch state.
#[derive(Clone)]
pub struct TreeFetcher {
    provider: Arc<dyn DriveProvider>,
    options: TreeOptions,
    metrics: Metrics,
}

impl TreeFetcher {
    pub fn new(provider: Arc<dyn DriveProvider>, options: TreeOptions, metrics: Metrics) -> Self {
        Self { provider, options, metrics }
    }

    /// Every drive of `token`, each with its full folder tree.
    pub async fn fetch(&self, token: &str) -> Result<Vec<DriveNode>, TreeError> {
        let run = FetchRun::new(self, token);

        let drives = run.limited(self.provider.list_drives(token)).await.map_err(TreeError::Drives)?;
        tracing::debug!(drives = drives.len(), "listed drives");

        let trees = try_join_all(drives.into_iter().map(|d| run.fetch_drive(d))).await?;

        let (folders, files) = trees.iter().flat_map(|d| d.folders.iter()).fold((0u64, 0u64), |(fo, fi), f| {
            (fo + f.folder_count() as u64, fi + f.file_count() as u64)
        });
        self.metrics.add_folders(folders);
        self.metrics.add_files(files);
        tracing::debug!(folders, files, "tree fetch complete");

        Ok(trees)
    }
}

/// State of one `fetch` call. Dropped when the fetch returns.
struct FetchRun<'a> {
    provider: &'a dyn DriveProvider,
    token: &'a str,
    permits: Semaphore,
    visited: Mutex<HashSet<(String, String)>>,
    max_depth: Option<u32>,
    metrics: &'a Metrics,
}

impl<'a> FetchRun<'a> {
    fn new(fetcher: &'a TreeFetcher, token: &'a str) -> Self {
        Self {
            provider: fetcher.provider.as_ref(),
            token,
            permits: Semaphore::new(fetcher.options.max_inflight_calls.max(1)),
            visited: Mutex::new(HashSet::new()),
            max_depth: fetcher.options.max_depth,
            metrics: &fetcher.metrics,
        }
    }

    /// Runs one provider call while holding an in-flight permit.
    async fn limited<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderCallFailed>>,
    ) -> Result<T, ProviderCallFailed> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderCallFailed::new(FailureKind::Transport, "-", "fetch was shut down"))?;
        self.metrics.inc_provider_calls();
        let res = call.await;
        if res.is_err() {
            self.metrics.inc_provider_failures();
        }
        res
    }

    /// Claims `folder_id` for expansion. False if it was already claimed in this run.
    fn first_visit(&self, drive_id: &str, folder_id: &str) -> bool {
        let mut visited = self.visited.lock().unwrap_or_else(|e| e.into_inner());
        visited.insert((drive_id.to_string(), folder_id.to_string()))
    }

    async fn fetch_drive(&self, drive: RemoteDrive) -> Result<DriveNode, TreeError> {
        let folders = self
            .discover_folders(&drive.id, None, 0)
            .instrument(tracing::debug_span!("drive", drive_id = %drive.id))
            .await
            .map_err(|source| TreeError::Drive { drive_id: drive.id.clone(), source })?;
        Ok(DriveNode::new(drive.id, drive.name, folders))
    }

    fn discover_folders<'s>(
        &'s self,
        drive_id: &'s str,
        parent_id: Option<&'s str>,
        depth: u32,
    ) -> BoxFuture<'s, Result<Vec<FolderNode>, ProviderCallFailed>> {
        async move {
            let records = self.limited(self.provider.list_folders(self.token, drive_id, parent_id)).await?;

            let branches = records
                .into_iter()
                .filter(|r| {
                    let first = self.first_visit(drive_id, &r.id);
                    if !first {
                        tracing::warn!(drive_id, folder_id = %r.id, "folder listed twice in one fetch, skipping");
                    }
                    first
                })
                .map(|r| self.expand_folder(drive_id, r, depth));

            try_join_all(branches).await
        }
        .boxed()
    }

    async fn expand_folder(
        &self,
        drive_id: &str,
        record: RemoteFolder,
        depth: u32,
    ) -> Result<FolderNode, ProviderCallFailed> {
        let may_descend = self.max_depth.map_or(true, |max| depth < max);
        if record.has_folders && !may_descend {
            tracing::debug!(drive_id, folder_id = %record.id, depth, "max depth reached, not descending");
        }

        let sub_folders = async {
            if record.has_folders && may_descend {
                self.discover_folders(drive_id, Some(&record.id), depth + 1).await
            } else {
                Ok(Vec::new())
            }
        };
        let files = self.discover_files(drive_id, &record.id);
        let (sub_folders, files) = tokio::try_join!(sub_folders, files)?;

        Ok(FolderNode {
            id: record.id,
            name: record.name,
            has_folders: record.has_folders,
            sub_folders,
            files,
        })
    }

    async fn discover_files(&self, drive_id: &str, parent_id: &str) -> Result<Vec<FileNode>, ProviderCallFailed> {
        let entries = self.limited(self.provider.list_children(self.token, drive_id, parent_id)).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::File)
            .map(|e| FileNode::new(e.id, e.name))
            .collect())
    }
}
