//! Consumer: clone each inbound repository and package the working trees.
//!
//! # Strategies
//!
//! - [`ArchiveStrategy::Aggregate`]: every repository is cloned under the
//!   clone root, then one archive holding each repository as a top-level
//!   directory is written and the root is removed. A successful clone does
//!   not release its item yet: cloned items are marked done in one pass after
//!   the archive is written, so a failure to write it is fatal and leaves
//!   them pending.
//! - [`ArchiveStrategy::PerRecord`]: each repository is packaged on its own
//!   as `<output_dir>/<item id>-<name>.zip`, with its files at the archive
//!   root, attached to an emitted output item, and its working tree removed
//!   right away.
//!
//! Malformed payloads fail with APPLICATION scope, clone failures with
//! BUSINESS scope and code `GIT_ERROR`. Nothing is retried.

use crate::config::ConsumerConfig;
use crate::error::{Failure, Result, WorkItemError};
use crate::types::ArchiveStrategy;
use crate::work_items::{WorkItem, WorkItemAdapter};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub mod archive;
pub mod clone;
pub mod scratch;


pub use archive::{ArchiveSummary, package_directory, write_archive};
pub use clone::{Cloner, GitCliCloner, repository_dir_name};
pub use scratch::ScratchDir;

/// Outcome of a consumer run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Items released as done
    pub done: usize,
    /// Items released as failed
    pub failed: usize,
    /// Archives written, in creation order
    pub archives: Vec<PathBuf>,
}

/// Repository URL named by a payload, from `repo` or else `URL`
///
/// Only the URL field is inspected; the other columns of a full record may
/// hold any type. A blank or null URL is `None`.
pub fn record_url(payload: &serde_json::Value) -> Result<Option<&str>> {
    let object = payload.as_object().ok_or_else(|| {
        WorkItemError::InvalidPayload(format!("expected a JSON object, got {payload}"))
    })?;
    let value = match object.get("repo").or_else(|| object.get("URL")) {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let url = value.as_str().ok_or_else(|| {
        WorkItemError::InvalidPayload(format!("repository URL must be a string, got {value}"))
    })?;
    Ok(Some(url.trim()).filter(|u| !u.is_empty()))
}

/// Clones and packages repositories named by inbound work items
pub struct Consumer<C: Cloner> {
    cloner: C,
    config: ConsumerConfig,
}

impl Consumer<GitCliCloner> {
    /// Consumer backed by the system `git`
    pub fn from_config(config: &ConsumerConfig) -> Result<Self> {
        Ok(Self::new(GitCliCloner::from_config(config)?, config.clone()))
    }
}

impl<C: Cloner> Consumer<C> {
    /// Create a consumer with an explicit cloner
    pub fn new(cloner: C, config: ConsumerConfig) -> Self {
        Self { cloner, config }
    }

    /// Drain the adapter's inbound items with the configured strategy
    pub async fn run<A: WorkItemAdapter>(&self, adapter: &mut A) -> Result<ConsumerReport> {
        info!(
            strategy = %self.config.strategy,
            cloner = self.cloner.name(),
            output_dir = %self.config.output_dir.display(),
            "consumer starting"
        );

        let report = match self.config.strategy {
            ArchiveStrategy::Aggregate => self.run_aggregate(adapter).await?,
            ArchiveStrategy::PerRecord => self.run_per_record(adapter).await?,
        };

        info!(
            done = report.done,
            failed = report.failed,
            archives = report.archives.len(),
            "consumer finished"
        );
        Ok(report)
    }

    async fn run_aggregate<A: WorkItemAdapter>(&self, adapter: &mut A) -> Result<ConsumerReport> {
        let mut report = ConsumerReport::default();
        let root = ScratchDir::create(self.config.clone_root())?;
        let mut cloned: Vec<WorkItem> = Vec::new();

        while let Some(item) = adapter.next_input().await? {
            match self.clone_item(&item, root.path()).await {
                Ok(_) => cloned.push(item),
                Err(e) => {
                    adapter.mark_failed(&item, Failure::from(&e)).await?;
                    report.failed += 1;
                }
            }
        }

        if cloned.is_empty() {
            info!("no repositories cloned, skipping archive");
            root.close()?;
            return Ok(report);
        }

        let archive_path = self.config.archive_path();
        let summary = match package_directory(
            root.path(),
            &archive_path,
            self.config.preserve_history,
        )
        .await
        {
            Ok(summary) => summary,
            Err(e) => {
                error!(archive = %archive_path.display(), error = %e, "aggregate archive failed");
                if let Err(cleanup) = root.close() {
                    warn!(error = %cleanup, "clone root cleanup failed");
                }
                return Err(e);
            }
        };

        for item in &cloned {
            adapter.mark_done(item).await?;
            report.done += 1;
        }
        report.archives.push(summary.path);

        root.close()?;
        Ok(report)
    }

    async fn run_per_record<A: WorkItemAdapter>(
        &self,
        adapter: &mut A,
    ) -> Result<ConsumerReport> {
        let mut report = ConsumerReport::default();
        let root = ScratchDir::create(self.config.clone_root())?;

        while let Some(item) = adapter.next_input().await? {
            let tree = match self.clone_item(&item, root.path()).await {
                Ok(tree) => ScratchDir::adopt(tree),
                Err(e) => {
                    adapter.mark_failed(&item, Failure::from(&e)).await?;
                    report.failed += 1;
                    continue;
                }
            };

            let name = tree
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let archive_path = self
                .config
                .output_dir
                .join(format!("{}-{name}.zip", item.id));
            let packaged =
                package_directory(tree.path(), &archive_path, self.config.preserve_history).await;
            if let Err(e) = tree.close() {
                warn!(error = %e, "working tree cleanup failed");
            }

            match packaged {
                Ok(summary) => {
                    let output = adapter.emit(item.payload.clone()).await?;
                    adapter.attach_file(&output, &summary.path).await?;
                    adapter.mark_done(&item).await?;
                    report.done += 1;
                    report.archives.push(summary.path);
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "repository archive failed");
                    adapter.mark_failed(&item, Failure::from(&e)).await?;
                    report.failed += 1;
                }
            }
        }

        root.close()?;
        Ok(report)
    }

    /// Clone the repository named by `item` under `root`
    ///
    /// On failure, whatever git left behind is removed unless the destination
    /// existed beforehand.
    async fn clone_item(&self, item: &WorkItem, root: &Path) -> Result<PathBuf> {
        let url = record_url(&item.payload)?.ok_or(WorkItemError::MissingUrl)?;
        let name = repository_dir_name(url)?;
        let destination = root.join(&name);
        let existed = destination.exists();

        debug!(id = %item.id, url, destination = %destination.display(), "cloning repository");

        match self.cloner.clone_repository(url, &destination).await {
            Ok(()) => {
                info!(id = %item.id, url, "repository cloned");
                Ok(destination)
            }
            Err(e) => {
                warn!(id = %item.id, url, error = %e, "clone failed");
                if !existed && let Err(cleanup) = ScratchDir::adopt(&destination).close() {
                    warn!(error = %cleanup, "failed to remove partial clone");
                }
                Err(e)
            }
        }
    }
}
