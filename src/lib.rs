//! # repo-harvest
//!
//! Enumerate the public repositories of a GitHub organization or user, turn
//! them into work items, and clone and archive each repository.
//!
//! ## Pipeline
//!
//! - [`github::RepositoryLister`] pages through the REST API and returns a
//!   star-ordered table of public repositories.
//! - [`table`] persists that table as CSV.
//! - [`batch`] splits a URL list into fixed-size batches for parallel runs.
//! - [`producer`] turns inbound items or URL lists into work records.
//! - [`consumer::Consumer`] clones every record's repository and packages the
//!   working trees as zip archives.
//!
//! Producers and consumers talk to the work-item host only through
//! [`work_items::WorkItemAdapter`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_harvest::consumer::Consumer;
//! use repo_harvest::work_items::{MemoryAdapter, WorkItemAdapter};
//! use repo_harvest::Config;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let consumer = Consumer::from_config(&config.consumer)?;
//!
//!     let mut host = MemoryAdapter::new([json!({"repo": "https://github.com/rust-lang/log"})]);
//!     let report = consumer.run(&mut host).await?;
//!     println!("{} archived, {} failed", report.done, report.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Splitting URL lists into batches
pub mod batch;
/// Configuration types
pub mod config;
/// Clone and archive
pub mod consumer;
/// Error types
pub mod error;
/// GitHub REST API listing
pub mod github;
/// Work-record producers
pub mod producer;
/// Repository table as CSV
pub mod table;
/// Core types
pub mod types;
/// Work-item host adapters
pub mod work_items;

pub use config::Config;
pub use consumer::{Consumer, ConsumerReport};
pub use error::{
    ArchiveError, CloneError, Error, Failure, FailureScope, Result, TableError, ToFailure,
    WorkItemError,
};
pub use producer::{ProducerReport, TableProducer};
pub use types::{
    ArchiveStrategy, Batch, BatchMatrix, EntityKind, MatrixEntry, RepositoryRecord, WorkItemId,
    WorkRecord,
};

/// Drive `task` to completion unless a termination signal arrives first.
///
/// On a signal the task is dropped, which removes any scratch directories it
/// owns and kills a running `git` child, and an error is returned.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_until_signal<T>(task: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        result = task => result,
        _ = wait_for_signal() => Err(Error::Other("interrupted by signal".into())),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
