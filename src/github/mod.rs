//! GitHub REST API access for repository listing.
//!
//! # Module Structure
//!
//! - [`client`] - HTTP client, entity-kind probe and single-page requests
//! - [`convert`] - Raw API entries to [`RepositoryRecord`](crate::types::RepositoryRecord)
//! - [`listing`] - Pagination, filtering and ordering
//!
//! Listing never fails as a whole: transport errors, rate limiting and
//! unexpected statuses end pagination and the records gathered so far are
//! returned together with the reason pagination stopped.
//!
//! ```no_run
//! use repo_harvest::Config;
//! use repo_harvest::github::RepositoryLister;
//!
//! # async fn example() -> repo_harvest::Result<()> {
//! let lister = RepositoryLister::new(&Config::default())?;
//! let listing = lister.list("rust-lang", None).await;
//! println!("{} public repositories", listing.records.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod convert;
pub mod listing;

pub use client::{GithubClient, PageOutcome, classify_probe, is_rate_limited};
pub use convert::RawRepository;
pub use listing::{Listing, ListingTermination, RepositoryLister, sort_by_stars};
