//! Paginated repository listing with partial-result termination.

use super::client::{GithubClient, PageOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::types::{EntityKind, RepositoryRecord};
use std::cmp::Reverse;
use tracing::{debug, info, warn};

/// Why pagination stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingTermination {
    /// An empty or short page marked the end of the data
    Exhausted,
    /// The API reported an exhausted rate limit
    RateLimited {
        /// Page whose request was refused
        page: u32,
    },
    /// The API answered with a status other than 200
    HttpStatus {
        /// Page whose request failed
        page: u32,
        /// HTTP status code
        status: u16,
    },
    /// The request never produced a usable response
    Network {
        /// Page whose request failed
        page: u32,
        /// Error description
        message: String,
    },
}

/// Records gathered for one entity, and how gathering ended
#[derive(Clone, Debug)]
pub struct Listing {
    /// Entity name as requested
    pub entity: String,
    /// Resolved entity kind
    pub kind: EntityKind,
    /// Public repositories, stars descending
    pub records: Vec<RepositoryRecord>,
    /// Number of pages that returned data
    pub pages_fetched: u32,
    /// Reason pagination stopped
    pub termination: ListingTermination,
}

impl Listing {
    /// True when every page was read
    pub fn is_complete(&self) -> bool {
        self.termination == ListingTermination::Exhausted
    }
}

/// Order records by stars, highest first; missing counts are zero and ties
/// keep their original order.
pub fn sort_by_stars(records: &mut [RepositoryRecord]) {
    records.sort_by_key(|record| Reverse(record.stars_or_zero()));
}

/// Lists the public repositories of an organization or user
#[derive(Clone, Debug)]
pub struct RepositoryLister {
    client: GithubClient,
    include_forks: bool,
}

impl RepositoryLister {
    /// Build a lister from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: GithubClient::new(&config.github)?,
            include_forks: config.listing.include_forks,
        })
    }

    /// Build a lister around an existing client
    pub fn with_client(client: GithubClient, include_forks: bool) -> Self {
        Self {
            client,
            include_forks,
        }
    }

    /// Resolve the entity kind, probing the API when no hint is given
    pub async fn resolve_kind(&self, entity: &str, hint: Option<EntityKind>) -> EntityKind {
        match hint {
            Some(kind) => kind,
            None => self.client.probe_entity_kind(entity).await,
        }
    }

    /// Fetch every page for `entity` until the data ends or a request fails
    ///
    /// Failures never discard what was already gathered: the returned
    /// [`Listing`] holds the accumulated records and the termination reason.
    pub async fn list(&self, entity: &str, hint: Option<EntityKind>) -> Listing {
        let kind = self.resolve_kind(entity, hint).await;
        let per_page = self.client.per_page();

        let mut records = Vec::new();
        let mut page = 1u32;
        let mut pages_fetched = 0u32;
        let mut skipped_private = 0usize;
        let mut skipped_forks = 0usize;

        let termination = loop {
            let entries = match self.client.fetch_page(kind, entity, page).await {
                Ok(PageOutcome::Entries(entries)) => entries,
                Ok(PageOutcome::RateLimited) => {
                    warn!(entity, page, "rate limit exceeded, returning partial listing");
                    break ListingTermination::RateLimited { page };
                }
                Ok(PageOutcome::UnexpectedStatus { status, body }) => {
                    warn!(entity, page, status, body = %body, "failed to fetch repositories");
                    break ListingTermination::HttpStatus { page, status };
                }
                Err(e) => {
                    warn!(entity, page, error = %e, "request failed, returning partial listing");
                    break ListingTermination::Network {
                        page,
                        message: e.to_string(),
                    };
                }
            };

            if entries.is_empty() {
                break ListingTermination::Exhausted;
            }

            pages_fetched += 1;
            let page_len = entries.len();

            for entry in entries {
                if !entry.is_public() {
                    skipped_private += 1;
                    continue;
                }
                if entry.is_fork() && !self.include_forks {
                    skipped_forks += 1;
                    continue;
                }
                records.push(entry.into_record());
            }

            debug!(
                entity,
                page,
                page_len,
                total = records.len(),
                "fetched repository page"
            );

            if page_len < per_page {
                break ListingTermination::Exhausted;
            }
            page += 1;
        };

        sort_by_stars(&mut records);

        info!(
            entity,
            %kind,
            repositories = records.len(),
            pages = pages_fetched,
            skipped_private,
            skipped_forks,
            complete = termination == ListingTermination::Exhausted,
            "repository listing finished"
        );

        Listing {
            entity: entity.to_string(),
            kind,
            records,
            pages_fetched,
            termination,
        }
    }
}
