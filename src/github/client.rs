//! HTTP client for the GitHub REST API.

use super::convert::RawRepository;
use crate::config::GithubConfig;
use crate::error::Result;
use crate::types::EntityKind;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;

/// Media type requested from the API
pub const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

/// Result of requesting one listing page
#[derive(Debug)]
pub enum PageOutcome {
    /// 200 with a decoded page body (possibly empty)
    Entries(Vec<RawRepository>),
    /// 403 whose body reports an exhausted rate limit
    RateLimited,
    /// Any other status
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, for logging
        body: String,
    },
}

/// Classify an entity from the status of `GET /orgs/{entity}`
///
/// Only a 200 means organization. Everything else, including a probe that
/// never got a response (`None`), falls back to the less privileged "user".
pub fn classify_probe(status: Option<u16>) -> EntityKind {
    match status {
        Some(200) => EntityKind::Org,
        _ => EntityKind::User,
    }
}

/// Whether a response signals an exhausted rate limit
pub fn is_rate_limited(status: u16, body: &str) -> bool {
    status == 403 && body.to_ascii_lowercase().contains("rate limit exceeded")
}

/// Thin wrapper over `reqwest::Client` preconfigured for the REST API
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api_host: String,
    per_page: usize,
}

impl GithubClient {
    /// Build a client from configuration
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_ACCEPT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            per_page: config.per_page,
        })
    }

    /// Page size used for listing requests
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    fn entity_url(&self, kind: EntityKind, entity: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_host,
            kind.api_segment(),
            urlencoding::encode(entity)
        )
    }

    /// Listing endpoint for an entity
    pub fn repos_url(&self, kind: EntityKind, entity: &str) -> String {
        format!("{}/repos", self.entity_url(kind, entity))
    }

    /// Decide whether `entity` is an organization with a single probe request
    pub async fn probe_entity_kind(&self, entity: &str) -> EntityKind {
        let url = self.entity_url(EntityKind::Org, entity);

        let status = match self.http.get(&url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                debug!(entity, error = %e, "entity probe got no response");
                None
            }
        };

        let kind = classify_probe(status);
        debug!(entity, ?status, %kind, "resolved entity kind");
        kind
    }

    /// Request one page of the listing, most recently updated first
    ///
    /// Transport and body-decoding failures are returned as errors; HTTP
    /// statuses are reported through [`PageOutcome`].
    pub async fn fetch_page(
        &self,
        kind: EntityKind,
        entity: &str,
        page: u32,
    ) -> Result<PageOutcome> {
        let response = self
            .http
            .get(self.repos_url(kind, entity))
            .query(&[
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let entries: Vec<RawRepository> = response.json().await?;
            return Ok(PageOutcome::Entries(entries));
        }

        let body = response.text().await.unwrap_or_default();
        if is_rate_limited(status.as_u16(), &body) {
            return Ok(PageOutcome::RateLimited);
        }

        Ok(PageOutcome::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}
