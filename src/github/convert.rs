//! Conversion from raw listing entries to repository records.

use crate::types::RepositoryRecord;
use serde::Deserialize;

/// The subset of a listing entry the crate reads
///
/// Every field is optional; unknown fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RawRepository {
    /// Repository name
    #[serde(default)]
    pub name: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language
    #[serde(default)]
    pub language: Option<String>,
    /// Stargazer count
    #[serde(default)]
    pub stargazers_count: Option<u64>,
    /// Browser URL
    #[serde(default)]
    pub html_url: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Fork flag
    #[serde(default)]
    pub fork: Option<bool>,
    /// Privacy flag
    #[serde(default)]
    pub private: Option<bool>,
}

impl RawRepository {
    /// Public only when the API says so explicitly; a missing flag counts as private.
    pub fn is_public(&self) -> bool {
        self.private == Some(false)
    }

    /// Whether the entry is a fork
    pub fn is_fork(&self) -> bool {
        self.fork == Some(true)
    }

    /// Project the entry onto a record
    pub fn into_record(self) -> RepositoryRecord {
        RepositoryRecord {
            name: self.name,
            description: self.description,
            language: self.language,
            stars: self.stargazers_count,
            url: self.html_url,
            created: self.created_at,
            last_updated: self.updated_at,
            is_fork: self.fork,
        }
    }
}
