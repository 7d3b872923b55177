//! Core types for repo-harvest

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Column headers of the repository table, in output order
pub const TABLE_HEADERS: [&str; 8] = [
    "Name",
    "Description",
    "Language",
    "Stars",
    "URL",
    "Created",
    "Last Updated",
    "Is Fork",
];

/// Kind of GitHub account that owns repositories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Organization account (`/orgs/{name}`)
    Org,
    /// Personal account (`/users/{name}`)
    User,
}

impl EntityKind {
    /// Path segment used by the REST API for this kind
    pub fn api_segment(&self) -> &'static str {
        match self {
            EntityKind::Org => "orgs",
            EntityKind::User => "users",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Org => write!(f, "org"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "org" | "organization" => Ok(EntityKind::Org),
            "user" => Ok(EntityKind::User),
            other => Err(format!("unknown entity kind '{other}' (expected 'org' or 'user')")),
        }
    }
}

/// One public repository as listed by the REST API
///
/// Fields the API omitted are `None`; nothing is replaced by a sentinel.
/// Serialized field names match the table headers so the same record can be
/// written as a CSV row or emitted as a work-item payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Repository name
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    /// Free-form description
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    /// Primary language as detected by GitHub
    #[serde(rename = "Language", default)]
    pub language: Option<String>,
    /// Stargazer count
    #[serde(rename = "Stars", default)]
    pub stars: Option<u64>,
    /// Browser URL of the repository (also clonable)
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    /// Creation timestamp, verbatim from the API
    #[serde(rename = "Created", default)]
    pub created: Option<String>,
    /// Last update timestamp, verbatim from the API
    #[serde(rename = "Last Updated", default)]
    pub last_updated: Option<String>,
    /// Whether the repository is a fork
    #[serde(rename = "Is Fork", default)]
    pub is_fork: Option<bool>,
}

impl RepositoryRecord {
    /// Star count used for ordering (missing counts as zero)
    pub fn stars_or_zero(&self) -> u64 {
        self.stars.unwrap_or(0)
    }
}

/// Payload shapes accepted by the consumer
///
/// The minimal shape is tried first; any object without a `repo` key is read
/// as a full repository record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkRecord {
    /// `{"repo": "<url>"}` emitted by the URL-list producer
    Url {
        /// Repository URL
        repo: String,
    },
    /// Full repository record emitted by the table producer
    Repository(RepositoryRecord),
}

impl WorkRecord {
    /// The repository URL carried by this record, if present and non-blank
    pub fn url(&self) -> Option<&str> {
        let url = match self {
            WorkRecord::Url { repo } => Some(repo.as_str()),
            WorkRecord::Repository(record) => record.url.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

impl From<RepositoryRecord> for WorkRecord {
    fn from(record: RepositoryRecord) -> Self {
        WorkRecord::Repository(record)
    }
}

/// Identifier of a work item within one host session
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub u64);

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous slice of the URL list handed to one execution unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based ordinal
    pub index: usize,
    /// URLs in input order
    pub urls: Vec<String>,
}

impl Batch {
    /// File name the batch is persisted under
    pub fn file_name(&self) -> String {
        format!("batch{}.json", self.index)
    }
}

/// One entry of the fan-out descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Batch file name relative to the batches directory
    pub file: String,
    /// Batch ordinal
    pub batch: usize,
}

/// Fan-out descriptor written as `matrix.json`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMatrix {
    /// One entry per batch, in ordinal order
    pub include: Vec<MatrixEntry>,
}

/// How the consumer packages cloned repositories
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStrategy {
    /// One archive holding every repository as a top-level directory
    #[default]
    Aggregate,
    /// One archive per repository, attached to an output work item
    PerRecord,
}

impl FromStr for ArchiveStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "aggregate" => Ok(ArchiveStrategy::Aggregate),
            "per_record" => Ok(ArchiveStrategy::PerRecord),
            other => Err(format!(
                "unknown archive strategy '{other}' (expected 'aggregate' or 'per-record')"
            )),
        }
    }
}

impl std::fmt::Display for ArchiveStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveStrategy::Aggregate => write!(f, "aggregate"),
            ArchiveStrategy::PerRecord => write!(f, "per-record"),
        }
    }
}
