//! Configuration types for repo-harvest
//!
//! A [`Config`] is built once at process entry (defaults, optionally a JSON
//! file, then CLI overrides) and passed by reference to every stage. Nothing
//! reads configuration from the environment after startup.

use crate::error::{Error, Result};
use crate::types::ArchiveStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// GitHub REST API access settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the REST API (default: "https://api.github.com")
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// User-Agent header sent with every request (GitHub rejects requests without one)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page size for listing requests (default: 100, the API maximum)
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Timeout for a single HTTP request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            user_agent: default_user_agent(),
            per_page: default_per_page(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Repository listing behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Entity listed when none is given on the command line (default: "robocorp")
    #[serde(default = "default_entity")]
    pub default_entity: String,

    /// Keep forked repositories in the listing (default: false, forks are dropped)
    #[serde(default)]
    pub include_forks: bool,

    /// Where the CSV table is written when the CSV sink is enabled
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_entity: default_entity(),
            include_forks: false,
            csv_path: default_csv_path(),
        }
    }
}

/// Batch splitter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum URLs per batch (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory receiving `batches/` and `matrix.json` (default: ".")
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            output_root: default_output_root(),
        }
    }
}

impl BatchConfig {
    /// Directory holding the `batch{N}.json` files
    pub fn batches_dir(&self) -> PathBuf {
        self.output_root.join("batches")
    }

    /// Path of the fan-out descriptor
    pub fn matrix_path(&self) -> PathBuf {
        self.output_root.join("matrix.json")
    }
}

/// Local file-backed work-item host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkItemsConfig {
    /// JSON file holding the input work items
    #[serde(default = "default_work_items_input")]
    pub input_path: PathBuf,

    /// JSON file receiving emitted work items
    #[serde(default = "default_work_items_output")]
    pub output_path: PathBuf,
}

impl Default for WorkItemsConfig {
    fn default() -> Self {
        Self {
            input_path: default_work_items_input(),
            output_path: default_work_items_output(),
        }
    }
}

/// Clone-and-archive settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Directory receiving archives and the scratch clone root (default: "output")
    #[serde(default = "default_consumer_output_dir")]
    pub output_dir: PathBuf,

    /// Archival strategy (default: aggregate)
    #[serde(default)]
    pub strategy: ArchiveStrategy,

    /// File name of the aggregate archive (default: "repos.zip")
    ///
    /// Parallel execution units sharing an output location must use distinct names.
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Clone full history and keep `.git` in archives (default: false)
    ///
    /// When false, clones are shallow (`--depth 1`) and `.git` is left out of
    /// the archive, which keeps archives reproducible across runs.
    #[serde(default)]
    pub preserve_history: bool,

    /// Path to the git executable (auto-detected if None)
    #[serde(default)]
    pub git_path: Option<PathBuf>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_consumer_output_dir(),
            strategy: ArchiveStrategy::default(),
            archive_name: default_archive_name(),
            preserve_history: false,
            git_path: None,
        }
    }
}

impl ConsumerConfig {
    /// Scratch directory that holds working trees while they are alive
    pub fn clone_root(&self) -> PathBuf {
        self.output_dir.join("repos")
    }

    /// Full path of the aggregate archive
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_name)
    }
}

/// Main configuration for repo-harvest
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST API access
    #[serde(default)]
    pub github: GithubConfig,

    /// Listing behavior and CSV sink
    #[serde(default)]
    pub listing: ListingConfig,

    /// Batch splitter
    #[serde(default)]
    pub batch: BatchConfig,

    /// File-backed work-item host
    #[serde(default)]
    pub work_items: WorkItemsConfig,

    /// Clone and archive
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

impl Config {
    /// Load configuration from a JSON file; absent keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can work with
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> Error {
            Error::Config {
                message: message.to_string(),
                key: Some(key.to_string()),
            }
        }

        if self.github.api_host.trim().is_empty() {
            return Err(invalid("github.api_host", "API host must not be empty"));
        }
        if self.github.per_page == 0 {
            return Err(invalid("github.per_page", "page size must be positive"));
        }
        if self.github.request_timeout.is_zero() {
            return Err(invalid(
                "github.request_timeout",
                "request timeout must be positive",
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(invalid("batch.batch_size", "batch size must be positive"));
        }
        if self.consumer.archive_name.trim().is_empty() {
            return Err(invalid(
                "consumer.archive_name",
                "archive name must not be empty",
            ));
        }
        if self.consumer.archive_name.contains(['/', '\\']) {
            return Err(invalid(
                "consumer.archive_name",
                "archive name must be a file name, not a path",
            ));
        }
        if self.consumer.output_dir.as_os_str().is_empty() {
            return Err(invalid(
                "consumer.output_dir",
                "output directory must not be empty",
            ));
        }
        if self.listing.csv_path.as_os_str().is_empty() {
            return Err(invalid("listing.csv_path", "CSV path must not be empty"));
        }
        Ok(())
    }
}

fn default_api_host() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    concat!("repo-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_per_page() -> usize {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_entity() -> String {
    "robocorp".to_string()
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("devdata/work-items-in/test-input-for-producer/repos.csv")
}

fn default_batch_size() -> usize {
    100
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_work_items_input() -> PathBuf {
    PathBuf::from("devdata/work-items-in/input/work-items.json")
}

fn default_work_items_output() -> PathBuf {
    PathBuf::from("output/work-items.json")
}

fn default_consumer_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_archive_name() -> String {
    "repos.zip".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
