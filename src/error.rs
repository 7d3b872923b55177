//! Error types for repo-harvest
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (table, work item, clone, archive)
//! - Mapping onto the work-item host's failure triple (scope, code, message)
//! - Context information (row, column, repository URL, archive path)

use crate::types::WorkItemId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repo-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repo-harvest
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch.batch_size")
        key: Option<String>,
    },

    /// Repository table could not be read or written
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// Work-item payload or host error
    #[error("work item error: {0}")]
    WorkItem(#[from] WorkItemError),

    /// Repository clone failed
    #[error("clone error: {0}")]
    Clone(#[from] CloneError),

    /// Archive creation failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// External tool execution failed (git not found, spawn failure)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while reading or writing the repository table
#[derive(Debug, Error)]
pub enum TableError {
    /// Table file referenced by a work item does not exist
    #[error("table file not found: {path}")]
    MissingFile {
        /// The path that could not be located
        path: PathBuf,
    },

    /// A row (or the header) lacks a required column
    #[error("row {row} is missing required field '{field}'")]
    MissingField {
        /// One-based data row number (0 means the header row)
        row: usize,
        /// The missing column name
        field: String,
    },

    /// A cell could not be converted to the column's type
    #[error("row {row} has invalid value '{value}' for field '{field}'")]
    InvalidField {
        /// One-based data row number
        row: usize,
        /// The column name
        field: String,
        /// The offending cell content
        value: String,
    },
}

/// Errors raised while interpreting work items or talking to the host
#[derive(Debug, Error)]
pub enum WorkItemError {
    /// Payload is not a JSON object or does not match any known record shape
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Payload carries neither a `URL` nor a `repo` field
    #[error("URL is missing in payload")]
    MissingUrl,

    /// A required payload field is absent
    #[error("missing field '{0}' in payload")]
    MissingField(String),

    /// The host does not know this item
    #[error("unknown work item {0}")]
    UnknownItem(WorkItemId),

    /// The item was already marked done or failed
    #[error("work item {id} was already released as {state}")]
    AlreadyReleased {
        /// The item that was released twice
        id: WorkItemId,
        /// The state it was released with
        state: String,
    },
}

/// Errors raised while cloning a repository
#[derive(Debug, Error)]
pub enum CloneError {
    /// `git clone` exited unsuccessfully
    #[error("git error while cloning {url}: {message}")]
    Git {
        /// The repository URL
        url: String,
        /// Trimmed stderr from git, or the exit status when stderr is empty
        message: String,
    },

    /// No directory name can be derived from the URL
    #[error("cannot derive a directory name from '{url}'")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },
}

/// Errors raised while writing a zip archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Writing the archive failed (disk full, permission denied, ...)
    #[error("failed to write archive {path}: {reason}")]
    WriteFailed {
        /// The archive being written
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// A source file could not be read while archiving
    #[error("failed to read {path} while archiving: {reason}")]
    ReadFailed {
        /// The file or directory that could not be read
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// The archiving task panicked or was cancelled
    #[error("archive task failed: {0}")]
    TaskFailed(String),
}

/// Who is responsible for a failed work item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailureScope {
    /// The input itself is bad (unreachable repository, bad credentials)
    Business,
    /// The payload or the processing environment is bad
    Application,
}

impl std::fmt::Display for FailureScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureScope::Business => write!(f, "BUSINESS"),
            FailureScope::Application => write!(f, "APPLICATION"),
        }
    }
}

/// Failure triple recorded against a work item
///
/// # Example JSON
///
/// ```json
/// { "type": "BUSINESS", "code": "GIT_ERROR", "message": "git error while cloning ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure scope
    #[serde(rename = "type")]
    pub scope: FailureScope,
    /// Machine-readable error code (e.g., "GIT_ERROR", "MISSING_URL")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl Failure {
    /// Create a failure triple
    pub fn new(scope: FailureScope, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a business-scope failure
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureScope::Business, code, message)
    }

    /// Create an application-scope failure
    pub fn application(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureScope::Application, code, message)
    }
}

/// Map domain errors onto the work-item host's failure vocabulary
pub trait ToFailure {
    /// Get the failure scope for this error
    fn failure_scope(&self) -> FailureScope;

    /// Get the machine-readable error code
    fn failure_code(&self) -> &str;
}

impl ToFailure for Error {
    fn failure_scope(&self) -> FailureScope {
        match self {
            // Problems with the repository itself
            Error::Clone(CloneError::Git { .. }) => FailureScope::Business,

            // Everything else is the payload's or the environment's fault
            Error::Clone(CloneError::InvalidUrl { .. }) => FailureScope::Application,
            Error::Config { .. }
            | Error::Table(_)
            | Error::WorkItem(_)
            | Error::Archive(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::Csv(_)
            | Error::ExternalTool(_)
            | Error::Other(_) => FailureScope::Application,
        }
    }

    fn failure_code(&self) -> &str {
        match self {
            Error::Config { .. } => "CONFIG_ERROR",
            Error::Table(e) => match e {
                TableError::MissingFile { .. } => "MISSING_FILE",
                TableError::MissingField { .. } => "MISSING_FIELD",
                TableError::InvalidField { .. } => "INVALID_FIELD",
            },
            Error::WorkItem(e) => match e {
                WorkItemError::InvalidPayload(_) => "INVALID_PAYLOAD",
                WorkItemError::MissingUrl => "MISSING_URL",
                WorkItemError::MissingField(_) => "MISSING_FIELD",
                WorkItemError::UnknownItem(_) => "UNKNOWN_ITEM",
                WorkItemError::AlreadyReleased { .. } => "ALREADY_RELEASED",
            },
            Error::Clone(e) => match e {
                CloneError::Git { .. } => "GIT_ERROR",
                CloneError::InvalidUrl { .. } => "INVALID_URL",
            },
            Error::Archive(_) => "ARCHIVE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Network(_) => "NETWORK_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Csv(_) => "CSV_ERROR",
            Error::ExternalTool(_) => "EXTERNAL_TOOL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Failure {
            scope: error.failure_scope(),
            code: error.failure_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure::from(&error)
    }
}
