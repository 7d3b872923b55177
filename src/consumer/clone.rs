//! Cloning repositories with the external `git` binary.

use crate::config::ConsumerConfig;
use crate::error::{CloneError, Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Directory name a repository is cloned into
///
/// Last path segment of the URL without a trailing `.git`. Handles
/// `https://`, `file://`, local paths, trailing slashes and scp-style
/// `git@host:owner/name.git` addresses.
pub fn repository_dir_name(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let without_suffix = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let segment = without_suffix
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or_default();
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() || name == "." || name == ".." {
        return Err(CloneError::InvalidUrl {
            url: url.to_string(),
        }
        .into());
    }
    Ok(name.to_string())
}

/// Anything that can materialize a repository working tree
#[async_trait]
pub trait Cloner: Send + Sync {
    /// Clone `url` into `destination`, which must not exist or be empty
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Cloner that shells out to `git clone`
///
/// Git runs with `GIT_TERMINAL_PROMPT=0` and a closed stdin, so a repository
/// that asks for credentials fails instead of hanging.
#[derive(Clone, Debug)]
pub struct GitCliCloner {
    binary_path: PathBuf,
    shallow: bool,
}

impl GitCliCloner {
    /// Create a cloner with an explicit git binary
    pub fn new(binary_path: PathBuf, shallow: bool) -> Self {
        Self {
            binary_path,
            shallow,
        }
    }

    /// Find `git` on `PATH`
    pub fn from_path(shallow: bool) -> Option<Self> {
        which::which("git").ok().map(|p| Self::new(p, shallow))
    }

    /// Use the configured git binary, falling back to `PATH` discovery
    pub fn from_config(config: &ConsumerConfig) -> Result<Self> {
        let shallow = !config.preserve_history;
        match &config.git_path {
            Some(path) => Ok(Self::new(path.clone(), shallow)),
            None => Self::from_path(shallow)
                .ok_or_else(|| Error::ExternalTool("git binary not found in PATH".into())),
        }
    }

    /// Whether clones are limited to the latest commit
    pub fn is_shallow(&self) -> bool {
        self.shallow
    }
}

#[async_trait]
impl Cloner for GitCliCloner {
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary_path);
        command.arg("clone").arg("--quiet");
        if self.shallow {
            command.arg("--depth").arg("1");
        }
        command
            .arg("--")
            .arg(url)
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(url, destination = %destination.display(), shallow = self.shallow, "running git clone");

        let output = command
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute git: {}", e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("git exited with {}", output.status)
        } else {
            stderr
        };
        Err(CloneError::Git {
            url: url.to_string(),
            message,
        }
        .into())
    }

    fn name(&self) -> &'static str {
        "git-cli"
    }
}
