//! File-backed work-item host for local runs.
//!
//! Input file (JSON array):
//!
//! ```json
//! [{"payload": {"table": "repos.csv"}, "files": {"repos.csv": "repos.csv"}}]
//! ```
//!
//! Relative attachment paths are resolved against the input file's directory.
//! On flush, emitted items are written to the output path in the same shape,
//! and the release state of every input item goes to `<output stem>.state.json`
//! next to it. Attachments of emitted items are copied under
//! `<output dir>/<item id>/`.

use super::{Ledger, WorkItem, WorkItemAdapter, WorkItemState, attachment_name};
use crate::config::WorkItemsConfig;
use crate::error::{Error, Failure, Result};
use crate::types::WorkItemId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    payload: serde_json::Value,
    #[serde(default)]
    files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Serialize)]
struct StateEntry<'a> {
    id: WorkItemId,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a Failure>,
}

/// Adapter reading and writing JSON files on the local filesystem
#[derive(Debug)]
pub struct FileAdapter {
    ledger: Ledger,
    output_path: PathBuf,
}

impl FileAdapter {
    /// Load input items from `config.input_path`
    ///
    /// A missing input file is an error; an empty array is valid.
    pub async fn open(config: &WorkItemsConfig) -> Result<Self> {
        let input_path = &config.input_path;
        let bytes = tokio::fs::read(input_path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to read work items from {}: {}",
                    input_path.display(),
                    e
                ),
            ))
        })?;

        let stored: Vec<StoredItem> = serde_json::from_slice(&bytes)?;
        let base = input_path.parent().unwrap_or_else(|| Path::new(""));

        let inputs = stored
            .into_iter()
            .map(|item| {
                let files = item
                    .files
                    .into_iter()
                    .map(|(name, path)| {
                        let resolved = if path.is_relative() {
                            base.join(path)
                        } else {
                            path
                        };
                        (name, resolved)
                    })
                    .collect();
                (item.payload, files)
            })
            .collect::<Vec<_>>();

        info!(
            path = %input_path.display(),
            items = inputs.len(),
            "loaded input work items"
        );

        Ok(Self {
            ledger: Ledger::new(inputs),
            output_path: config.output_path.clone(),
        })
    }

    /// Adapter with no input items, for producers that only emit
    pub fn empty(config: &WorkItemsConfig) -> Self {
        Self {
            ledger: Ledger::default(),
            output_path: config.output_path.clone(),
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Path of the release ledger written on flush
    pub fn state_path(&self) -> PathBuf {
        let stem = self
            .output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "work-items".to_string());
        self.output_dir().join(format!("{stem}.state.json"))
    }

    /// Release state of every input item
    pub fn states(&self) -> &BTreeMap<WorkItemId, WorkItemState> {
        self.ledger.states()
    }

    /// Items emitted so far
    pub fn outputs(&self) -> &[WorkItem] {
        self.ledger.outputs()
    }
}

#[async_trait]
impl WorkItemAdapter for FileAdapter {
    async fn next_input(&mut self) -> Result<Option<WorkItem>> {
        Ok(self.ledger.next_input())
    }

    async fn mark_done(&mut self, item: &WorkItem) -> Result<()> {
        self.ledger.release(item.id, WorkItemState::Done)?;
        debug!(id = %item.id, "work item done");
        Ok(())
    }

    async fn mark_failed(&mut self, item: &WorkItem, failure: Failure) -> Result<()> {
        warn!(
            id = %item.id,
            scope = %failure.scope,
            code = %failure.code,
            message = %failure.message,
            "work item failed"
        );
        self.ledger.release(item.id, WorkItemState::Failed(failure))
    }

    async fn emit(&mut self, payload: serde_json::Value) -> Result<WorkItem> {
        let item = self.ledger.emit(payload);
        debug!(id = %item.id, "work item emitted");
        Ok(item)
    }

    async fn attach_file(&mut self, item: &WorkItem, path: &Path) -> Result<()> {
        if !self.ledger.is_output(item.id) {
            return Err(crate::error::WorkItemError::UnknownItem(item.id).into());
        }

        let name = attachment_name(path)?;
        let target_dir = self.output_dir().join(item.id.to_string());
        tokio::fs::create_dir_all(&target_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create {}: {}", target_dir.display(), e),
            ))
        })?;

        let target = target_dir.join(&name);
        tokio::fs::copy(path, &target).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to copy attachment {} to {}: {}",
                    path.display(),
                    target.display(),
                    e
                ),
            ))
        })?;

        debug!(id = %item.id, file = %target.display(), "attachment stored");
        self.ledger.attach(item.id, name, target)
    }

    async fn flush(&mut self) -> Result<()> {
        let output_dir = self.output_dir();
        if !output_dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&output_dir).await?;
        }

        let outputs: Vec<StoredItem> = self
            .ledger
            .outputs()
            .iter()
            .map(|item| StoredItem {
                payload: item.payload.clone(),
                files: item.files.clone(),
            })
            .collect();
        tokio::fs::write(&self.output_path, serde_json::to_vec_pretty(&outputs)?).await?;

        let states: Vec<StateEntry<'_>> = self
            .ledger
            .states()
            .iter()
            .map(|(id, state)| StateEntry {
                id: *id,
                state: state.label(),
                exception: match state {
                    WorkItemState::Failed(failure) => Some(failure),
                    _ => None,
                },
            })
            .collect();
        let state_path = self.state_path();
        tokio::fs::write(&state_path, serde_json::to_vec_pretty(&states)?).await?;

        info!(
            outputs = outputs.len(),
            path = %self.output_path.display(),
            state = %state_path.display(),
            "work items flushed"
        );
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn adapter_for(dir: &Path, input: serde_json::Value) -> FileAdapter {
        let input_path = dir.join("in/work-items.json");
        std::fs::create_dir_all(input_path.parent().unwrap()).unwrap();
        std::fs::write(&input_path, serde_json::to_vec(&input).unwrap()).unwrap();

        FileAdapter::open(&WorkItemsConfig {
            input_path,
            output_path: dir.join("out/work-items.json"),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn relative_attachments_resolve_against_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = adapter_for(
            dir.path(),
            json!([{"payload": {"table": "repos.csv"}, "files": {"repos.csv": "repos.csv"}}]),
        )
        .await;

        let item = adapter.next_input().await.unwrap().unwrap();
        assert_eq!(item.payload, json!({"table": "repos.csv"}));
        assert_eq!(
            item.files.get("repos.csv"),
            Some(&dir.path().join("in/repos.csv"))
        );
    }

    #[tokio::test]
    async fn flush_writes_outputs_and_release_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = adapter_for(
            dir.path(),
            json!([{"payload": {"repo": "a"}}, {"payload": {"repo": "b"}}, {"payload": {}}]),
        )
        .await;

        let a = adapter.next_input().await.unwrap().unwrap();
        let b = adapter.next_input().await.unwrap().unwrap();
        adapter.mark_done(&a).await.unwrap();
        adapter
            .mark_failed(&b, Failure::business("GIT_ERROR", "repository not found"))
            .await
            .unwrap();

        let archive = dir.path().join("a.zip");
        std::fs::write(&archive, b"zip bytes").unwrap();
        let out = adapter.emit(json!({"repo": "a"})).await.unwrap();
        adapter.attach_file(&out, &archive).await.unwrap();
        adapter.flush().await.unwrap();

        let outputs: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("out/work-items.json")).unwrap(),
        )
        .unwrap();
        let stored = dir.path().join("out").join(out.id.to_string()).join("a.zip");
        assert_eq!(
            outputs,
            json!([{"payload": {"repo": "a"}, "files": {"a.zip": stored}}])
        );
        assert_eq!(std::fs::read(&stored).unwrap(), b"zip bytes");

        let states: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("out/work-items.state.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            states,
            json!([
                {"id": 1, "state": "DONE"},
                {"id": 2, "state": "FAILED", "exception": {
                    "type": "BUSINESS", "code": "GIT_ERROR", "message": "repository not found"
                }},
                {"id": 3, "state": "PENDING"}
            ])
        );
    }

    #[tokio::test]
    async fn attaching_to_an_input_item_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = adapter_for(dir.path(), json!([{"payload": {}}])).await;
        let input = adapter.next_input().await.unwrap().unwrap();

        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(adapter.attach_file(&input, &file).await.is_err());
    }

    #[tokio::test]
    async fn empty_adapter_writes_emitted_items_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkItemsConfig {
            input_path: dir.path().join("unused.json"),
            output_path: dir.path().join("out/items.json"),
        };
        let mut adapter = FileAdapter::empty(&config);

        assert!(adapter.next_input().await.unwrap().is_none());
        adapter.emit(json!({"repo": "https://x/a"})).await.unwrap();
        adapter.flush().await.unwrap();

        let outputs: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&config.output_path).unwrap()).unwrap();
        assert_eq!(outputs, json!([{"payload": {"repo": "https://x/a"}, "files": {}}]));
        assert_eq!(adapter.state_path(), dir.path().join("out/items.state.json"));
        assert_eq!(
            std::fs::read_to_string(adapter.state_path()).unwrap().trim(),
            "[]"
        );
    }

    #[tokio::test]
    async fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileAdapter::open(&WorkItemsConfig {
            input_path: dir.path().join("absent.json"),
            output_path: dir.path().join("out.json"),
        })
        .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
