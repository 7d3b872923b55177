//! In-process work-item host.

use super::{Ledger, WorkItem, WorkItemAdapter, WorkItemState, attachment_name};
use crate::error::{Failure, Result};
use crate::types::WorkItemId;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Adapter that keeps inputs, outputs and release states in memory
///
/// Attachments are recorded by path without copying.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    ledger: Ledger,
}

impl MemoryAdapter {
    /// Create an adapter whose inputs are `payloads`, in order
    pub fn new(payloads: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self::with_files(payloads.into_iter().map(|p| (p, BTreeMap::new())))
    }

    /// Create an adapter whose inputs carry attachments
    pub fn with_files(
        inputs: impl IntoIterator<Item = (serde_json::Value, BTreeMap<String, PathBuf>)>,
    ) -> Self {
        Self {
            ledger: Ledger::new(inputs.into_iter().collect()),
        }
    }

    /// Release state of every input item
    pub fn states(&self) -> &BTreeMap<WorkItemId, WorkItemState> {
        self.ledger.states()
    }

    /// Release state of one input item
    pub fn state(&self, id: WorkItemId) -> Option<&WorkItemState> {
        self.ledger.states().get(&id)
    }

    /// Items emitted so far, in emission order
    pub fn outputs(&self) -> &[WorkItem] {
        self.ledger.outputs()
    }
}

#[async_trait]
impl WorkItemAdapter for MemoryAdapter {
    async fn next_input(&mut self) -> Result<Option<WorkItem>> {
        Ok(self.ledger.next_input())
    }

    async fn mark_done(&mut self, item: &WorkItem) -> Result<()> {
        self.ledger.release(item.id, WorkItemState::Done)
    }

    async fn mark_failed(&mut self, item: &WorkItem, failure: Failure) -> Result<()> {
        self.ledger.release(item.id, WorkItemState::Failed(failure))
    }

    async fn emit(&mut self, payload: serde_json::Value) -> Result<WorkItem> {
        Ok(self.ledger.emit(payload))
    }

    async fn attach_file(&mut self, item: &WorkItem, path: &Path) -> Result<()> {
        let name = attachment_name(path)?;
        self.ledger.attach(item.id, name, path.to_path_buf())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureScope;
    use serde_json::json;

    #[tokio::test]
    async fn records_done_and_failed_releases() {
        let mut host = MemoryAdapter::new([json!({"a": 1}), json!({"b": 2})]);

        let first = host.next_input().await.unwrap().unwrap();
        let second = host.next_input().await.unwrap().unwrap();
        assert!(host.next_input().await.unwrap().is_none());

        host.mark_done(&first).await.unwrap();
        host.mark_failed(&second, Failure::business("GIT_ERROR", "not found"))
            .await
            .unwrap();

        assert_eq!(host.state(first.id), Some(&WorkItemState::Done));
        match host.state(second.id) {
            Some(WorkItemState::Failed(f)) => {
                assert_eq!(f.scope, FailureScope::Business);
                assert_eq!(f.code, "GIT_ERROR");
            }
            other => panic!("expected failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn emitted_items_collect_attachments() {
        let mut host = MemoryAdapter::new(Vec::new());

        let out = host.emit(json!({"repo": "r"})).await.unwrap();
        host.attach_file(&out, Path::new("/tmp/out/robo.zip"))
            .await
            .unwrap();

        assert_eq!(host.outputs().len(), 1);
        assert_eq!(host.outputs()[0].payload, json!({"repo": "r"}));
        assert_eq!(
            host.outputs()[0].files.get("robo.zip"),
            Some(&PathBuf::from("/tmp/out/robo.zip"))
        );
    }
}
