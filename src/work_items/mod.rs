//! Work-item host capability and its adapters.
//!
//! Producers and consumers talk to the host only through
//! [`WorkItemAdapter`]. Two adapters are provided:
//!
//! - [`FileAdapter`] reads input items from a JSON file and writes emitted
//!   items plus a release ledger on [`WorkItemAdapter::flush`].
//! - [`MemoryAdapter`] keeps everything in process, for embedding and tests.
//!
//! Every input item must be released exactly once, either done or failed.

use crate::error::{Failure, Result, WorkItemError};
use crate::types::WorkItemId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

pub mod file;
pub mod memory;

pub use file::FileAdapter;
pub use memory::MemoryAdapter;

/// A unit of work: a JSON payload plus named file attachments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Host-assigned identifier
    pub id: WorkItemId,
    /// Arbitrary JSON payload
    pub payload: serde_json::Value,
    /// Attachments by file name
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
}

/// Release state of an input item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkItemState {
    /// Not yet released
    Pending,
    /// Released as done
    Done,
    /// Released as failed with the recorded triple
    Failed(Failure),
}

impl WorkItemState {
    /// Upper-case label used in logs and the persisted ledger
    pub fn label(&self) -> &'static str {
        match self {
            WorkItemState::Pending => "PENDING",
            WorkItemState::Done => "DONE",
            WorkItemState::Failed(_) => "FAILED",
        }
    }
}

/// Capability interface of the work-item host
///
/// # Examples
///
/// ```no_run
/// use repo_harvest::work_items::{MemoryAdapter, WorkItemAdapter};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> repo_harvest::Result<()> {
/// let mut host = MemoryAdapter::new([json!({"repo": "https://github.com/acme/robo"})]);
/// while let Some(item) = host.next_input().await? {
///     host.emit(item.payload.clone()).await?;
///     host.mark_done(&item).await?;
/// }
/// host.flush().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait WorkItemAdapter: Send {
    /// Next unreleased input item, or `None` when the input is exhausted
    async fn next_input(&mut self) -> Result<Option<WorkItem>>;

    /// Release an input item as done
    async fn mark_done(&mut self, item: &WorkItem) -> Result<()>;

    /// Release an input item as failed
    async fn mark_failed(&mut self, item: &WorkItem, failure: Failure) -> Result<()>;

    /// Create an output item carrying `payload`
    async fn emit(&mut self, payload: serde_json::Value) -> Result<WorkItem>;

    /// Attach a file to a previously emitted output item
    async fn attach_file(&mut self, item: &WorkItem, path: &Path) -> Result<()>;

    /// Persist whatever the adapter has buffered
    async fn flush(&mut self) -> Result<()>;
}

/// Bookkeeping shared by the adapters
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    queue: VecDeque<WorkItem>,
    states: BTreeMap<WorkItemId, WorkItemState>,
    outputs: Vec<WorkItem>,
    next_id: u64,
}

impl Ledger {
    /// Register input items in order, assigning ids from 1
    pub(crate) fn new(inputs: Vec<(serde_json::Value, BTreeMap<String, PathBuf>)>) -> Self {
        let mut ledger = Ledger::default();
        for (payload, files) in inputs {
            let id = ledger.allocate_id();
            ledger.states.insert(id, WorkItemState::Pending);
            ledger.queue.push_back(WorkItem { id, payload, files });
        }
        ledger
    }

    fn allocate_id(&mut self) -> WorkItemId {
        self.next_id += 1;
        WorkItemId(self.next_id)
    }

    pub(crate) fn next_input(&mut self) -> Option<WorkItem> {
        self.queue.pop_front()
    }

    pub(crate) fn release(&mut self, id: WorkItemId, state: WorkItemState) -> Result<()> {
        let current = self
            .states
            .get_mut(&id)
            .ok_or(WorkItemError::UnknownItem(id))?;

        if *current != WorkItemState::Pending {
            return Err(WorkItemError::AlreadyReleased {
                id,
                state: current.label().to_string(),
            }
            .into());
        }

        *current = state;
        Ok(())
    }

    pub(crate) fn emit(&mut self, payload: serde_json::Value) -> WorkItem {
        let item = WorkItem {
            id: self.allocate_id(),
            payload,
            files: BTreeMap::new(),
        };
        self.outputs.push(item.clone());
        item
    }

    pub(crate) fn attach(&mut self, id: WorkItemId, name: String, path: PathBuf) -> Result<()> {
        let output = self
            .outputs
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(WorkItemError::UnknownItem(id))?;
        output.files.insert(name, path);
        Ok(())
    }

    pub(crate) fn is_output(&self, id: WorkItemId) -> bool {
        self.outputs.iter().any(|o| o.id == id)
    }

    pub(crate) fn states(&self) -> &BTreeMap<WorkItemId, WorkItemState> {
        &self.states
    }

    pub(crate) fn outputs(&self) -> &[WorkItem] {
        &self.outputs
    }
}

/// File name component used when storing an attachment
pub(crate) fn attachment_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            WorkItemError::InvalidPayload(format!(
                "attachment path has no file name: {}",
                path.display()
            ))
            .into()
        })
}
