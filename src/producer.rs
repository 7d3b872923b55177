//! Producers: turn inbound work items or a URL list into repository work records.
//!
//! Two variants exist:
//!
//! - [`TableProducer`] builds a repository table per inbound item, either from
//!   a live listing (`{"org": "<entity>"}`) or from a CSV file
//!   (`{"table": "<path>"}`), and emits one full record per row.
//! - [`produce_from_url_list`] emits one `{"repo": "<url>"}` record per URL
//!   without touching the network.
//!
//! A table is fully read and validated before anything is emitted for it, so
//! a malformed table releases its inbound item as failed with no partial
//! output.

use crate::batch::{read_batch_file, read_url_list};
use crate::config::Config;
use crate::error::{Failure, Result, WorkItemError};
use crate::github::RepositoryLister;
use crate::table;
use crate::types::{EntityKind, RepositoryRecord, WorkRecord};
use crate::work_items::{WorkItem, WorkItemAdapter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the table for one inbound item comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableSource {
    /// Live listing of an organization or user
    Listing {
        /// Organization or user name
        entity: String,
        /// Explicit kind; probed when absent
        kind: Option<EntityKind>,
        /// Also write the listing to the configured CSV path
        write_csv: bool,
    },
    /// Previously written CSV table
    File(PathBuf),
}

impl TableSource {
    /// Interpret an inbound payload
    ///
    /// A `table` value naming one of the item's attachments resolves to the
    /// attachment's path.
    pub fn from_payload(
        payload: &serde_json::Value,
        files: &BTreeMap<String, PathBuf>,
    ) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| {
            WorkItemError::InvalidPayload(format!("expected a JSON object, got {payload}"))
        })?;

        if let Some(table) = object.get("table") {
            let name = non_blank_str(table, "table")?;
            let path = files
                .get(name)
                .cloned()
                .unwrap_or_else(|| PathBuf::from(name));
            return Ok(TableSource::File(path));
        }

        if let Some(entity) = object.get("org") {
            let entity = non_blank_str(entity, "org")?.to_string();
            let kind = match object.get("entity_kind") {
                None | Some(serde_json::Value::Null) => None,
                Some(value) => Some(
                    non_blank_str(value, "entity_kind")?
                        .parse::<EntityKind>()
                        .map_err(WorkItemError::InvalidPayload)?,
                ),
            };
            let write_csv = match object.get("write_csv") {
                None | Some(serde_json::Value::Null) => false,
                Some(serde_json::Value::Bool(flag)) => *flag,
                Some(other) => {
                    return Err(WorkItemError::InvalidPayload(format!(
                        "'write_csv' must be a boolean, got {other}"
                    ))
                    .into());
                }
            };
            return Ok(TableSource::Listing {
                entity,
                kind,
                write_csv,
            });
        }

        Err(WorkItemError::MissingField("org".into()).into())
    }
}

fn non_blank_str<'a>(value: &'a serde_json::Value, field: &str) -> Result<&'a str> {
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(WorkItemError::MissingField(field.to_string()).into()),
        None => Err(WorkItemError::InvalidPayload(format!(
            "'{field}' must be a string, got {value}"
        ))
        .into()),
    }
}

/// Counters returned by a producer run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Inbound items released as done
    pub inputs_done: usize,
    /// Inbound items released as failed
    pub inputs_failed: usize,
    /// Work records emitted
    pub emitted: usize,
}

/// Producer that emits one full record per repository table row
pub struct TableProducer {
    lister: RepositoryLister,
    csv_path: PathBuf,
}

impl TableProducer {
    /// Build a producer with a lister and CSV sink taken from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_lister(
            RepositoryLister::new(config)?,
            config.listing.csv_path.clone(),
        ))
    }

    /// Build a producer around an existing lister
    pub fn with_lister(lister: RepositoryLister, csv_path: PathBuf) -> Self {
        Self { lister, csv_path }
    }

    /// Drain the adapter's inbound items
    ///
    /// Per-item problems release that item as failed and processing
    /// continues; adapter errors abort the run.
    pub async fn run<A: WorkItemAdapter>(&self, adapter: &mut A) -> Result<ProducerReport> {
        let mut report = ProducerReport::default();

        while let Some(item) = adapter.next_input().await? {
            match self.load_table(&item).await {
                Ok(records) => {
                    let count = emit_records(adapter, records).await?;
                    adapter.mark_done(&item).await?;
                    report.emitted += count;
                    report.inputs_done += 1;
                    info!(id = %item.id, emitted = count, "inbound item produced");
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "inbound item failed");
                    adapter.mark_failed(&item, Failure::from(&e)).await?;
                    report.inputs_failed += 1;
                }
            }
        }

        info!(
            done = report.inputs_done,
            failed = report.inputs_failed,
            emitted = report.emitted,
            "table producer finished"
        );
        Ok(report)
    }

    async fn load_table(&self, item: &WorkItem) -> Result<Vec<RepositoryRecord>> {
        match TableSource::from_payload(&item.payload, &item.files)? {
            TableSource::File(path) => {
                debug!(id = %item.id, path = %path.display(), "reading repository table");
                table::read_table(&path)
            }
            TableSource::Listing {
                entity,
                kind,
                write_csv,
            } => {
                let listing = self.lister.list(&entity, kind).await;
                if !listing.is_complete() {
                    warn!(
                        entity = %entity,
                        termination = ?listing.termination,
                        records = listing.records.len(),
                        "producing from a partial listing"
                    );
                }
                if write_csv {
                    table::write_table(&self.csv_path, &listing.records)?;
                }
                Ok(listing.records)
            }
        }
    }
}

async fn emit_records<A: WorkItemAdapter>(
    adapter: &mut A,
    records: Vec<RepositoryRecord>,
) -> Result<usize> {
    let mut count = 0;
    for record in records {
        let payload = serde_json::to_value(WorkRecord::from(record))?;
        adapter.emit(payload).await?;
        count += 1;
    }
    Ok(count)
}

/// Emit one `{"repo": url}` record per non-blank URL, in order
///
/// Duplicates are emitted as often as they appear.
pub async fn produce_from_url_list<A: WorkItemAdapter>(
    adapter: &mut A,
    urls: &[String],
) -> Result<ProducerReport> {
    let mut report = ProducerReport::default();
    for url in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        let payload = serde_json::to_value(WorkRecord::Url {
            repo: url.to_string(),
        })?;
        adapter.emit(payload).await?;
        report.emitted += 1;
    }

    info!(emitted = report.emitted, "URL-list producer finished");
    Ok(report)
}

/// Load URLs from a newline list or a `batch{N}.json` file
pub async fn load_urls(path: &Path) -> Result<Vec<String>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        read_batch_file(path).await
    } else {
        read_url_list(path).await
    }
}
