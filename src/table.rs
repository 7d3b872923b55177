//! Repository table persistence as delimited text.
//!
//! The table has a fixed header row ([`TABLE_HEADERS`]) followed by one row
//! per [`RepositoryRecord`]. Missing values are written as empty cells and
//! read back as `None`, so an empty string and a missing value are not
//! distinguished.
//!
//! Reading is strict: every header column must be present and every row must
//! carry a cell for every column, otherwise [`TableError::MissingField`] is
//! returned and no records are produced.

use crate::error::{Error, Result, TableError};
use crate::types::{RepositoryRecord, TABLE_HEADERS};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Write records, header first, to any writer
pub fn write_records<W: io::Write>(writer: W, records: &[RepositoryRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(TABLE_HEADERS)?;
    for record in records {
        csv_writer.write_record(row_cells(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write records to `path`, creating parent directories
pub fn write_table(path: &Path, records: &[RepositoryRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create {}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let file = std::fs::File::create(path)?;
    write_records(io::BufWriter::new(file), records)?;

    info!(
        path = %path.display(),
        rows = records.len(),
        "repository table written"
    );
    Ok(())
}

/// Read records from any reader
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<RepositoryRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut columns = [0usize; TABLE_HEADERS.len()];
    for (slot, name) in columns.iter_mut().zip(TABLE_HEADERS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| TableError::MissingField {
                row: 0,
                field: name.to_string(),
            })?;
    }

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let row_number = index + 1;

        let mut cells: [&str; TABLE_HEADERS.len()] = [""; TABLE_HEADERS.len()];
        for ((cell, &column), name) in cells.iter_mut().zip(columns.iter()).zip(TABLE_HEADERS) {
            *cell = row.get(column).ok_or_else(|| TableError::MissingField {
                row: row_number,
                field: name.to_string(),
            })?;
        }

        records.push(parse_row(row_number, &cells)?);
    }

    debug!(rows = records.len(), "repository table parsed");
    Ok(records)
}

/// Read records from `path`
///
/// A missing file is reported as [`TableError::MissingFile`].
pub fn read_table(path: &Path) -> Result<Vec<RepositoryRecord>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TableError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };
    read_records(io::BufReader::new(file))
}

fn row_cells(record: &RepositoryRecord) -> [String; TABLE_HEADERS.len()] {
    [
        record.name.clone().unwrap_or_default(),
        record.description.clone().unwrap_or_default(),
        record.language.clone().unwrap_or_default(),
        record.stars.map(|s| s.to_string()).unwrap_or_default(),
        record.url.clone().unwrap_or_default(),
        record.created.clone().unwrap_or_default(),
        record.last_updated.clone().unwrap_or_default(),
        record.is_fork.map(|f| f.to_string()).unwrap_or_default(),
    ]
}

fn text(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn invalid(row: usize, field: &str, value: &str) -> Error {
    TableError::InvalidField {
        row,
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

/// Stars may have been written as a float ("12.0") by other tooling
fn parse_stars(row: usize, cell: &str) -> Result<Option<u64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    if let Ok(stars) = cell.parse::<u64>() {
        return Ok(Some(stars));
    }
    match cell.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
            Ok(Some(value as u64))
        }
        _ => Err(invalid(row, "Stars", cell)),
    }
}

fn parse_fork(row: usize, cell: &str) -> Result<Option<bool>> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(invalid(row, "Is Fork", cell)),
    }
}

fn parse_row(row: usize, cells: &[&str; TABLE_HEADERS.len()]) -> Result<RepositoryRecord> {
    Ok(RepositoryRecord {
        name: text(cells[0]),
        description: text(cells[1]),
        language: text(cells[2]),
        stars: parse_stars(row, cells[3])?,
        url: text(cells[4]),
        created: text(cells[5]),
        last_updated: text(cells[6]),
        is_fork: parse_fork(row, cells[7])?,
    })
}
