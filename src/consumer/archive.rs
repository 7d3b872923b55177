//! Deterministic zip packaging of working trees.
//!
//! Entries are stored relative to the packaged directory, in sorted path
//! order, with a fixed timestamp, so packaging the same tree twice yields the
//! same entry set and content. Symlinks are stored as symlink entries and
//! never followed. Directories named `.git` can be left out.

use crate::error::{ArchiveError, Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// What ended up in an archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive file
    pub path: PathBuf,
    /// Number of file and symlink entries
    pub files: usize,
    /// Number of directory entries
    pub directories: usize,
}

fn write_failed(archive: &Path, reason: impl std::fmt::Display) -> Error {
    ArchiveError::WriteFailed {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

fn read_failed(path: &Path, reason: impl std::fmt::Display) -> Error {
    ArchiveError::ReadFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(unix)]
fn permissions_of(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions_of(metadata: &std::fs::Metadata) -> u32 {
    if metadata.is_dir() { 0o755 } else { 0o644 }
}

/// Entry name: path relative to `source`, `/`-separated
fn entry_name(source: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(source)
        .map_err(|e| read_failed(path, e))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Package the contents of `source` into a new zip at `archive`
///
/// `source` itself is not an entry; its children are at the archive root.
/// A partially written archive is removed before an error is returned.
pub fn write_archive(source: &Path, archive: &Path, include_git: bool) -> Result<ArchiveSummary> {
    let result = write_archive_inner(source, archive, include_git);
    if result.is_err() {
        let _ = std::fs::remove_file(archive);
    }
    result
}

fn write_archive_inner(
    source: &Path,
    archive: &Path,
    include_git: bool,
) -> Result<ArchiveSummary> {
    if let Some(parent) = archive.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| write_failed(archive, e))?;
    }

    let file = File::create(archive).map_err(|e| write_failed(archive, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut summary = ArchiveSummary {
        path: archive.to_path_buf(),
        files: 0,
        directories: 0,
    };

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| include_git || entry.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
            read_failed(&path, e)
        })?;
        let path = entry.path();
        let name = entry_name(source, path)?;
        let metadata = entry.metadata().map_err(|e| read_failed(path, e))?;
        let options = base_options.unix_permissions(permissions_of(&metadata));
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = std::fs::read_link(path).map_err(|e| read_failed(path, e))?;
            zip.add_symlink(name, target.to_string_lossy(), options)
                .map_err(|e| write_failed(archive, e))?;
            summary.files += 1;
        } else if file_type.is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| write_failed(archive, e))?;
            summary.directories += 1;
        } else {
            zip.start_file(name, options)
                .map_err(|e| write_failed(archive, e))?;
            let mut input = File::open(path).map_err(|e| read_failed(path, e))?;
            std::io::copy(&mut input, &mut zip).map_err(|e| write_failed(archive, e))?;
            summary.files += 1;
        }
    }

    let mut writer = zip.finish().map_err(|e| write_failed(archive, e))?;
    writer.flush().map_err(|e| write_failed(archive, e))?;

    debug!(
        archive = %archive.display(),
        files = summary.files,
        directories = summary.directories,
        "archive written"
    );
    Ok(summary)
}

/// Package `source` off the async runtime
pub async fn package_directory(
    source: &Path,
    archive: &Path,
    include_git: bool,
) -> Result<ArchiveSummary> {
    let source = source.to_path_buf();
    let archive = archive.to_path_buf();

    let summary = tokio::task::spawn_blocking(move || write_archive(&source, &archive, include_git))
        .await
        .map_err(|e| ArchiveError::TaskFailed(e.to_string()))??;

    info!(
        archive = %summary.path.display(),
        files = summary.files,
        "repository archive created"
    );
    Ok(summary)
}
