//! Splitting a URL list into fixed-size batches for parallel execution units.
//!
//! Output layout under the configured root:
//!
//! ```text
//! <root>/batches/batch0.json   ["https://...", ...]
//! <root>/batches/batch1.json
//! <root>/matrix.json           {"include": [{"file": "batch0.json", "batch": 0}, ...]}
//! ```

use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::types::{Batch, BatchMatrix, MatrixEntry};
use std::path::Path;
use tracing::{debug, info};

/// Split newline-separated text into URLs, trimming and dropping blank lines
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Read a newline-separated URL file
pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read URL list {}: {}", path.display(), e),
        ))
    })?;
    Ok(parse_url_list(&text))
}

/// Read a persisted `batch{N}.json` file back into its URLs
pub async fn read_batch_file(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read batch file {}: {}", path.display(), e),
        ))
    })?;
    let urls: Vec<String> = serde_json::from_slice(&bytes)?;
    Ok(urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect())
}

/// Partition URLs into contiguous, order-preserving batches
///
/// Blank entries are dropped first. Every batch but the last holds exactly
/// `batch_size` URLs; an empty list yields no batches.
pub fn split_into_batches(urls: &[String], batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(Error::Config {
            message: "batch size must be positive".into(),
            key: Some("batch.batch_size".into()),
        });
    }

    let urls: Vec<String> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect();

    Ok(urls
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            urls: chunk.to_vec(),
        })
        .collect())
}

/// Persist batches and the fan-out descriptor
///
/// Returns the descriptor that was written to `matrix.json`.
pub async fn write_batches(batches: &[Batch], config: &BatchConfig) -> Result<BatchMatrix> {
    let batches_dir = config.batches_dir();
    tokio::fs::create_dir_all(&batches_dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create {}: {}", batches_dir.display(), e),
        ))
    })?;

    let mut matrix = BatchMatrix::default();
    for batch in batches {
        let file = batch.file_name();
        let path = batches_dir.join(&file);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&batch.urls)?).await?;
        debug!(batch = batch.index, urls = batch.urls.len(), path = %path.display(), "batch written");

        matrix.include.push(MatrixEntry {
            file,
            batch: batch.index,
        });
    }

    let matrix_path = config.matrix_path();
    tokio::fs::write(&matrix_path, serde_json::to_vec_pretty(&matrix)?).await?;

    info!(
        batches = batches.len(),
        matrix = %matrix_path.display(),
        "batches written"
    );
    Ok(matrix)
}

/// Read `urls_file`, split it and persist the result
pub async fn split_url_file(urls_file: &Path, config: &BatchConfig) -> Result<BatchMatrix> {
    let urls = read_url_list(urls_file).await?;
    let batches = split_into_batches(&urls, config.batch_size)?;
    write_batches(&batches, config).await
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://github.com/acme/r{i}")).collect()
    }

    fn config_in(root: &Path, batch_size: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            output_root: root.to_path_buf(),
        }
    }

    #[test]
    fn splits_250_into_100_100_50() {
        let batches = split_into_batches(&urls(250), 100).unwrap();

        let sizes: Vec<usize> = batches.iter().map(|b| b.urls.len()).collect();
        let ordinals: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(batches[1].urls[0], "https://github.com/acme/r100");
        assert_eq!(batches[2].urls[49], "https://github.com/acme/r249");
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let batches = split_into_batches(&urls(200), 100).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn blank_lines_contribute_nothing() {
        let parsed = parse_url_list("https://x/a\n\n   \nhttps://x/b\r\n  https://x/c  \n");
        assert_eq!(parsed, vec!["https://x/a", "https://x/b", "https://x/c"]);

        let with_blanks = vec!["a".to_string(), "".to_string(), "  ".to_string(), "b".to_string()];
        let batches = split_into_batches(&with_blanks, 1).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        match split_into_batches(&urls(3), 0) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("batch.batch_size")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn writes_batch_files_and_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), 2);
        let batches = split_into_batches(&urls(5), 2).unwrap();

        let matrix = write_batches(&batches, &config).await.unwrap();

        assert_eq!(matrix.include.len(), 3);
        assert_eq!(matrix.include[2].file, "batch2.json");
        assert_eq!(matrix.include[2].batch, 2);

        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("matrix.json")).unwrap()).unwrap();
        assert_eq!(
            on_disk,
            serde_json::json!({"include": [
                {"file": "batch0.json", "batch": 0},
                {"file": "batch1.json", "batch": 1},
                {"file": "batch2.json", "batch": 2}
            ]})
        );

        let last = read_batch_file(&dir.path().join("batches/batch2.json"))
            .await
            .unwrap();
        assert_eq!(last, vec!["https://github.com/acme/r4"]);
    }

    #[tokio::test]
    async fn empty_input_writes_empty_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let urls_file = dir.path().join("urls.txt");
        std::fs::write(&urls_file, "\n  \n").unwrap();

        let matrix = split_url_file(&urls_file, &config_in(dir.path(), 100))
            .await
            .unwrap();

        assert!(matrix.include.is_empty());
        let entries = std::fs::read_dir(dir.path().join("batches")).unwrap().count();
        assert_eq!(entries, 0);
        let text = std::fs::read_to_string(dir.path().join("matrix.json")).unwrap();
        assert!(text.contains("\"include\": []"));
    }

    #[tokio::test]
    async fn missing_url_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = split_url_file(&dir.path().join("nope.txt"), &config_in(dir.path(), 10)).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
