//! Assertions over archives, ledgers and leftover directories

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

/// Every entry of a zip archive, name to content
pub fn archive_entries(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).expect("failed to open archive");
    let mut archive = zip::ZipArchive::new(file).expect("not a zip archive");
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).expect("failed to read entry");
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .expect("failed to read entry content");
        entries.insert(entry.name().to_string(), content);
    }
    entries
}

/// Assert no entry lives under a `.git` directory
pub fn assert_no_git_metadata(entries: &BTreeMap<String, Vec<u8>>) {
    let leaked: Vec<&String> = entries
        .keys()
        .filter(|name| name.split('/').any(|part| part == ".git"))
        .collect();
    assert!(leaked.is_empty(), "git metadata archived: {leaked:?}");
}

/// Assert `dir` holds no working trees (no `.git` anywhere below it)
pub fn assert_no_working_trees(dir: &Path) {
    if !dir.exists() {
        return;
    }
    let trees: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == ".git")
        .map(|e| e.path().to_path_buf())
        .collect();
    assert!(trees.is_empty(), "working trees left behind: {trees:?}");
}

/// Read the release ledger a file adapter wrote, as (state, code) per item
pub fn ledger_states(path: &Path) -> Vec<(String, Option<String>)> {
    let ledger: serde_json::Value =
        serde_json::from_slice(&std::fs::read(path).expect("failed to read ledger"))
            .expect("ledger is not JSON");
    ledger
        .as_array()
        .expect("ledger is not an array")
        .iter()
        .map(|entry| {
            (
                entry["state"].as_str().unwrap_or_default().to_string(),
                entry["exception"]["code"].as_str().map(String::from),
            )
        })
        .collect()
}
