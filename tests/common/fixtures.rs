//! Local git repositories and work-item files for pipeline tests

use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether a `git` binary is on PATH
///
/// Tests that need git print a skip message and return early when it is not.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=Fixture",
            "-c",
            "user.email=fixture@example.com",
            "-c",
            "init.defaultBranch=main",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// Create a bare repository `<dir>/<name>.git` with one commit holding `files`
///
/// Returns a `file://` URL so clones go through the regular transport and
/// honor `--depth`.
pub fn create_bare_repo(dir: &Path, name: &str, files: &[(&str, &str)]) -> String {
    let work = dir.join(format!("{name}-work"));
    std::fs::create_dir_all(&work).expect("failed to create work tree");
    git(&work, &["init", "--quiet"]);

    for (path, content) in files {
        let path = work.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(path, content).expect("failed to write fixture file");
    }
    git(&work, &["add", "--all"]);
    git(&work, &["commit", "--quiet", "-m", "initial"]);

    let bare = dir.join(format!("{name}.git"));
    git(
        dir,
        &[
            "clone",
            "--quiet",
            "--bare",
            work.to_str().expect("non-UTF-8 temp path"),
            bare.to_str().expect("non-UTF-8 temp path"),
        ],
    );
    std::fs::remove_dir_all(&work).expect("failed to remove work tree");

    file_url(&bare)
}

/// `file://` URL for a local path
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// URL of a repository that does not exist
pub fn missing_repo_url(dir: &Path) -> String {
    file_url(&dir.join("does-not-exist.git"))
}

/// Write a file-adapter input file holding one item per payload
pub fn write_work_items(path: &Path, payloads: &[serde_json::Value]) -> PathBuf {
    let items: Vec<serde_json::Value> = payloads
        .iter()
        .map(|p| serde_json::json!({"payload": p}))
        .collect();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create input dir");
    }
    std::fs::write(path, serde_json::to_vec_pretty(&items).expect("serialize"))
        .expect("failed to write work items");
    path.to_path_buf()
}
