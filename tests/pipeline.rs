//! Produce → consume pipeline against local git repositories
//!
//! Repositories are created with the system `git` in a temporary directory
//! and cloned over `file://`. Every test skips when `git` is not installed.

mod common;

use common::{
    archive_entries, assert_no_git_metadata, assert_no_working_trees, create_bare_repo,
    git_available, ledger_states, missing_repo_url, write_work_items,
};
use repo_harvest::config::{ConsumerConfig, WorkItemsConfig};
use repo_harvest::consumer::Consumer;
use repo_harvest::producer::{TableProducer, produce_from_url_list};
use repo_harvest::work_items::{FileAdapter, WorkItemAdapter};
use repo_harvest::{ArchiveStrategy, Config, RepositoryRecord, table};
use serde_json::json;
use std::path::Path;

macro_rules! require_git {
    () => {
        if !git_available() {
            println!("Skipping test: git binary not found in PATH");
            return;
        }
    };
}

fn consumer_config(root: &Path, strategy: ArchiveStrategy) -> ConsumerConfig {
    ConsumerConfig {
        output_dir: root.join("output"),
        strategy,
        ..ConsumerConfig::default()
    }
}

async fn consume(input: &Path, output: &Path, config: &ConsumerConfig) {
    let mut adapter = FileAdapter::open(&WorkItemsConfig {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
    })
    .await
    .unwrap();
    Consumer::from_config(config)
        .unwrap()
        .run(&mut adapter)
        .await
        .unwrap();
    adapter.flush().await.unwrap();
}

#[tokio::test]
async fn url_list_to_aggregate_archive() {
    require_git!();
    let dir = tempfile::tempdir().unwrap();
    let remotes = dir.path().join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let good = create_bare_repo(
        &remotes,
        "good",
        &[("README.md", "# good\n"), ("src/lib.rs", "pub fn f() {}\n")],
    );
    let missing = missing_repo_url(&remotes);

    // Producer: URL list → emitted work records
    let produced = dir.path().join("stage1/work-items.json");
    let mut producer_host = FileAdapter::empty(&WorkItemsConfig {
        input_path: dir.path().join("unused.json"),
        output_path: produced.clone(),
    });
    let report = produce_from_url_list(&mut producer_host, &[good.clone(), "".into(), missing])
        .await
        .unwrap();
    producer_host.flush().await.unwrap();
    assert_eq!(report.emitted, 2);

    // Consumer: the producer's output is the consumer's input
    let config = consumer_config(dir.path(), ArchiveStrategy::Aggregate);
    let consumed = dir.path().join("stage2/work-items.json");
    consume(&produced, &consumed, &config).await;

    let entries = archive_entries(&config.archive_path());
    assert_eq!(entries.get("good/README.md").map(Vec::as_slice), Some(&b"# good\n"[..]));
    assert!(entries.contains_key("good/src/lib.rs"));
    assert!(!entries.keys().any(|n| n.starts_with("does-not-exist")));
    assert_no_git_metadata(&entries);

    let states = ledger_states(&dir.path().join("stage2/work-items.state.json"));
    assert_eq!(
        states,
        vec![
            ("DONE".to_string(), None),
            ("FAILED".to_string(), Some("GIT_ERROR".to_string())),
        ]
    );

    let ledger: serde_json::Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("stage2/work-items.state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(ledger[1]["exception"]["type"], "BUSINESS");

    assert!(!config.clone_root().exists());
    assert_no_working_trees(&config.output_dir);
}

#[tokio::test]
async fn missing_url_is_an_application_failure_without_clone() {
    require_git!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_work_items(
        &dir.path().join("in/work-items.json"),
        &[json!({"Name": "nameless", "Stars": 3}), json!("not an object")],
    );
    let config = consumer_config(dir.path(), ArchiveStrategy::Aggregate);
    let output = dir.path().join("out/work-items.json");

    consume(&input, &output, &config).await;

    let ledger: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("out/work-items.state.json")).unwrap())
            .unwrap();
    assert_eq!(ledger[0]["exception"]["type"], "APPLICATION");
    assert_eq!(ledger[0]["exception"]["code"], "MISSING_URL");
    assert_eq!(ledger[1]["exception"]["code"], "INVALID_PAYLOAD");
    assert!(!config.archive_path().exists());
    assert!(!config.clone_root().exists());
}

#[tokio::test]
async fn repeated_runs_yield_equivalent_archives() {
    require_git!();
    let dir = tempfile::tempdir().unwrap();
    let remotes = dir.path().join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let alpha = create_bare_repo(&remotes, "alpha", &[("a.txt", "alpha\n")]);
    let beta = create_bare_repo(&remotes, "beta", &[("docs/b.md", "beta\n")]);
    let input = write_work_items(
        &dir.path().join("in.json"),
        &[json!({"repo": alpha}), json!({"URL": beta, "Name": "beta"})],
    );
    let config = consumer_config(dir.path(), ArchiveStrategy::Aggregate);

    consume(&input, &dir.path().join("run1/out.json"), &config).await;
    let first = archive_entries(&config.archive_path());
    consume(&input, &dir.path().join("run2/out.json"), &config).await;
    let second = archive_entries(&config.archive_path());

    assert_eq!(first, second);
    assert_eq!(
        first.keys().cloned().collect::<Vec<_>>(),
        vec!["alpha/", "alpha/a.txt", "beta/", "beta/docs/", "beta/docs/b.md"]
    );
    assert_no_working_trees(&config.output_dir);
}

#[tokio::test]
async fn per_record_archives_with_history_are_attached() {
    require_git!();
    let dir = tempfile::tempdir().unwrap();
    let remotes = dir.path().join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let good = create_bare_repo(&remotes, "good", &[("README.md", "hello\n")]);
    let input = write_work_items(&dir.path().join("in.json"), &[json!({"repo": good})]);
    let config = ConsumerConfig {
        preserve_history: true,
        ..consumer_config(dir.path(), ArchiveStrategy::PerRecord)
    };
    let output = dir.path().join("out/work-items.json");

    consume(&input, &output, &config).await;

    let emitted: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(emitted[0]["payload"], json!({"repo": good}));
    let attached = emitted[0]["files"]["1-good.zip"].as_str().unwrap();
    assert!(attached.starts_with(dir.path().join("out").to_str().unwrap()));

    let entries = archive_entries(Path::new(attached));
    assert_eq!(entries.get("README.md").map(Vec::as_slice), Some(&b"hello\n"[..]));
    assert!(entries.contains_key(".git/HEAD"));
    assert!(!config.clone_root().exists());
}

#[tokio::test]
async fn csv_table_feeds_the_consumer() {
    require_git!();
    let dir = tempfile::tempdir().unwrap();
    let remotes = dir.path().join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let good = create_bare_repo(&remotes, "good", &[("f", "x")]);

    let csv = dir.path().join("devdata/repos.csv");
    table::write_table(
        &csv,
        &[RepositoryRecord {
            name: Some("good".into()),
            stars: Some(4),
            url: Some(good.clone()),
            is_fork: Some(false),
            ..RepositoryRecord::default()
        }],
    )
    .unwrap();

    let mut config = Config::default();
    config.github.api_host = "http://127.0.0.1:9".into();
    config.listing.csv_path = dir.path().join("unused.csv");
    config.consumer = consumer_config(dir.path(), ArchiveStrategy::Aggregate);
    config.work_items = WorkItemsConfig {
        input_path: write_work_items(&dir.path().join("in.json"), &[json!({"table": csv})]),
        output_path: dir.path().join("produced.json"),
    };

    let mut host = FileAdapter::open(&config.work_items).await.unwrap();
    let report = TableProducer::new(&config)
        .unwrap()
        .run(&mut host)
        .await
        .unwrap();
    host.flush().await.unwrap();
    assert_eq!(report.emitted, 1);

    consume(
        &config.work_items.output_path,
        &dir.path().join("consumed.json"),
        &config.consumer,
    )
    .await;

    let entries = archive_entries(&config.consumer.archive_path());
    assert!(entries.contains_key("good/f"));
    assert_eq!(
        ledger_states(&dir.path().join("consumed.state.json")),
        vec![("DONE".to_string(), None)]
    );
}
