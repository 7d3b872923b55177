//! repo-harvest CLI - list, split, produce and consume repository work items.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use repo_harvest::consumer::Consumer;
use repo_harvest::github::RepositoryLister;
use repo_harvest::producer::{TableProducer, load_urls, produce_from_url_list};
use repo_harvest::work_items::{FileAdapter, WorkItemAdapter};
use repo_harvest::{ArchiveStrategy, Config, EntityKind, Result, batch, run_until_signal, table};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repo-harvest")]
#[command(version)]
#[command(about = "List, clone and archive the public repositories of a GitHub account")]
#[command(after_long_help = r#"EXAMPLES
    List an organization's public repositories and write the CSV table:
        $ repo-harvest list robocorp org --write-csv

    Split a URL list into batches of 50 for parallel runs:
        $ repo-harvest split urls.txt 50

    Turn the local input work items into repository records:
        $ repo-harvest produce

    Clone and archive one batch:
        $ repo-harvest produce --mode url-list --urls batches/batch0.json --output items-0.json
        $ repo-harvest consume --input items-0.json --archive-name repos-0.zip

ENVIRONMENT VARIABLES
    RUST_LOG    Log filter (default: repo_harvest=info)
"#)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Input work-items file (overrides config)
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output work-items file (overrides config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the public repositories of an organization or user
    List {
        /// Organization or user name (default from config)
        entity: Option<String>,
        /// Account kind; probed when omitted
        kind: Option<EntityKind>,
        /// Write the table to the configured CSV path
        #[arg(long)]
        write_csv: bool,
        /// Keep forked repositories
        #[arg(long)]
        include_forks: bool,
    },
    /// Split a newline-separated URL file into batches
    Split {
        /// File with one repository URL per line
        urls_file: PathBuf,
        /// Maximum URLs per batch
        batch_size: usize,
        /// Directory receiving batches/ and matrix.json
        #[arg(long)]
        output_root: Option<PathBuf>,
    },
    /// Produce repository work records
    Produce {
        /// Where records come from
        #[arg(long, value_enum, default_value_t = ProduceMode::Table)]
        mode: ProduceMode,
        /// URL list or batch file for url-list mode
        #[arg(long, required_if_eq("mode", "url-list"))]
        urls: Option<PathBuf>,
    },
    /// Clone and archive the repositories named by input work items
    Consume {
        /// Packaging strategy (default from config)
        #[arg(long)]
        strategy: Option<ArchiveStrategy>,
        /// File name of the aggregate archive
        #[arg(long)]
        archive_name: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProduceMode {
    /// One record per table row, from input work items
    Table,
    /// One record per URL, from a list or batch file
    UrlList,
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("repo_harvest=debug")
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("repo_harvest=info"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

async fn list(
    config: &Config,
    entity: Option<String>,
    kind: Option<EntityKind>,
    write_csv: bool,
) -> Result<()> {
    let entity = entity.unwrap_or_else(|| config.listing.default_entity.clone());
    let lister = RepositoryLister::new(config)?;
    let listing = lister.list(&entity, kind).await;

    for record in &listing.records {
        println!(
            "{:>7}  {:<40}  {}",
            record.stars_or_zero(),
            record.name.as_deref().unwrap_or("-"),
            record.url.as_deref().unwrap_or("-")
        );
    }
    println!(
        "{} ({}): {} public repositories from {} page(s)",
        listing.entity,
        listing.kind,
        listing.records.len(),
        listing.pages_fetched
    );
    if !listing.is_complete() {
        println!("listing is partial: {:?}", listing.termination);
    }

    if write_csv {
        table::write_table(&config.listing.csv_path, &listing.records)?;
        println!("table written to {}", config.listing.csv_path.display());
    }
    Ok(())
}

async fn produce(config: &Config, mode: ProduceMode, urls: Option<PathBuf>) -> Result<()> {
    let report = match mode {
        ProduceMode::Table => {
            let mut adapter = FileAdapter::open(&config.work_items).await?;
            let report = TableProducer::new(config)?.run(&mut adapter).await?;
            adapter.flush().await?;
            report
        }
        ProduceMode::UrlList => {
            let path = urls.ok_or_else(|| repo_harvest::Error::Config {
                message: "--urls is required in url-list mode".into(),
                key: None,
            })?;
            let urls = load_urls(&path).await?;
            let mut adapter = FileAdapter::empty(&config.work_items);
            let report = produce_from_url_list(&mut adapter, &urls).await?;
            adapter.flush().await?;
            report
        }
    };

    println!(
        "inputs done: {}, inputs failed: {}, records emitted: {}",
        report.inputs_done, report.inputs_failed, report.emitted
    );
    Ok(())
}

async fn consume(config: &Config) -> Result<()> {
    let consumer = Consumer::from_config(&config.consumer)?;
    let mut adapter = FileAdapter::open(&config.work_items).await?;
    let outcome = consumer.run(&mut adapter).await;
    adapter.flush().await?;
    let report = outcome?;

    println!("done: {}, failed: {}", report.done, report.failed);
    for archive in &report.archives {
        println!("archive: {}", archive.display());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(input) = cli.input {
        config.work_items.input_path = input;
    }
    if let Some(output) = cli.output {
        config.work_items.output_path = output;
    }

    match cli.command {
        Commands::List {
            entity,
            kind,
            write_csv,
            include_forks,
        } => {
            config.listing.include_forks |= include_forks;
            config.validate()?;
            list(&config, entity, kind, write_csv).await
        }
        Commands::Split {
            urls_file,
            batch_size,
            output_root,
        } => {
            config.batch.batch_size = batch_size;
            if let Some(root) = output_root {
                config.batch.output_root = root;
            }
            config.validate()?;
            let matrix = batch::split_url_file(&urls_file, &config.batch).await?;
            println!(
                "{} batch(es) written to {}",
                matrix.include.len(),
                config.batch.batches_dir().display()
            );
            Ok(())
        }
        Commands::Produce { mode, urls } => {
            config.validate()?;
            produce(&config, mode, urls).await
        }
        Commands::Consume {
            strategy,
            archive_name,
        } => {
            if let Some(strategy) = strategy {
                config.consumer.strategy = strategy;
            }
            if let Some(name) = archive_name {
                config.consumer.archive_name = name;
            }
            config.validate()?;
            consume(&config).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_until_signal(run(cli)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "repo-harvest failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
