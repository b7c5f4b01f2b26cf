//! Storeload - clothing store ETL

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storeload::config::EtlConfig;
use storeload::coordinator::{RunContext, RunCoordinator, RunReport};
use storeload::document::{MemoryDocumentStore, MongoSink};
use storeload::relational::{MemoryRelationalStore, MySqlConnector};
use storeload_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "storeload")]
#[command(author, version, about = "Load the store's CSV exports into MySQL and MongoDB")]
struct Cli {
    /// Directory holding the input CSV files
    #[arg(short, long, env = "ETL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Run against in-memory stores instead of MySQL and MongoDB
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Also loads `.env`, so it must run before the logging variables are read
    let mut config = EtlConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("storeload")
        .filter_directives("sqlx=warn,mongodb=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    if config.relational.password.is_none() {
        warn!("MYSQL_ROOT_PASSWORD is not set, connecting without a password");
    }

    println!(
        "storeload {}{}",
        env!("CARGO_PKG_VERSION"),
        if cli.dry_run { " (dry run)" } else { "" }
    );

    let ctx = RunContext::now();
    if cli.dry_run {
        run_dry(&config, &ctx).await;
    } else {
        run_live(&config, &ctx).await;
    }

    Ok(())
}

async fn run_live(config: &EtlConfig, ctx: &RunContext) {
    info!(
        mysql = %config.relational.host,
        mongo = %config.document.uri,
        "Running against live stores"
    );

    let documents = match MongoSink::connect(&config.document).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "Invalid MongoDB client configuration");
            let report = RunReport::DocumentStoreUnreachable {
                reason: e.to_string(),
            };
            println!("{}", report);
            return;
        },
    };
    let connector = MySqlConnector::new(config.relational.clone());

    let report = RunCoordinator::new(config, &documents, &connector)
        .run(ctx)
        .await;
    println!("{}", report);
}

async fn run_dry(config: &EtlConfig, ctx: &RunContext) {
    let documents = MemoryDocumentStore::new();
    let relational = MemoryRelationalStore::new();
    let connector = relational.connector();

    let report = RunCoordinator::new(config, &documents, &connector)
        .run(ctx)
        .await;
    println!("{}", report);

    let snapshot = relational.snapshot();
    println!(
        "In-memory relational store: {} customers, {} products, {} sales, {} ratings",
        snapshot.customers.len(),
        snapshot.products.len(),
        snapshot.sales.len(),
        snapshot.ratings.len()
    );
    for (collection, count) in documents.counts() {
        println!("In-memory collection {}: {} documents", collection, count);
    }
}
