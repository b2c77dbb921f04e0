use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use hearth_core::config::{load_catalog, DatasetConfig};
use hearth_core::pipeline::{RunSummary, Stage};
use hearth_core::{catalog, db, pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Housing market warehouse ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline for every dataset in the catalog
    Run(RunArgs),
    /// List the datasets in the catalog
    List,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory containing the raw dataset files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// TOML catalog overriding the built-in dataset definitions
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only run the named dataset
    #[arg(long)]
    only: Option<String>,

    /// Stop after validation without touching the warehouse
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::List => {
            for cfg in catalog::builtin() {
                println!("{:<28} -> {}", cfg.name, cfg.destination);
            }
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let datasets = select_datasets(&args)?;

    // The pool is a scoped resource: acquired once before the first dataset,
    // closed after the last regardless of per-dataset outcomes.
    let pool = if args.dry_run {
        None
    } else {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set (see .env)")?;
        Some(db::connect(&database_url).await?)
    };

    let summary = pipeline::run(pool.as_ref(), &datasets, args.dry_run).await;

    if let Some(pool) = pool {
        pool.close().await;
        info!("warehouse connection pool closed");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.failed() > 0 {
        return Err(anyhow!(
            "{} of {} datasets failed",
            summary.failed(),
            summary.reports.len()
        ));
    }
    Ok(())
}

fn select_datasets(args: &RunArgs) -> Result<Vec<DatasetConfig>> {
    let catalog: Vec<DatasetConfig> = match &args.config {
        Some(path) => load_catalog(path)?,
        None => catalog::builtin().to_vec(),
    };

    let selected: Vec<DatasetConfig> = match &args.only {
        Some(name) => {
            let cfg = catalog
                .iter()
                .find(|cfg| &cfg.name == name)
                .ok_or_else(|| anyhow!("no dataset named '{name}' in the catalog"))?;
            vec![cfg.clone()]
        }
        None => catalog,
    };

    Ok(selected
        .iter()
        .map(|cfg| cfg.with_data_dir(&args.data_dir))
        .collect())
}

fn print_summary(summary: &RunSummary) {
    println!("\n--- Run Summary ---");
    for report in &summary.reports {
        match report.stage {
            Stage::Done => match report.rows_loaded {
                Some(rows) => println!("  ✅ {}: {} rows loaded", report.dataset, rows),
                None => println!("  ✅ {}: validated (dry run)", report.dataset),
            },
            _ => {
                let stage = report.failed_at.map(|s| s.as_str()).unwrap_or("unknown");
                let cause = report.error.as_deref().unwrap_or("unknown error");
                println!("  ❌ {}: failed during {}: {}", report.dataset, stage, cause);
            }
        }
    }
    println!(
        "  {} completed, {} failed",
        summary.completed(),
        summary.failed()
    );
}
