use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use gastos_pipeline::app::{CatalogUseCase, IngestOptions, IngestUseCase};
use gastos_pipeline::config::Config;
use gastos_pipeline::infra::ReqwestPageSource;
use gastos_pipeline::observability::init_logging;
use gastos_pipeline::pipeline::processing::QualityGateConfig;
use gastos_pipeline::pipeline::storage::StorageLayout;
use gastos_pipeline::pipeline::SilverPipeline;
use gastos_pipeline::render;

#[derive(Parser)]
#[command(name = "gastos_pipeline")]
#[command(about = "Gastos diretos ingestion and bronze -> silver pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override the storage root (raw/, bronze/, silver/)
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch API pages into the raw and bronze layers, resuming from the checkpoint
    Ingest {
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// List raw page archives
    ListRaw,
    /// List bronze partitions
    ListPartitions,
    /// Delete raw page archives
    CleanRaw {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run the bronze -> silver transformation
    Silver {
        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize the silver layer
    ShowSilver {
        /// Number of sample rows to display
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(root) = &cli.data_root {
        config.storage.data_root = root.clone();
    }
    let _guard = init_logging(&config.logging);
    let layout = StorageLayout::new(config.storage.data_root.clone());
    info!(data_root = %layout.root().display(), "Configuration loaded");

    match cli.command {
        Commands::Ingest { max_pages } => {
            let api_key = config.api.api_key();
            if api_key.is_none() {
                warn!(var = %config.api.api_key_env, "API key not set, requests are unauthenticated");
            }
            let source = ReqwestPageSource::new(&config.api, api_key.as_deref())?;
            let options = IngestOptions::from_config(&config.api, max_pages);
            let use_case = IngestUseCase::new(Box::new(source), layout, options);
            let summary = use_case.run().await.map_err(|e| {
                error!(error = %e, "Ingestion failed");
                e
            })?;
            print!("{}", render::ingest_summary(&summary));
        }
        Commands::ListRaw => {
            let listing = CatalogUseCase::new(layout).list_raw_archives()?;
            print!("{}", render::raw_listing(&listing));
        }
        Commands::ListPartitions => {
            let partitions = CatalogUseCase::new(layout).list_bronze_partitions()?;
            print!("{}", render::bronze_partitions(&partitions));
        }
        Commands::CleanRaw { yes } => {
            let catalog = CatalogUseCase::new(layout);
            let count = catalog.list_raw_archives()?.archives.len();
            if count == 0 {
                println!("No raw archives to delete");
            } else if yes || confirm(&format!("Delete {count} raw archive(s)?"))? {
                let removed = catalog.clean_raw_archives()?;
                println!("🗑️  Removed {removed} raw archive(s)");
            } else {
                println!("Cancelled");
            }
        }
        Commands::Silver { json } => {
            let pipeline = SilverPipeline::new(&layout, QualityGateConfig::from(&config.quality));
            let run = pipeline.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&run.report)?);
            } else {
                print!("{}", render::silver_run(&run));
            }
        }
        Commands::ShowSilver { rows } => {
            let summary = CatalogUseCase::new(layout).summarize_silver(rows)?;
            print!("{}", render::silver_summary(&summary));
        }
    }

    Ok(())
}
