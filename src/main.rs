//! seriesvault CLI
//!
//! Inspect series storage files:
//! - Count and list entries
//! - Dump one entry's attributes and references
//! - Compare two storage files
//! - Generate a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use seriesvault::config::{generate_default_config, Config};
use seriesvault::storage::{compare_storages, IndexRange, SeriesStorage};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "seriesvault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect deduplicated time-series storage files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of stored series
    Count {
        /// Storage file
        file: PathBuf,
    },

    /// List every (series, owner reference) pair
    List {
        /// Storage file
        file: PathBuf,
    },

    /// Print one series' attributes and references as JSON
    Dump {
        /// Storage file
        file: PathBuf,
        /// Content UUID of the series
        id: Uuid,
    },

    /// Compare two storage files; exits with status 1 when they differ
    Compare { a: PathBuf, b: PathBuf },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config);

    match cli.command {
        Commands::Count { file } => {
            let storage = open(&file)?;
            println!("{}", storage.count()?);
        }

        Commands::List { file } => {
            let storage = open(&file)?;
            for entry in storage.entries() {
                let entry = entry?;
                let attr = |name: &str| {
                    entry
                        .attributes
                        .get(name)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".to_string())
                };
                println!(
                    "{}  {}  {}  {}  {:?}",
                    entry.content_id,
                    entry.owner_ref,
                    attr("logical_type"),
                    attr("data_kind"),
                    entry.data.shape()
                );
            }
        }

        Commands::Dump { file, id } => {
            let storage = open(&file)?;
            let attributes = storage.entry_metadata(id, IndexRange::single(1)?)?;
            let references = storage.references(id)?;
            let dump = serde_json::json!({
                "content_id": id,
                "attributes": attributes,
                "references": references,
            });
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }

        Commands::Compare { a, b } => {
            let (a, b) = (open(&a)?, open(&b)?);
            if compare_storages(&a, &b)? {
                println!("identical");
            } else {
                println!("different");
                std::process::exit(1);
            }
        }

        Commands::InitConfig { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn open(path: &Path) -> anyhow::Result<SeriesStorage> {
    SeriesStorage::open_existing(path, true, None)
        .with_context(|| format!("failed to open storage {:?}", path))
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let json = config.logging.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}
