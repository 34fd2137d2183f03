use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use registrar::cli::{import, stats};
use registrar::config::Config;
use registrar::store::CatalogStore;

#[derive(Parser)]
#[command(name = "registrar")]
#[command(about = "Course catalog importer - normalizes JSON course data into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "registrar.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Import course JSON files (defaults to every .json in the data directory)
    Import {
        /// Files or directories to import
        paths: Vec<PathBuf>,

        /// Delete the database first and import from scratch
        #[arg(long)]
        fresh: bool,
    },

    /// Show row counts for every table
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).unwrap_or_default();

    match cli.command {
        Commands::Import { paths, fresh } => {
            let db_path = config.database_path();
            if fresh && db_path.exists() {
                std::fs::remove_file(&db_path)?;
            }

            let mut store = CatalogStore::open(&db_path)?;
            import::run(&mut store, &config, paths)?;
        }
        Commands::Stats => {
            let store = CatalogStore::open(&config.database_path())?;
            stats::run(&store)?;
        }
    }

    Ok(())
}
