mod config;
mod discover;
mod scan_cmd;
mod search_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use config::Overrides;

#[derive(Parser)]
#[command(name = "ocrgrep")]
#[command(about = "Index the text in documentation images and search it with boolean word queries")]
#[command(version)]
struct Cli {
    /// YAML config file (default: ./ocrgrep.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directives, e.g. `debug` or `info,ocrgrep_worker=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize every image under the base directory and write the index
    Scan {
        /// Directory containing the documentation roots
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Where to write the index
        #[arg(long)]
        index: Option<PathBuf>,
        /// Query to run once the index is built
        #[arg(long, conflicts_with = "demo_query")]
        query: Option<String>,
        /// Run the sample query `water|(salt&dough)` once the index is built
        #[arg(long)]
        demo_query: bool,
        /// Where to write the query matches
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Search a saved index
    Search {
        /// Boolean query, e.g. `water | (salt & dough)`
        query: String,
        /// Index to search
        #[arg(long)]
        index: Option<PathBuf>,
        /// Also write the matches to this JSON file
        #[arg(long)]
        results: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = Overrides {
        log_level: cli.log_level,
        ..Default::default()
    };
    match &cli.command {
        Commands::Scan {
            base_dir,
            index,
            results,
            ..
        } => {
            overrides.base_dir = base_dir.clone();
            overrides.index_file = index.clone();
            overrides.results_file = results.clone();
        }
        Commands::Search { index, .. } => {
            overrides.index_file = index.clone();
        }
    }

    let config = ocrgrep_config::load_and_prepare(cli.config.as_deref()).await?;
    let config = overrides.apply(config);

    ocrgrep_logging::init_logger(config.log.dir.as_deref(), &config.log.level);
    ocrgrep_config::check(&config)?;

    match cli.command {
        Commands::Scan {
            query, demo_query, ..
        } => {
            let query = query.or_else(|| demo_query.then(|| scan_cmd::DEMO_QUERY.to_string()));
            scan_cmd::run(&config, query.as_deref()).await?;
        }
        Commands::Search { query, results, .. } => {
            search_cmd::run(&config.output.index_file, &query, results.as_deref()).await?;
        }
    }

    info!("Done");
    Ok(())
}
