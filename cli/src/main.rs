mod commands;
mod config;
mod recipes;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_search, cmd_show};
use crate::config::Config;
use crate::recipes::RecipeClient;
use eiyo_core::dataset::{DEFAULT_ENCODING, Dataset};
use eiyo_core::service::NutritionService;
use eiyo_core::session::MemoryCartStore;

#[derive(Parser)]
#[command(
    name = "eiyo",
    version,
    about = "Look up Japanese food nutrients and total up a meal"
)]
struct Cli {
    /// Path to the food composition table (default: $EIYO_DATA, then the data directory)
    #[arg(long, global = true, value_name = "PATH")]
    data: Option<PathBuf>,
    /// Text encoding of the table (shift_jis, cp932, utf-8, ...)
    #[arg(long, global = true, default_value = DEFAULT_ENCODING)]
    encoding: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web app
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Search foods by name
    Search {
        /// Search query (space separated words must all match)
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the nutrients of one food
    Show {
        /// Food ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data, &cli.encoding)?;
    let dataset = Dataset::load(&config.data_path, config.encoding)?;

    match cli.command {
        Commands::Search { query, json } => cmd_search(&dataset, &query, json),
        Commands::Show { id, json } => cmd_show(&dataset, &id, json),
        Commands::Serve { port, bind } => {
            let service =
                NutritionService::new(Arc::new(dataset), Arc::new(MemoryCartStore::new()));
            let recipes = RecipeClient::new(config.recipe_app_id)?;
            server::start_server(service, recipes, port, &bind).await
        }
    }
}
