mod geo;
mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::geo::GeoCommands;

#[derive(Debug, Parser)]
#[command(name = "tuyendung-cli")]
#[command(about = "Resolve job posting locations against Vietnamese administrative units")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the location of one job or an array of jobs read from a JSON file
    Resolve {
        /// JSON file holding a job object or an array of job objects
        path: PathBuf,
        /// Skip fetching reference data; names come from the job records only
        #[arg(long)]
        offline: bool,
        /// Print the full resolution results as JSON instead of labels
        #[arg(long)]
        json: bool,
        /// Text printed for jobs without a location label
        #[arg(long, default_value = resolve::DEFAULT_FALLBACK)]
        fallback: String,
    },
    /// Inspect the province/ward reference data
    Geo {
        #[command(subcommand)]
        command: GeoCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tuyendung_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Resolve {
            path,
            offline,
            json,
            fallback,
        }) => {
            let options = resolve::ResolveOptions {
                offline,
                json,
                fallback,
            };
            resolve::run_resolve(&config, &path, &options).await?;
        }
        Some(Commands::Geo { command }) => match command {
            GeoCommands::Provinces => geo::run_geo_provinces(&config).await?,
            GeoCommands::Wards { province } => {
                geo::run_geo_wards(&config, province.as_deref()).await?;
            }
        },
        None => println!("tuyendung-cli ready; run with --help for commands"),
    }

    Ok(())
}
