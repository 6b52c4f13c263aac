//! RasterLayer CLI - headless driver for the viewport tile loader.
//!
//! Runs the same load, plan and fetch pipeline an interactive map would,
//! against a headless map surface, and writes the resulting tiles to disk.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::render::RenderArgs;
use error::CliError;
use runner::{CliRunner, GlobalOptions};

/// Default time allowed for all tiles of a render to arrive.
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;

#[derive(Parser)]
#[command(name = "rasterlayer")]
#[command(about = "Viewport-driven GeoTIFF tile loader", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.rasterlayer/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raster backend base URL, overriding the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show raster metadata reported by the backend
    Info {
        /// Raster path as understood by the backend
        path: String,
    },

    /// Load a raster, fetch the visible tiles and save them as PNG files
    Render {
        /// Raster path as understood by the backend
        path: String,

        /// View as south,west,north,east (default: fit to the raster)
        #[arg(long, allow_hyphen_values = true)]
        bounds: Option<String>,

        /// Zoom level for the view (default: the fitted zoom)
        #[arg(long)]
        zoom: Option<u8>,

        /// Directory the tiles are written to
        #[arg(short, long, default_value = "tiles")]
        output: PathBuf,

        /// Seconds to wait for outstanding tiles
        #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = GlobalOptions {
        config: cli.config,
        backend: cli.backend,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Info { path } => {
            let runner = CliRunner::new(&options)?;
            commands::info::run(&runner, &path)
        }
        Commands::Render {
            path,
            bounds,
            zoom,
            output,
            timeout,
        } => {
            let runner = CliRunner::new(&options)?;
            commands::render::run(
                &runner,
                RenderArgs {
                    path,
                    bounds,
                    zoom,
                    output,
                    timeout_secs: timeout,
                },
            )
        }
        Commands::Config { command } => commands::config::run(&options, command),
    }
}
