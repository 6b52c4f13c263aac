//! Config command - inspect and create the configuration file.

use clap::Subcommand;
use rasterlayer::config::ConfigFile;

use crate::error::CliError;
use crate::runner::GlobalOptions;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(options: &GlobalOptions, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", options.config_path()?.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = options.load_config()?;
            config.to_ini().write_to(&mut std::io::stdout())?;
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = options.config_path()?;
            if path.exists() && !force {
                println!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
                return Ok(());
            }
            ConfigFile::default().save_to(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
