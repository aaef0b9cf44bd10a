//! Config subcommand implementations
//!
//! Provides `bootgate config` subcommands for viewing and checking the
//! resolved configuration.

mod show;
mod validate;

use anyhow::Result;
use bootgate_core::load_config;
use clap::{Args, Subcommand};
use std::path::Path;

pub use show::cmd_config_show;
pub use validate::cmd_config_validate;

/// Configuration command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output as JSON instead of table format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
    /// Show the resolved configuration (file + environment)
    Show {
        /// Output as JSON instead of table format
        #[arg(long)]
        json: bool,
    },
    /// Validate the resolved configuration
    Validate,
}

/// Handle config command
///
/// Routes to the appropriate handler based on the subcommand.
/// If no subcommand is given, defaults to Show.
pub fn cmd_config(args: &ConfigArgs, config_path: Option<&Path>, quiet: bool) -> Result<i32> {
    match &args.command {
        Some(ConfigSubcommands::Validate) => cmd_config_validate(config_path, quiet),
        Some(ConfigSubcommands::Show { json }) => {
            let config = load_config(config_path)?;
            cmd_config_show(&config, *json || args.json)
        }
        None => {
            let config = load_config(config_path)?;
            cmd_config_show(&config, args.json)
        }
    }
}
