//! Config validate subcommand

use anyhow::Result;
use bootgate_core::config::validate_config;
use bootgate_core::config::validation::{display_validation_error, display_validation_warning};
use bootgate_core::{exit_code, load_config};
use console::style;
use std::path::Path;

/// Validate the resolved configuration
///
/// Returns the config-invalid exit code for fatal errors; warnings alone
/// still succeed.
pub fn cmd_config_validate(config_path: Option<&Path>, quiet: bool) -> Result<i32> {
    let config = load_config(config_path)?;

    match validate_config(&config) {
        Ok(warnings) => {
            for warning in &warnings {
                display_validation_warning(warning);
            }
            if !quiet {
                let suffix = match warnings.len() {
                    0 => String::new(),
                    1 => " (1 warning)".to_string(),
                    n => format!(" ({n} warnings)"),
                };
                println!("{}{}", style("Configuration is valid").green(), suffix);
            }
            Ok(0)
        }
        Err(error) => {
            display_validation_error(&error);
            Ok(exit_code::CONFIG_INVALID)
        }
    }
}
