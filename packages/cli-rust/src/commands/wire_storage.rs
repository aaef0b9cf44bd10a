//! `bootgate wire-storage`: storage wiring without starting anything

use super::{ConfigOverrides, load_validated};
use crate::output::action_style;
use anyhow::Result;
use bootgate_core::StorageReport;
use bootgate_core::exit_code;
use bootgate_core::orchestrator::wire_configured_storage;
use clap::Args;
use console::style;
use std::path::Path;

/// Arguments for the wire-storage command
#[derive(Args, Debug, Default)]
pub struct WireStorageArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Wire the configured mappings and print the report
///
/// Exits non-zero only when storage is required and wiring was incomplete.
pub fn cmd_wire_storage(
    args: &WireStorageArgs,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<i32> {
    let config = load_validated(config_path, &args.overrides, quiet)?;
    let report = wire_configured_storage(&config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_report(&report);
    }

    if config.storage.required && !report.is_complete() {
        return Ok(exit_code::STORAGE_WIRE_FAILED);
    }
    Ok(0)
}

fn print_report(report: &StorageReport) {
    let Some(root) = &report.root else {
        println!(
            "{} {}",
            style("Storage wiring skipped:").yellow(),
            report.skipped_reason.as_deref().unwrap_or("no storage root")
        );
        return;
    };

    println!("{} {}", style("Storage root:").bold(), root.display());
    for wired in &report.wired {
        println!(
            "  {:<14} {} -> {}",
            action_style(&wired.action),
            wired.source.display(),
            wired.target.display()
        );
    }
    for warning in &report.warnings {
        println!("  {} {}", style("warning").yellow().bold(), warning);
    }
}
