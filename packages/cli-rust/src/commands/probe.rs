//! `bootgate probe`: a single readiness check

use super::{ConfigOverrides, load_validated};
use crate::output::probe_style;
use anyhow::Result;
use bootgate_core::health::status_url;
use bootgate_core::{HttpReadinessProbe, ReadinessProbe};
use clap::Args;
use std::path::Path;

/// Arguments for the probe command
#[derive(Args, Debug, Default)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Probe the backend once; returns 0 when it is ready, 1 otherwise
pub fn cmd_probe(args: &ProbeArgs, config_path: Option<&Path>, quiet: bool) -> Result<i32> {
    let config = load_validated(config_path, &args.overrides, quiet)?;
    let probe = HttpReadinessProbe::for_backend(&config.backend, &config.readiness)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = rt.block_on(probe.probe());

    if !quiet {
        println!("{}: {}", status_url(&config.backend), probe_style(outcome));
    }
    Ok(if outcome.is_ready() { 0 } else { 1 })
}
