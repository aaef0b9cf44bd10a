//! `bootgate run`: the full startup pipeline

use super::{ConfigOverrides, load_validated};
use anyhow::Result;
use bootgate_core::Supervisor;
use clap::Args;
use console::style;
use std::path::Path;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Worker command replacing the configured one (after `--`)
    #[arg(last = true, value_name = "WORKER")]
    pub worker: Vec<String>,
}

/// Run the pipeline; on success with exec this never returns
pub fn cmd_run(args: &RunArgs, config_path: Option<&Path>, quiet: bool) -> Result<i32> {
    let config = load_validated(config_path, &args.overrides, quiet)?;
    let supervisor = Supervisor::new(config).with_worker_argv(args.worker.clone());

    if !quiet {
        let backend = &supervisor.config().backend;
        eprintln!(
            "{} {} on {}:{}, then {}",
            style("bootgate").cyan().bold(),
            style(&backend.program).bold(),
            backend.host,
            backend.port,
            style(supervisor.worker_command().display()).green()
        );
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let code = rt.block_on(supervisor.run())?;
    Ok(code)
}
