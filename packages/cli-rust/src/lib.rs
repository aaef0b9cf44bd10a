//! bootgate CLI - Start a backend, wait until it is healthy, hand off to the worker
//!
//! This module contains the shared CLI implementation used by all binaries.

mod commands;
mod output;

use anyhow::Result;
use bootgate_core::{ConfigError, SupervisorError, exit_code};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Start a backend server, wait for it to become healthy, then hand off to the worker
#[derive(Parser)]
#[command(name = "bootgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Start a backend, gate on its health, hand off to the worker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (default: $BOOTGATE_CONFIG or /etc/bootgate/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Wire storage, start the backend, wait until ready, then exec the worker
    Run(commands::RunArgs),
    /// Wire persistent storage only and print what was done
    WireStorage(commands::WireStorageArgs),
    /// Probe the backend once; exits 0 when it is ready
    Probe(commands::ProbeArgs),
    /// Inspect configuration
    Config(commands::ConfigArgs),
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Tracing filter for the requested verbosity; `RUST_LOG` wins when set
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = log_level(verbose, quiet);
        EnvFilter::new(format!("bootgate={level},bootgate_core={level}"))
    })
}

/// Exit code for an error that escaped a command
fn error_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<SupervisorError>() {
        return e.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit_code::CONFIG_INVALID;
    }
    1
}

/// Map a status to a process exit byte
///
/// Codes outside 0..=255 (possible for worker exit codes on Windows) become
/// 255 so a failure is never reported as success.
fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(u8::MAX)
}

fn dispatch(cli: &Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Run(args) => commands::cmd_run(args, config_path, cli.quiet),
        Commands::WireStorage(args) => commands::cmd_wire_storage(args, config_path, cli.quiet),
        Commands::Probe(args) => commands::cmd_probe(args, config_path, cli.quiet),
        Commands::Config(args) => commands::cmd_config(args, config_path, cli.quiet),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Configure color output
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            output::show_error(&err);
            error_exit_code(&err)
        }
    };

    if cli.verbose > 0 && code != 0 {
        eprintln!(
            "{} exiting with code {}",
            style("[info]").cyan(),
            style(code).bold()
        );
    }
    ExitCode::from(process_exit_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootgate_core::LaunchError;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_trailing_worker_command() {
        let cli = Cli::try_parse_from([
            "bootgate",
            "-v",
            "run",
            "--backend-port",
            "3000",
            "--max-wait",
            "2m",
            "--",
            "python3",
            "-u",
            "handler.py",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.worker, vec!["python3", "-u", "handler.py"]);
                assert_eq!(args.overrides.backend_port, Some(3000));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["bootgate", "probe", "--config", "/tmp/c.json", "-q"])
            .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn error_exit_codes_follow_failure_kind() {
        let crashed = anyhow::Error::new(SupervisorError::BackendCrashed {
            exit_code: Some(1),
            attempts: 3,
            diagnostics: Vec::new(),
        });
        assert_eq!(error_exit_code(&crashed), exit_code::BACKEND_CRASHED);

        let launch = anyhow::Error::new(SupervisorError::Launch(LaunchError::NotFound {
            program: "python3".to_string(),
        }));
        assert_eq!(error_exit_code(&launch), exit_code::LAUNCH_FAILED);

        let config = anyhow::Error::new(ConfigError::NotFound(PathBuf::from("/x.json")));
        assert_eq!(error_exit_code(&config), exit_code::CONFIG_INVALID);

        let other = anyhow::anyhow!("something else");
        assert_eq!(error_exit_code(&other), 1);
    }

    #[test]
    fn exit_codes_pass_through_or_saturate() {
        assert_eq!(process_exit_code(0), 0);
        assert_eq!(process_exit_code(7), 7);
        assert_eq!(process_exit_code(143), 143);
        assert_eq!(process_exit_code(255), 255);
        assert_eq!(process_exit_code(256), 255);
        assert_eq!(process_exit_code(-1073741819), 255);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(3, true), "error");
        assert_eq!(log_level(0, false), "info");
        assert_eq!(log_level(1, false), "debug");
        assert_eq!(log_level(2, false), "trace");
    }
}
