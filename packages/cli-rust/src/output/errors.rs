//! Centralized error formatting
//!
//! This module provides consistent, actionable error messages for startup
//! failures across all CLI commands.

use super::colors::log_level_style;
use bootgate_core::config::validation::display_validation_error;
use bootgate_core::{ConfigError, HandoffError, LaunchError, SupervisorError};
use console::style;

/// Format supervisor errors with actionable guidance
///
/// Returns a styled, multi-line message. Crash and timeout messages end with
/// the captured tail of the backend log.
pub fn format_supervisor_error(e: &SupervisorError) -> String {
    match e {
        SupervisorError::Launch(LaunchError::NotFound { program }) => format!(
            "{}\n\n  {}\n  {}",
            style("Backend executable not found").red().bold(),
            format_args!("'{program}' is not on PATH or does not exist."),
            style("  Try: --backend-program <path> or BOOTGATE_BACKEND_PROGRAM").cyan()
        ),
        SupervisorError::Launch(LaunchError::WorkingDir { path, error }) => format!(
            "{}\n\n  {}: {}\n  {}",
            style("Backend working directory is unusable").red().bold(),
            path.display(),
            error,
            style("  Try: --working-dir <dir> or BOOTGATE_WORKING_DIR").cyan()
        ),
        SupervisorError::BackendCrashed { .. } => format!(
            "{}\n\n  {}{}",
            style(e.to_string()).red().bold(),
            "The backend exited before it became ready. Its last output:",
            format_diagnostics(e.diagnostics())
        ),
        SupervisorError::TimedOut { .. } => format!(
            "{}\n\n  {}\n  {}{}",
            style(e.to_string()).red().bold(),
            "The backend is still running but never answered its status endpoint.",
            style("  Try: --max-attempts <n> or --max-wait <duration>").cyan(),
            format_diagnostics(e.diagnostics())
        ),
        SupervisorError::StorageWireFailed { reason } => format!(
            "{}\n\n  {}\n  {}",
            style("Persistent storage could not be wired").red().bold(),
            reason,
            style("  Try: --storage-root <dir>, or set storage.required to false").cyan()
        ),
        SupervisorError::Handoff(HandoffError::NotFound { program }) => format!(
            "{}\n\n  {}\n  {}",
            style("Worker executable not found").red().bold(),
            format_args!("'{program}' is not on PATH or does not exist."),
            style("  Try: bootgate run -- <worker command>").cyan()
        ),
        SupervisorError::Config(config_error) => format_config_error(config_error),
        _ => style(e.to_string()).red().bold().to_string(),
    }
}

/// Format configuration loading errors
pub fn format_config_error(e: &ConfigError) -> String {
    let tip = match e {
        ConfigError::NotFound(_) => "Pass --config <path> or unset BOOTGATE_CONFIG.",
        ConfigError::Parse { .. } => "Check the config file for syntax errors or unknown fields.",
        ConfigError::Env { .. } => "Fix or unset the environment variable.",
        ConfigError::Read { .. } | ConfigError::Invalid(_) => "",
    };

    let mut msg = format!(
        "{}\n\n  {}",
        style("Configuration error").red().bold(),
        e
    );
    if !tip.is_empty() {
        msg.push_str(&format!("\n\n  {} {}", style("Tip:").cyan(), tip));
    }
    msg
}

fn format_diagnostics(lines: &[String]) -> String {
    if lines.is_empty() {
        return format!("\n\n    {}", style("(no backend output captured)").dim());
    }

    let mut out = String::from("\n");
    for line in lines {
        out.push_str(&format!("\n    {}", log_level_style(line)));
    }
    out
}

/// Show an error that escaped a command in a rich format to stderr
///
/// Prints a blank line before the error message for visual separation.
pub fn show_error(err: &anyhow::Error) {
    if let Some(ConfigError::Invalid(validation)) = config_error(err) {
        display_validation_error(validation);
        return;
    }

    let msg = if let Some(e) = err.downcast_ref::<SupervisorError>() {
        format_supervisor_error(e)
    } else if let Some(e) = config_error(err) {
        format_config_error(e)
    } else {
        format!("{} {:#}", style("Error:").red().bold(), err)
    };
    eprintln!();
    eprintln!("{msg}");
}

fn config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.downcast_ref::<ConfigError>().or_else(|| {
        match err.downcast_ref::<SupervisorError>() {
            Some(SupervisorError::Config(e)) => Some(e),
            _ => None,
        }
    })
}
