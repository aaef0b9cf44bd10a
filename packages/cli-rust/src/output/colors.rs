//! Color utilities for CLI output
//!
//! Provides consistent color styling for wiring actions, probe outcomes and
//! backend log lines.

use bootgate_core::{ProbeOutcome, WireAction};
use console::{Style, StyledObject};

/// Style a storage wiring action
///
/// - linked, already wired -> green
/// - migrated -> cyan bold
/// - relinked -> yellow
pub fn action_style(action: &WireAction) -> StyledObject<&'static str> {
    let (label, style) = match action {
        WireAction::Linked => ("linked", Style::new().green()),
        WireAction::AlreadyWired => ("already wired", Style::new().green()),
        WireAction::Migrated { .. } => ("migrated", Style::new().cyan().bold()),
        WireAction::Relinked { .. } => ("relinked", Style::new().yellow()),
    };
    style.apply_to(label)
}

/// Style a readiness probe outcome
///
/// - healthy -> green bold
/// - refused, timed out -> yellow
/// - other -> red
pub fn probe_style(outcome: ProbeOutcome) -> StyledObject<String> {
    let style = match outcome {
        ProbeOutcome::Healthy => Style::new().green().bold(),
        ProbeOutcome::ConnectionRefused | ProbeOutcome::Timeout => Style::new().yellow(),
        ProbeOutcome::Unhealthy(_) | ProbeOutcome::Failed => Style::new().red(),
    };
    style.apply_to(outcome.to_string())
}

/// Style a backend log line based on detected severity
///
/// - Contains "ERROR", "Error", "Traceback" or "Exception" -> red
/// - Contains "WARN" or "Warning" -> yellow
/// - else -> dim
pub fn log_level_style(line: &str) -> StyledObject<&str> {
    let style = if ["ERROR", "Error", "error:", "Traceback", "Exception"]
        .iter()
        .any(|marker| line.contains(marker))
    {
        Style::new().red()
    } else if line.contains("WARN") || line.contains("Warning") {
        Style::new().yellow()
    } else {
        Style::new().dim()
    };
    style.apply_to(line)
}
