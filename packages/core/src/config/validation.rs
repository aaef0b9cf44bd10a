//! Configuration validation with actionable error messages
//!
//! Validates the configuration and suggests the setting that fixes each issue.

use super::schema::{Config, is_all_interfaces};
use console::style;
use std::collections::HashSet;
use std::path::{Component, Path};
use std::time::Duration;
use thiserror::Error;

/// A configuration validation error with an actionable fix hint
#[derive(Debug, Clone, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// The config field that has an error
    pub field: String,
    /// Description of what's wrong
    pub message: String,
    /// Setting or environment variable that fixes the issue
    pub fix_hint: String,
}

/// A configuration validation warning (non-fatal)
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The config field with a potential issue
    pub field: String,
    /// Description of the warning
    pub message: String,
    /// Suggested setting to address the warning
    pub fix_hint: String,
}

fn error(field: &str, message: impl Into<String>, fix_hint: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
        fix_hint: fix_hint.into(),
    }
}

/// Validate configuration and return warnings or first error
///
/// Returns Ok(warnings) if validation passes (possibly with non-fatal warnings).
/// Returns Err(error) on the first fatal validation error encountered.
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>, ValidationError> {
    let mut warnings = Vec::new();

    if config.backend.program.trim().is_empty() {
        return Err(error(
            "backend.program",
            "Backend program must not be empty",
            "BOOTGATE_BACKEND_PROGRAM=python3",
        ));
    }

    if config.worker.program.trim().is_empty() {
        return Err(error(
            "worker.program",
            "Worker program must not be empty",
            "bootgate run -- python3 -u handler.py",
        ));
    }

    if config.backend.port == 0 {
        return Err(error(
            "backend.port",
            "Backend port must be a fixed port (not 0)",
            "BOOTGATE_BACKEND_PORT=8188",
        ));
    }

    if let Some(worker_port) = config.worker.port {
        if worker_port == 0 {
            return Err(error(
                "worker.port",
                "Worker port must be a fixed port (not 0)",
                "BOOTGATE_WORKER_PORT=8000",
            ));
        }
        if worker_port == config.backend.port {
            return Err(error(
                "worker.port",
                format!("Worker port {worker_port} collides with the backend port"),
                "BOOTGATE_WORKER_PORT=8000",
            ));
        }
    }

    // Readiness schedule
    if config.readiness.max_attempts == 0 {
        return Err(error(
            "readiness.max_attempts",
            "max_attempts must be > 0",
            "BOOTGATE_MAX_ATTEMPTS=120",
        ));
    }

    if config.readiness.interval.is_zero() {
        return Err(error(
            "readiness.interval",
            "interval must be > 0",
            "BOOTGATE_POLL_INTERVAL=1s",
        ));
    }

    if config.readiness.probe_timeout.is_zero() {
        return Err(error(
            "readiness.probe_timeout",
            "probe_timeout must be > 0",
            "\"readiness\": {\"probe_timeout\": \"10s\"}",
        ));
    }

    if config.readiness.max_duration.is_some_and(|d| d.is_zero()) {
        return Err(error(
            "readiness.max_duration",
            "max_duration must be > 0 when set",
            "BOOTGATE_MAX_WAIT=2m",
        ));
    }

    for (index, hook) in config.prestart.iter().enumerate() {
        if hook.program.trim().is_empty() {
            return Err(error(
                &format!("prestart[{index}].program"),
                format!("Prestart hook '{}' has no program", hook.name),
                "remove the hook or set its program",
            ));
        }
        if hook.attempts == 0 {
            return Err(error(
                &format!("prestart[{index}].attempts"),
                format!("Prestart hook '{}' must allow at least one attempt", hook.name),
                "\"attempts\": 1",
            ));
        }
    }

    for (index, mapping) in config.storage.mappings.iter().enumerate() {
        if !is_contained_subdir(&mapping.subdir) {
            return Err(error(
                &format!("storage.mappings[{index}].subdir"),
                format!(
                    "Subdir '{}' must be a relative path inside the storage root",
                    mapping.subdir.display()
                ),
                "\"subdir\": \"models\"",
            ));
        }
    }

    // Warnings (non-fatal)

    if is_all_interfaces(&config.backend.host) {
        warnings.push(ValidationWarning {
            field: "backend.host".to_string(),
            message: "Backend listens on all interfaces".to_string(),
            fix_hint: "BOOTGATE_BACKEND_HOST=127.0.0.1".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for mapping in &config.storage.mappings {
        let source = mapping.resolved_source(&config.backend.working_dir);
        if !seen.insert(source.clone()) {
            warnings.push(ValidationWarning {
                field: "storage.mappings".to_string(),
                message: format!(
                    "Multiple mappings for '{}'; the last entry wins",
                    source.display()
                ),
                fix_hint: "remove the duplicate mapping".to_string(),
            });
        }
    }

    if let Some(max_duration) = config.readiness.max_duration {
        let scheduled = config
            .readiness
            .interval
            .checked_mul(config.readiness.max_attempts)
            .unwrap_or(Duration::MAX);
        if scheduled > max_duration {
            warnings.push(ValidationWarning {
                field: "readiness.max_duration".to_string(),
                message: format!(
                    "max_attempts at this interval spans {}, longer than max_duration {}; \
the wait ends at max_duration",
                    humantime::format_duration(scheduled),
                    humantime::format_duration(max_duration)
                ),
                fix_hint: "lower BOOTGATE_MAX_ATTEMPTS or raise BOOTGATE_MAX_WAIT".to_string(),
            });
        }
    }

    Ok(warnings)
}

/// A subdir must stay inside the storage root
fn is_contained_subdir(subdir: &Path) -> bool {
    let mut has_normal = false;
    for component in subdir.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_normal
}

/// Display a validation error with styled formatting
pub fn display_validation_error(error: &ValidationError) {
    eprintln!();
    eprintln!("{}", style("Error: Configuration error").red().bold());
    eprintln!();
    eprintln!("  {}  {}", style("Field:").dim(), error.field);
    eprintln!("  {}  {}", style("Problem:").dim(), error.message);
    eprintln!();
    eprintln!("{}:", style("To fix, set").dim());
    eprintln!("  {}", style(&error.fix_hint).cyan());
    eprintln!();
}

/// Display a validation warning with styled formatting
pub fn display_validation_warning(warning: &ValidationWarning) {
    eprintln!();
    eprintln!(
        "{}",
        style("Warning: Configuration warning").yellow().bold()
    );
    eprintln!();
    eprintln!("  {}  {}", style("Field:").dim(), warning.field);
    eprintln!("  {}  {}", style("Issue:").dim(), warning.message);
    eprintln!();
    eprintln!("{}:", style("To address, set").dim());
    eprintln!("  {}", style(&warning.fix_hint).cyan());
    eprintln!();
}
