//! Configuration management for bootgate
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then `BOOTGATE_*` environment variables. CLI flags are applied on top by
//! the binary.

pub mod schema;
pub mod template;
pub mod validation;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub use schema::{
    BackendConfig, Config, DiagnosticsConfig, HookConfig, ReadinessConfig, StorageConfig,
    StorageMappingConfig, WorkerConfig,
};
pub use template::TemplateVars;
pub use validation::{ValidationError, ValidationWarning, validate_config};

/// Config file used when neither `--config` nor `BOOTGATE_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bootgate/config.json";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "BOOTGATE_CONFIG";

/// Resolve which config file to read, if any
///
/// Resolution order:
/// 1. explicit path (from `--config`)
/// 2. `BOOTGATE_CONFIG`
/// 3. `/etc/bootgate/config.json` when it exists
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    default.exists().then_some(default)
}

/// Load configuration from file (if any) and the process environment
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => load_config_file(&path)?,
        None => {
            debug!("No config file found, using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Read and parse one config file
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    debug!("Loading config from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e,
    })
}

/// Apply `BOOTGATE_*` overrides using `lookup` to read variables
///
/// Empty values are ignored. `COMFY_PORT` is honored as a fallback for the
/// backend port.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(value) = get("BOOTGATE_BACKEND_PROGRAM") {
        config.backend.program = value;
    }
    if let Some(value) = get("BOOTGATE_WORKING_DIR") {
        config.backend.working_dir = PathBuf::from(value);
    }
    if let Some(value) = get("BOOTGATE_BACKEND_HOST") {
        config.backend.host = value;
    }
    if let Some(value) = get("BOOTGATE_BACKEND_PORT") {
        config.backend.port = parse_env("BOOTGATE_BACKEND_PORT", &value)?;
    } else if let Some(value) = get("COMFY_PORT") {
        config.backend.port = parse_env("COMFY_PORT", &value)?;
    }
    if let Some(value) = get("BOOTGATE_STATUS_PATH") {
        config.backend.status_path = value;
    }
    if let Some(value) = get("BOOTGATE_INPUT_DIR") {
        config.backend.input_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = get("BOOTGATE_OUTPUT_DIR") {
        config.backend.output_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = get("BOOTGATE_BACKEND_LOG") {
        config.backend.log_file = PathBuf::from(value);
    }
    if let Some(value) = get("BOOTGATE_WORKER_PROGRAM") {
        config.worker.program = value;
    }
    if let Some(value) = get("BOOTGATE_WORKER_PORT") {
        config.worker.port = Some(parse_env("BOOTGATE_WORKER_PORT", &value)?);
    }
    if let Some(value) = get("BOOTGATE_STORAGE_ROOT") {
        config.storage.root = Some(PathBuf::from(value));
    }
    if let Some(value) = get("BOOTGATE_POLL_INTERVAL") {
        config.readiness.interval = parse_duration_env("BOOTGATE_POLL_INTERVAL", &value)?;
    }
    if let Some(value) = get("BOOTGATE_MAX_ATTEMPTS") {
        config.readiness.max_attempts = parse_env("BOOTGATE_MAX_ATTEMPTS", &value)?;
    }
    if let Some(value) = get("BOOTGATE_MAX_WAIT") {
        config.readiness.max_duration = Some(parse_duration_env("BOOTGATE_MAX_WAIT", &value)?);
    }

    Ok(())
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        message: format!("'{value}': {e}"),
    })
}

fn parse_duration_env(var: &str, value: &str) -> Result<std::time::Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Env {
        var: var.to_string(),
        message: format!("'{value}': {e}"),
    })
}
