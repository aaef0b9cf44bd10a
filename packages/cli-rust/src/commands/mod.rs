//! CLI command implementations
//!
//! This module contains the implementations for the bootgate subcommands and
//! the flag layer shared by them.

mod config;
mod probe;
mod run;
mod wire_storage;

pub use config::{ConfigArgs, cmd_config};
pub use probe::{ProbeArgs, cmd_probe};
pub use run::{RunArgs, cmd_run};
pub use wire_storage::{WireStorageArgs, cmd_wire_storage};

use bootgate_core::config::validation::display_validation_warning;
use bootgate_core::config::validate_config;
use bootgate_core::{Config, ConfigError, load_config};
use clap::Args;
use std::path::{Path, PathBuf};

/// Flags overriding the file and environment configuration
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Backend executable
    #[arg(long, value_name = "PROGRAM")]
    pub backend_program: Option<String>,

    /// Backend working directory
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Backend bind host
    #[arg(long, value_name = "HOST")]
    pub backend_host: Option<String>,

    /// Backend port
    #[arg(long, value_name = "PORT")]
    pub backend_port: Option<u16>,

    /// File receiving backend stdout and stderr
    #[arg(long, value_name = "PATH")]
    pub backend_log: Option<PathBuf>,

    /// Port the worker listens on
    #[arg(long, value_name = "PORT")]
    pub worker_port: Option<u16>,

    /// Persistent storage root
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Delay between readiness attempts (e.g. "1s", "500ms")
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<humantime::Duration>,

    /// Maximum number of readiness attempts
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Wall-clock limit on the readiness wait (e.g. "5m")
    #[arg(long, value_name = "DURATION")]
    pub max_wait: Option<humantime::Duration>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(program) = &self.backend_program {
            config.backend.program = program.clone();
        }
        if let Some(dir) = &self.working_dir {
            config.backend.working_dir = dir.clone();
        }
        if let Some(host) = &self.backend_host {
            config.backend.host = host.clone();
        }
        if let Some(port) = self.backend_port {
            config.backend.port = port;
        }
        if let Some(path) = &self.backend_log {
            config.backend.log_file = path.clone();
        }
        if let Some(port) = self.worker_port {
            config.worker.port = Some(port);
        }
        if let Some(root) = &self.storage_root {
            config.storage.root = Some(root.clone());
        }
        if let Some(interval) = &self.interval {
            config.readiness.interval = **interval;
        }
        if let Some(attempts) = self.max_attempts {
            config.readiness.max_attempts = attempts;
        }
        if let Some(max_wait) = &self.max_wait {
            config.readiness.max_duration = Some(**max_wait);
        }
    }
}

/// Load config, apply flag overrides and validate
///
/// Warnings are printed unless `quiet`; a fatal validation error is returned
/// as [`ConfigError::Invalid`].
pub fn load_validated(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    quiet: bool,
) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config);
    let warnings = validate_config(&config)?;
    if !quiet {
        for warning in &warnings {
            display_validation_warning(warning);
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = Config::default();
        let overrides = ConfigOverrides {
            backend_port: Some(3000),
            storage_root: Some(PathBuf::from("/mnt/volume")),
            interval: Some(Duration::from_millis(250).into()),
            max_wait: Some(Duration::from_secs(120).into()),
            ..ConfigOverrides::default()
        };

        overrides.apply(&mut config);

        assert_eq!(config.backend.port, 3000);
        assert_eq!(config.backend.host, "127.0.0.1");
        assert_eq!(config.storage.root, Some(PathBuf::from("/mnt/volume")));
        assert_eq!(config.readiness.interval, Duration::from_millis(250));
        assert_eq!(config.readiness.max_duration, Some(Duration::from_secs(120)));
        assert_eq!(config.readiness.max_attempts, 120);
    }

    #[test]
    fn flags_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"backend": {"port": 9000, "host": "0.0.0.0"}}"#).unwrap();
        let overrides = ConfigOverrides {
            backend_port: Some(9100),
            ..ConfigOverrides::default()
        };

        let config = load_validated(Some(&path), &overrides, true).unwrap();

        assert_eq!(config.backend.port, 9100);
        assert_eq!(config.backend.host, "0.0.0.0");
    }

    #[test]
    fn invalid_override_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        let overrides = ConfigOverrides {
            max_attempts: Some(0),
            ..ConfigOverrides::default()
        };

        let err = load_validated(Some(&path), &overrides, true).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
