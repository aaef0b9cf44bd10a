//! Error types for the supervisor pipeline
//!
//! Every fatal category maps to its own process exit code so an operator can
//! tell failures apart without reading logs.

use crate::config::ValidationError;
use crate::handoff::HandoffError;
use crate::launcher::LaunchError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Process exit codes used by the supervisor itself
pub mod exit_code {
    /// Configuration could not be loaded or failed validation
    pub const CONFIG_INVALID: i32 = 2;
    /// Storage was required but could not be wired
    pub const STORAGE_WIRE_FAILED: i32 = 3;
    /// The backend executable could not be started
    pub const LAUNCH_FAILED: i32 = 4;
    /// The backend exited before becoming ready
    pub const BACKEND_CRASHED: i32 = 5;
    /// The backend never became ready within the budget
    pub const TIMED_OUT: i32 = 6;
    /// The worker could not be started
    pub const HANDOFF_FAILED: i32 = 7;

    /// Conventional shell exit code for termination by `signal`
    pub fn for_signal(signal: i32) -> i32 {
        128 + signal
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {error}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Invalid config file {}: {error}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Terminal failures of a supervisor run
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build readiness probe: {0}")]
    ProbeSetup(#[from] reqwest::Error),

    #[error("Persistent storage is required but was not wired: {reason}")]
    StorageWireFailed { reason: String },

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Backend exited during startup ({}) after {attempts} attempt(s)", describe_exit(*exit_code))]
    BackendCrashed {
        exit_code: Option<i32>,
        attempts: u32,
        diagnostics: Vec<String>,
    },

    #[error("Backend did not become ready after {attempts} attempt(s) in {}", humantime::format_duration(*elapsed))]
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        diagnostics: Vec<String>,
    },

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error("Interrupted by signal {signal} while waiting for the backend")]
    Interrupted { signal: i32 },
}

impl SupervisorError {
    /// Exit code the supervisor process should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Config(_) | SupervisorError::ProbeSetup(_) => {
                exit_code::CONFIG_INVALID
            }
            SupervisorError::StorageWireFailed { .. } => exit_code::STORAGE_WIRE_FAILED,
            SupervisorError::Launch(_) => exit_code::LAUNCH_FAILED,
            SupervisorError::BackendCrashed { .. } => exit_code::BACKEND_CRASHED,
            SupervisorError::TimedOut { .. } => exit_code::TIMED_OUT,
            SupervisorError::Handoff(_) => exit_code::HANDOFF_FAILED,
            SupervisorError::Interrupted { signal } => exit_code::for_signal(*signal),
        }
    }

    /// Captured backend output for failures that have it
    pub fn diagnostics(&self) -> &[String] {
        match self {
            SupervisorError::BackendCrashed { diagnostics, .. }
            | SupervisorError::TimedOut { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Human description of a process exit code
pub fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
