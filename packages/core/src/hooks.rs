//! Prestart hooks
//!
//! Optional setup commands (custom node installers, cache warmers) run after
//! storage wiring and before the backend starts. They are best effort: a
//! hook that keeps failing is logged and skipped, never fatal.

use crate::config::HookConfig;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

/// Why a single hook attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("could not start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}

/// A hook that failed every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub name: String,
    pub error: HookError,
}

/// Outcome of all prestart hooks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<HookFailure>,
}

impl HookReport {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty()
    }
}

/// Delays between attempts: `retry_delay`, `2 * retry_delay`, ...
fn linear_delays(attempts: u32, retry_delay: Duration) -> impl Iterator<Item = Duration> {
    (1..attempts.max(1)).map(move |n| retry_delay.saturating_mul(n))
}

/// Run every hook in order
pub async fn run_hooks(hooks: &[HookConfig]) -> HookReport {
    let mut report = HookReport::default();

    for hook in hooks {
        info!("Running prestart hook '{}'", hook.name);
        let mut attempt = 0u32;
        let result = Retry::start(linear_delays(hook.attempts, hook.retry_delay), || {
            attempt += 1;
            let attempt = attempt;
            async move {
                let result = run_once(hook).await;
                if let Err(e) = &result {
                    warn!(
                        "Prestart hook '{}' attempt {}/{} failed: {}",
                        hook.name, attempt, hook.attempts, e
                    );
                }
                result
            }
        })
        .await;

        match result {
            Ok(()) => {
                debug!("Prestart hook '{}' succeeded", hook.name);
                report.succeeded.push(hook.name.clone());
            }
            Err(error) => {
                warn!("Prestart hook '{}' skipped after failures: {}", hook.name, error);
                report.failed.push(HookFailure {
                    name: hook.name.clone(),
                    error,
                });
            }
        }
    }

    report
}

async fn run_once(hook: &HookConfig) -> Result<(), HookError> {
    let status = tokio::process::Command::new(&hook.program)
        .args(&hook.args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| HookError::Spawn {
            program: hook.program.clone(),
            message: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(HookError::Failed {
            program: hook.program.clone(),
            status: status.to_string(),
        })
    }
}
