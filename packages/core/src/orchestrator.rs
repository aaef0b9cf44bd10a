//! Startup pipeline
//!
//! Runs the stages strictly in order: storage wiring, prestart hooks,
//! backend launch, health gate, handoff. Every run ends in exactly one
//! [`OrchestrationResult`]; only a `Ready` result can be handed off.

use crate::config::Config;
use crate::diagnostics::tail_log_or_note;
use crate::error::{SupervisorError, exit_code};
use crate::handoff::{ExecWorker, WorkerCommand, WorkerLauncher};
use crate::health::{
    GateState, HttpReadinessProbe, LivenessCheck, ReadinessPolicy, ReadinessProbe, ReadyProof,
    wait_for_ready,
};
use crate::hooks::run_hooks;
use crate::launcher::{BackendCommand, BackendProcess, launch};
use crate::signals::ShutdownSignals;
use crate::storage::{StorageMapping, StorageReport, resolve_storage_root, wire_storage};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long the backend gets to exit after being asked to stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Terminal outcome of a startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ready,
    BackendCrashed { exit_code: Option<i32> },
    TimedOut,
    StorageWireFailed { reason: String },
}

impl Outcome {
    /// Exit code for this outcome when the supervisor stops here
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Ready => 0,
            Outcome::BackendCrashed { .. } => exit_code::BACKEND_CRASHED,
            Outcome::TimedOut => exit_code::TIMED_OUT,
            Outcome::StorageWireFailed { .. } => exit_code::STORAGE_WIRE_FAILED,
        }
    }
}

/// Result of a startup, produced once per run
#[derive(Debug)]
pub struct OrchestrationResult {
    pub outcome: Outcome,
    /// Last lines of the backend log for crashed or timed-out runs
    pub diagnostics: Vec<String>,
    pub attempts: u32,
    pub elapsed: Duration,
    proof: Option<ReadyProof>,
}

impl OrchestrationResult {
    fn storage_failed(reason: String) -> Self {
        Self {
            outcome: Outcome::StorageWireFailed { reason },
            diagnostics: Vec::new(),
            attempts: 0,
            elapsed: Duration::ZERO,
            proof: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.outcome == Outcome::Ready
    }

    /// The handoff token for a ready backend, or the error to exit with
    pub fn into_ready(self) -> Result<ReadyProof, SupervisorError> {
        let Self {
            outcome,
            diagnostics,
            attempts,
            elapsed,
            proof,
        } = self;

        match (outcome, proof) {
            (Outcome::Ready, Some(proof)) => Ok(proof),
            (Outcome::BackendCrashed { exit_code }, _) => Err(SupervisorError::BackendCrashed {
                exit_code,
                attempts,
                diagnostics,
            }),
            (Outcome::StorageWireFailed { reason }, _) => {
                Err(SupervisorError::StorageWireFailed { reason })
            }
            (Outcome::TimedOut, _) | (Outcome::Ready, None) => Err(SupervisorError::TimedOut {
                attempts,
                elapsed,
                diagnostics,
            }),
        }
    }
}

/// Run the health gate and turn its report into a result
///
/// Diagnostics are read from `log_file` when the gate did not reach Ready.
pub async fn await_backend<P, L>(
    probe: &P,
    backend: &mut L,
    policy: &ReadinessPolicy,
    log_file: &Path,
    tail_lines: usize,
) -> OrchestrationResult
where
    P: ReadinessProbe,
    L: LivenessCheck,
{
    let report = wait_for_ready(probe, backend, policy).await;

    let outcome = match report.state() {
        GateState::Ready => Outcome::Ready,
        GateState::Crashed { exit_code } => Outcome::BackendCrashed { exit_code },
        GateState::TimedOut | GateState::Waiting => Outcome::TimedOut,
    };

    let diagnostics = match outcome {
        Outcome::Ready => Vec::new(),
        _ => tail_log_or_note(log_file, tail_lines),
    };

    match &outcome {
        Outcome::Ready => info!(
            "Backend ready after {} attempt(s) in {}",
            report.attempts(),
            humantime::format_duration(round_millis(report.elapsed()))
        ),
        Outcome::BackendCrashed { exit_code } => error!(
            "Backend exited during startup ({})",
            crate::error::describe_exit(*exit_code)
        ),
        _ => error!(
            "Backend not ready after {} attempt(s), last probe: {}",
            report.attempts(),
            report
                .last_probe()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string())
        ),
    }

    OrchestrationResult {
        outcome,
        diagnostics,
        attempts: report.attempts(),
        elapsed: report.elapsed(),
        proof: report.ready_proof(),
    }
}

/// Start the worker if, and only if, the backend is ready
pub fn hand_off<W>(
    result: OrchestrationResult,
    worker: &mut W,
    command: &WorkerCommand,
) -> Result<i32, SupervisorError>
where
    W: WorkerLauncher,
{
    let proof = result.into_ready()?;
    Ok(worker.launch(command, proof)?)
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis().try_into().unwrap_or(u64::MAX))
}

/// Build the storage mapping from config
pub fn storage_mapping(config: &Config) -> StorageMapping {
    let working_dir = &config.backend.working_dir;
    StorageMapping::new(config.storage.mappings.iter().map(|mapping| {
        (
            mapping.resolved_source(working_dir),
            mapping.subdir.clone(),
        )
    }))
}

/// Resolve the storage root and wire every mapping
pub fn wire_configured_storage(config: &Config) -> StorageReport {
    let selection = resolve_storage_root(config.storage.root.as_deref(), &config.storage.candidates);
    wire_storage(&selection, &storage_mapping(config))
}

/// Reason wiring is unacceptable when storage is required
fn storage_failure(report: &StorageReport) -> Option<String> {
    if let Some(reason) = &report.skipped_reason {
        return Some(reason.clone());
    }
    if report.warnings.is_empty() {
        return None;
    }
    Some(
        report
            .warnings
            .iter()
            .map(|warning| warning.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

enum Waited {
    Done(OrchestrationResult),
    Signal(i32),
}

/// The whole startup pipeline for one configuration
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: Config,
    worker_argv: Vec<String>,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            worker_argv: Vec::new(),
        }
    }

    /// Replace the configured worker program and arguments
    pub fn with_worker_argv(mut self, argv: Vec<String>) -> Self {
        self.worker_argv = argv;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn worker_command(&self) -> WorkerCommand {
        WorkerCommand::from_config(&self.config.worker, &self.config.backend)
            .with_argv(&self.worker_argv)
    }

    /// Run the pipeline with the HTTP probe and process-replacing handoff
    ///
    /// On Unix this only returns on failure.
    pub async fn run(&self) -> Result<i32, SupervisorError> {
        let probe = HttpReadinessProbe::for_backend(&self.config.backend, &self.config.readiness)?;
        debug!("Readiness probe: GET {}", probe.url());
        self.run_with(&probe, &mut ExecWorker).await
    }

    /// Run the pipeline with the given probe and worker launcher
    pub async fn run_with<P, W>(&self, probe: &P, worker: &mut W) -> Result<i32, SupervisorError>
    where
        P: ReadinessProbe,
        W: WorkerLauncher,
    {
        let config = &self.config;

        let storage = wire_configured_storage(config);
        if config.storage.required
            && let Some(reason) = storage_failure(&storage)
        {
            error!("Persistent storage is required: {}", reason);
            let result = OrchestrationResult::storage_failed(reason);
            return hand_off(result, worker, &self.worker_command());
        }

        let mut signals = match ShutdownSignals::install() {
            Ok(signals) => Some(signals),
            Err(e) => {
                warn!("Cannot listen for termination signals: {}", e);
                None
            }
        };

        if !config.prestart.is_empty() {
            let running = run_hooks(&config.prestart);
            let hooks = match signals.as_mut() {
                // Dropping the hooks future kills the running hook
                Some(signals) => tokio::select! {
                    report = running => report,
                    signal = signals.recv() => {
                        warn!("Received signal {} during prestart hooks", signal);
                        return Err(SupervisorError::Interrupted { signal });
                    }
                },
                None => running.await,
            };
            if !hooks.failed.is_empty() {
                warn!(
                    "{} prestart hook(s) failed, continuing",
                    hooks.failed.len()
                );
            }
        }

        let command = BackendCommand::from_config(&config.backend, &storage);
        info!("Launching backend: {}", command.display());
        let mut backend = launch(&command)?;

        let policy = ReadinessPolicy::from(&config.readiness);
        let tail_lines = config.diagnostics.tail_lines;
        let waited = {
            let gate = await_backend(probe, &mut backend, &policy, &command.log_file, tail_lines);
            match signals.as_mut() {
                Some(signals) => tokio::select! {
                    result = gate => Waited::Done(result),
                    signal = signals.recv() => Waited::Signal(signal),
                },
                None => Waited::Done(gate.await),
            }
        };

        let result = match waited {
            Waited::Done(result) => result,
            Waited::Signal(signal) => {
                warn!("Received signal {} while waiting, stopping backend", signal);
                forward_signal(&mut backend, signal).await;
                return Err(SupervisorError::Interrupted { signal });
            }
        };

        if result.outcome == Outcome::TimedOut {
            stop_backend(&mut backend).await;
        }

        let worker_command = self.worker_command();
        let handed_off = hand_off(result, worker, &worker_command);

        // Only reached when the worker did not replace this process
        if matches!(handed_off, Ok(_) | Err(SupervisorError::Handoff(_))) {
            stop_backend(&mut backend).await;
        }
        handed_off
    }
}

/// Pass a termination signal on to the backend and wait for it to exit
async fn forward_signal(backend: &mut BackendProcess, signal: i32) {
    #[cfg(unix)]
    if let Err(e) = backend.signal(signal) {
        debug!("Forwarding signal {} to backend failed: {}", signal, e);
    }
    #[cfg(not(unix))]
    let _ = signal;

    match tokio::time::timeout(SHUTDOWN_GRACE, backend.wait()).await {
        Ok(Ok(status)) => debug!("Backend exited: {}", status),
        Ok(Err(e)) => debug!("Waiting for backend failed: {}", e),
        Err(_) => stop_backend(backend).await,
    }
}

async fn stop_backend(backend: &mut BackendProcess) {
    match backend.terminate(SHUTDOWN_GRACE).await {
        Ok(status) => debug!("Backend (pid {}) stopped: {}", backend.pid(), status),
        Err(e) => warn!("Failed to stop backend (pid {}): {}", backend.pid(), e),
    }
}
