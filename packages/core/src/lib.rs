//! bootgate-core - Core library for bootgate
//!
//! This library provides the startup pipeline used by the `bootgate` CLI:
//! - Configuration schema, loading and validation
//! - Persistent storage wiring (symlink redirects onto a volume)
//! - Best-effort prestart hooks
//! - Backend launch with captured output
//! - Health gating (readiness probe + liveness check)
//! - Handoff to the foreground worker

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handoff;
pub mod health;
pub mod hooks;
pub mod launcher;
pub mod orchestrator;
pub mod signals;
pub mod storage;

pub use config::{Config, load_config};
pub use error::{ConfigError, SupervisorError, exit_code};
pub use handoff::{ExecWorker, HandoffError, WorkerCommand, WorkerLauncher};
pub use health::{
    GateReport, GateState, HttpReadinessProbe, Liveness, LivenessCheck, ProbeOutcome,
    ReadinessPolicy, ReadinessProbe, ReadyProof, wait_for_ready,
};
pub use launcher::{BackendCommand, BackendProcess, LaunchError, launch};
pub use orchestrator::{OrchestrationResult, Outcome, Supervisor, await_backend, hand_off};
pub use storage::{
    RootSelection, StorageMapping, StorageReport, StorageWireWarning, WireAction,
    resolve_storage_root, wire_storage,
};

/// Get the version of bootgate-core
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
