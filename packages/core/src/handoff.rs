//! Handoff to the foreground worker
//!
//! Once the backend is ready the supervisor's job is done. On Unix the
//! worker replaces the supervisor process, so it inherits the pid, the
//! terminal and the signal routing. Elsewhere the worker is spawned and its
//! exit code is passed through unchanged.

use crate::config::schema::{BackendConfig, WorkerConfig, probe_host};
use crate::config::TemplateVars;
use crate::health::ReadyProof;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Environment variable carrying the backend base URL to the worker
pub const BACKEND_URL_ENV: &str = "BOOTGATE_BACKEND_URL";

/// Port variable read by ComfyUI workers
pub const BACKEND_PORT_ENV: &str = "COMFY_PORT";

/// Errors starting the worker
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Worker executable not found: {program}")]
    NotFound { program: String },

    #[error("Failed to start worker {program}: {error}")]
    Exec {
        program: String,
        #[source]
        error: io::Error,
    },
}

/// Fully resolved worker invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl WorkerCommand {
    /// Expand the worker templates against the backend location
    ///
    /// The worker always receives `COMFY_PORT` and `BOOTGATE_BACKEND_URL`;
    /// configured environment entries override them.
    pub fn from_config(worker: &WorkerConfig, backend: &BackendConfig) -> Self {
        let mut vars = TemplateVars::new()
            .with("backend_host", probe_host(&backend.host))
            .with("backend_port", backend.port.to_string())
            .with("backend_url", backend.base_url());
        if let Some(port) = worker.port {
            vars = vars.with("worker_port", port.to_string());
        }

        let mut env = BTreeMap::new();
        env.insert(BACKEND_PORT_ENV.to_string(), backend.port.to_string());
        env.insert(BACKEND_URL_ENV.to_string(), backend.base_url());
        for (key, value) in &worker.env {
            env.insert(key.clone(), vars.expand(value));
        }

        Self {
            program: worker.program.clone(),
            args: vars.expand_all(&worker.args),
            env,
            working_dir: worker.working_dir.clone(),
        }
    }

    /// Replace program and arguments, keeping environment and directory
    pub fn with_argv(mut self, argv: &[String]) -> Self {
        if let Some((program, args)) = argv.split_first() {
            self.program = program.clone();
            self.args = args.to_vec();
        }
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn std_command(&self) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Starts the worker once the backend is ready
pub trait WorkerLauncher {
    /// Run the worker and return its exit code
    ///
    /// Implementations that replace the current process only return on
    /// failure.
    fn launch(&mut self, command: &WorkerCommand, proof: ReadyProof) -> Result<i32, HandoffError>;
}

/// Production launcher: `exec` on Unix, spawn and wait elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecWorker;

impl WorkerLauncher for ExecWorker {
    #[cfg(unix)]
    fn launch(&mut self, command: &WorkerCommand, _proof: ReadyProof) -> Result<i32, HandoffError> {
        use std::os::unix::process::CommandExt;

        info!("Handing off to worker: {}", command.display());
        let error = command.std_command().exec();
        Err(handoff_error(&command.program, error))
    }

    #[cfg(not(unix))]
    fn launch(&mut self, command: &WorkerCommand, _proof: ReadyProof) -> Result<i32, HandoffError> {
        info!("Starting worker: {}", command.display());
        let status = command
            .std_command()
            .status()
            .map_err(|error| handoff_error(&command.program, error))?;
        Ok(status.code().unwrap_or(1))
    }
}

fn handoff_error(program: &str, error: io::Error) -> HandoffError {
    if error.kind() == io::ErrorKind::NotFound {
        HandoffError::NotFound {
            program: program.to_string(),
        }
    } else {
        HandoffError::Exec {
            program: program.to_string(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_templates_and_env() {
        let mut backend = BackendConfig::default();
        backend.host = "0.0.0.0".to_string();
        backend.port = 8190;
        let mut worker = WorkerConfig::default();
        worker.port = Some(8000);
        worker.args = vec![
            "handler.py".to_string(),
            "--comfy={backend_url}".to_string(),
            "--port={worker_port}".to_string(),
        ];
        worker
            .env
            .insert("COMFY_HOST".to_string(), "{backend_host}".to_string());

        let command = WorkerCommand::from_config(&worker, &backend);

        assert_eq!(
            command.args,
            vec!["handler.py", "--comfy=http://127.0.0.1:8190", "--port=8000"]
        );
        assert_eq!(command.env["COMFY_HOST"], "127.0.0.1");
        assert_eq!(command.env[BACKEND_PORT_ENV], "8190");
        assert_eq!(command.env[BACKEND_URL_ENV], "http://127.0.0.1:8190");
    }

    #[test]
    fn configured_env_overrides_defaults() {
        let backend = BackendConfig::default();
        let mut worker = WorkerConfig::default();
        worker
            .env
            .insert(BACKEND_PORT_ENV.to_string(), "9999".to_string());

        let command = WorkerCommand::from_config(&worker, &backend);
        assert_eq!(command.env[BACKEND_PORT_ENV], "9999");
    }

    #[test]
    fn unset_worker_port_leaves_placeholder() {
        let mut worker = WorkerConfig::default();
        worker.args = vec!["--port={worker_port}".to_string()];
        let command = WorkerCommand::from_config(&worker, &BackendConfig::default());
        assert_eq!(command.args, vec!["--port={worker_port}"]);
    }

    #[test]
    fn argv_override_replaces_program_and_args() {
        let command = WorkerCommand::from_config(&WorkerConfig::default(), &BackendConfig::default())
            .with_argv(&["node".to_string(), "worker.js".to_string()]);
        assert_eq!(command.program, "node");
        assert_eq!(command.args, vec!["worker.js"]);
        assert!(command.env.contains_key(BACKEND_URL_ENV));

        let unchanged =
            WorkerCommand::from_config(&WorkerConfig::default(), &BackendConfig::default())
                .with_argv(&[]);
        assert_eq!(unchanged.program, "python3");
    }

    #[test]
    fn missing_worker_is_not_found() {
        let command = WorkerCommand {
            program: "/nonexistent/bootgate-worker".to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        };

        let result = ExecWorker.launch(&command, ReadyProof::for_tests());

        match result {
            Err(HandoffError::NotFound { program }) => {
                assert_eq!(program, "/nonexistent/bootgate-worker")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
