//! Backend process launcher
//!
//! Starts the backend in the background with stdout and stderr appended to a
//! log file. The log file handle is given to the child directly, so output
//! is captured from the first byte and keeps flowing after the supervisor
//! replaces itself with the worker.

use crate::config::BackendConfig;
use crate::config::TemplateVars;
use crate::diagnostics::LAUNCH_MARKER_PREFIX;
use crate::health::{Liveness, LivenessCheck};
use crate::storage::StorageReport;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors starting the backend
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Backend executable not found: {program}")]
    NotFound { program: String },

    #[error("Permission denied executing backend: {program}")]
    PermissionDenied { program: String },

    #[error("Backend working directory {} is unusable: {error}", path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Cannot open backend log {}: {error}", path.display())]
    LogSink {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Failed to start backend {program}: {error}")]
    Spawn {
        program: String,
        #[source]
        error: io::Error,
    },
}

/// Fully resolved backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub log_file: PathBuf,
}

impl BackendCommand {
    /// Expand the configured templates
    ///
    /// Input and output directories point into storage when wiring
    /// redirected them.
    pub fn from_config(backend: &BackendConfig, storage: &StorageReport) -> Self {
        let vars = backend_vars(backend, storage);
        Self {
            program: backend.program.clone(),
            args: vars.expand_all(&backend.args),
            env: backend
                .env
                .iter()
                .map(|(key, value)| (key.clone(), vars.expand(value)))
                .collect(),
            working_dir: backend.working_dir.clone(),
            log_file: backend.log_file.clone(),
        }
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn backend_vars(backend: &BackendConfig, storage: &StorageReport) -> TemplateVars {
    TemplateVars::new()
        .with("host", backend.host.trim())
        .with("port", backend.port.to_string())
        .with(
            "input_dir",
            storage.resolve(&backend.input_dir()).display().to_string(),
        )
        .with(
            "output_dir",
            storage.resolve(&backend.output_dir()).display().to_string(),
        )
        .with("working_dir", backend.working_dir.display().to_string())
}

/// Handle to the running backend
///
/// Dropping the handle does not kill the process.
#[derive(Debug)]
pub struct BackendProcess {
    child: tokio::process::Child,
    pid: u32,
    program: String,
    log_file: PathBuf,
}

impl BackendProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Non-blocking exit check
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Send `signal` to the backend's process group
    #[cfg(unix)]
    pub fn signal(&self, signal: i32) -> io::Result<()> {
        let Ok(pgid) = libc::pid_t::try_from(self.pid) else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"));
        };
        // SAFETY: kill has no memory-safety preconditions. The negative pid
        // addresses the group created for the backend at spawn.
        let rc = unsafe { libc::kill(-pgid, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// Ask the backend to stop, killing it if it is still running after
    /// `grace`
    pub async fn terminate(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        #[cfg(unix)]
        if let Err(e) = self.signal(libc::SIGTERM) {
            debug!("SIGTERM to backend group {} failed: {}", self.pid, e);
        }
        #[cfg(not(unix))]
        self.child.start_kill()?;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "Backend did not stop within {}, killing it",
                    humantime::format_duration(grace)
                );
                #[cfg(unix)]
                if let Err(e) = self.signal(libc::SIGKILL) {
                    debug!("SIGKILL to backend group {} failed: {}", self.pid, e);
                }
                self.child.start_kill().ok();
                self.child.wait().await
            }
        }
    }
}

impl LivenessCheck for BackendProcess {
    fn liveness(&mut self) -> Liveness {
        match self.child.try_wait() {
            Ok(None) => Liveness::Running,
            Ok(Some(status)) => Liveness::Exited(status.code()),
            Err(e) => {
                warn!("Cannot query backend {} status: {}", self.pid, e);
                Liveness::Running
            }
        }
    }
}

/// Start the backend without waiting for it
///
/// Must be called from within a tokio runtime. Appends a launch marker to
/// the log before spawning.
pub fn launch(command: &BackendCommand) -> Result<BackendProcess, LaunchError> {
    check_working_dir(&command.working_dir)?;

    let mut log = open_log(&command.log_file).map_err(|error| LaunchError::LogSink {
        path: command.log_file.clone(),
        error,
    })?;
    write_marker(&mut log, &command.program).map_err(|error| LaunchError::LogSink {
        path: command.log_file.clone(),
        error,
    })?;
    let stderr_log = log.try_clone().map_err(|error| LaunchError::LogSink {
        path: command.log_file.clone(),
        error,
    })?;

    let mut std_command = std::process::Command::new(&command.program);
    std_command
        .args(&command.args)
        .envs(&command.env)
        .current_dir(&command.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(stderr_log));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_command.process_group(0);
    }

    let mut tokio_command = tokio::process::Command::from(std_command);
    tokio_command.kill_on_drop(false);

    debug!("Spawning backend: {}", command.display());
    let child = tokio_command
        .spawn()
        .map_err(|error| spawn_error(&command.program, error))?;
    let Some(pid) = child.id() else {
        return Err(LaunchError::Spawn {
            program: command.program.clone(),
            error: io::Error::other("backend exited before its pid was read"),
        });
    };

    info!(
        "Backend started (pid {}), output in {}",
        pid,
        command.log_file.display()
    );
    Ok(BackendProcess {
        child,
        pid,
        program: command.program.clone(),
        log_file: command.log_file.clone(),
    })
}

fn check_working_dir(path: &Path) -> Result<(), LaunchError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(LaunchError::WorkingDir {
            path: path.to_path_buf(),
            error: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        }),
        Err(error) => Err(LaunchError::WorkingDir {
            path: path.to_path_buf(),
            error,
        }),
    }
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_marker(log: &mut File, program: &str) -> io::Result<()> {
    let now = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    writeln!(log, "{LAUNCH_MARKER_PREFIX} {program} at {now} ===")?;
    log.flush()
}

fn spawn_error(program: &str, error: io::Error) -> LaunchError {
    match error.kind() {
        io::ErrorKind::NotFound => LaunchError::NotFound {
            program: program.to_string(),
        },
        io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied {
            program: program.to_string(),
        },
        _ => LaunchError::Spawn {
            program: program.to_string(),
            error,
        },
    }
}
