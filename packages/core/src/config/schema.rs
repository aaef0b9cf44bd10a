//! Configuration schema for bootgate
//!
//! Defines the structure and defaults for the config.json file.
//! Durations are written as human-readable strings ("1s", "500ms").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for bootgate
///
/// Every section is optional in the file; missing values take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Config file version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// The dependent backend server
    #[serde(default)]
    pub backend: BackendConfig,

    /// The foreground worker that receives control once the backend is ready
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Optional persistent storage wiring
    #[serde(default)]
    pub storage: StorageConfig,

    /// Health gate schedule
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Failure diagnostics
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Best-effort commands run before the backend starts
    #[serde(default)]
    pub prestart: Vec<HookConfig>,
}

/// Backend server invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Executable to start (default: "python3")
    #[serde(default = "default_backend_program")]
    pub program: String,

    /// Argument templates. Placeholders: {host}, {port}, {input_dir},
    /// {output_dir}, {working_dir}
    #[serde(default = "default_backend_args")]
    pub args: Vec<String>,

    /// Working root of the backend (default: "/workspace/ComfyUI")
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Bind host passed to the backend and used by the readiness probe
    #[serde(default = "default_backend_host")]
    pub host: String,

    /// Bind port (default: 8188)
    #[serde(default = "default_backend_port")]
    pub port: u16,

    /// Path of the status endpoint probed for readiness
    #[serde(default = "default_status_path")]
    pub status_path: String,

    /// Input directory (default: {working_dir}/input)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,

    /// Output directory (default: {working_dir}/output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// File receiving the backend's stdout and stderr
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Extra environment for the backend process
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Foreground worker invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Executable to hand off to (default: "python3")
    #[serde(default = "default_worker_program")]
    pub program: String,

    /// Argument templates. Placeholders: {backend_host}, {backend_port},
    /// {backend_url}, {worker_port}
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,

    /// Listening port, when the worker serves HTTP itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Working directory for the worker (default: inherited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Extra environment for the worker (values are templates too)
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Persistent storage wiring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Explicit storage root. When set, candidates are not probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Well-known roots probed in order when no explicit root is set
    #[serde(default = "default_storage_candidates")]
    pub candidates: Vec<PathBuf>,

    /// Directories redirected into the storage root
    #[serde(default = "default_storage_mappings")]
    pub mappings: Vec<StorageMappingConfig>,

    /// Abort startup when storage cannot be wired (default: false)
    #[serde(default)]
    pub required: bool,
}

/// One directory redirect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageMappingConfig {
    /// Directory the backend uses. Relative paths are resolved against
    /// `backend.working_dir`.
    pub source: PathBuf,
    /// Subdirectory of the storage root that will hold the data
    pub subdir: PathBuf,
}

/// Health gate schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    /// Sleep between attempts (default: 1s)
    #[serde(default = "default_interval", with = "duration_str")]
    pub interval: Duration,

    /// Maximum number of probe attempts (default: 120)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Optional wall-clock cap on the whole wait
    #[serde(
        default,
        with = "option_duration_str",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_duration: Option<Duration>,

    /// Timeout of a single probe request (default: 10s)
    #[serde(default = "default_probe_timeout", with = "duration_str")]
    pub probe_timeout: Duration,
}

/// Failure diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Number of backend log lines shown when startup fails (default: 40)
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

/// A best-effort command run before the backend starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// Display name used in logs
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Total attempts including the first (default: 1)
    #[serde(default = "default_hook_attempts")]
    pub attempts: u32,
    /// Base delay between attempts; attempt n waits n * retry_delay
    #[serde(default = "default_hook_retry_delay", with = "duration_str")]
    pub retry_delay: Duration,
}

fn default_version() -> u32 {
    1
}

fn default_backend_program() -> String {
    "python3".to_string()
}

fn default_backend_args() -> Vec<String> {
    [
        "main.py",
        "--listen",
        "{host}",
        "--port",
        "{port}",
        "--input-directory",
        "{input_dir}",
        "--output-directory",
        "{output_dir}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/workspace/ComfyUI")
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

fn default_backend_port() -> u16 {
    8188
}

fn default_status_path() -> String {
    "system_stats".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/tmp/bootgate-backend.log")
}

fn default_worker_program() -> String {
    "python3".to_string()
}

fn default_worker_args() -> Vec<String> {
    vec!["-u".to_string(), "handler.py".to_string()]
}

fn default_storage_candidates() -> Vec<PathBuf> {
    vec![PathBuf::from("/runpod-volume")]
}

fn default_storage_mappings() -> Vec<StorageMappingConfig> {
    ["models", "input", "output"]
        .into_iter()
        .map(|name| StorageMappingConfig {
            source: PathBuf::from(name),
            subdir: PathBuf::from(name),
        })
        .collect()
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    120
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_tail_lines() -> usize {
    40
}

fn default_hook_attempts() -> u32 {
    1
}

fn default_hook_retry_delay() -> Duration {
    Duration::from_secs(3)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            backend: BackendConfig::default(),
            worker: WorkerConfig::default(),
            storage: StorageConfig::default(),
            readiness: ReadinessConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            prestart: Vec::new(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: default_backend_program(),
            args: default_backend_args(),
            working_dir: default_working_dir(),
            host: default_backend_host(),
            port: default_backend_port(),
            status_path: default_status_path(),
            input_dir: None,
            output_dir: None,
            log_file: default_log_file(),
            env: BTreeMap::new(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: default_worker_program(),
            args: default_worker_args(),
            port: None,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            candidates: default_storage_candidates(),
            mappings: default_storage_mappings(),
            required: false,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_attempts: default_max_attempts(),
            max_duration: None,
            probe_timeout: default_probe_timeout(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendConfig {
    pub fn input_dir(&self) -> PathBuf {
        self.input_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.join("input"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.join("output"))
    }

    /// Base URL the worker should use to reach the backend
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", url_host(probe_host(&self.host)), self.port)
    }
}

impl StorageMappingConfig {
    /// Absolute source path, resolving relative sources against `working_dir`
    pub fn resolved_source(&self, working_dir: &Path) -> PathBuf {
        if self.source.is_absolute() {
            self.source.clone()
        } else {
            working_dir.join(&self.source)
        }
    }
}

/// Check whether a bind host listens on every interface
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::" | "[::]")
}

/// Map a bind host to an address that can be connected to locally
///
/// All-interfaces binds are reached through loopback.
pub fn probe_host(bind_host: &str) -> &str {
    let trimmed = bind_host.trim();
    match trimmed {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" | "[::]" => "::1",
        _ => trimmed,
    }
}

/// Bracket IPv6 literals for use inside a URL
pub fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod option_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                serializer.serialize_str(&humantime::format_duration(*duration).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|value| humantime::parse_duration(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.backend.program, "python3");
        assert_eq!(config.backend.host, "127.0.0.1");
        assert_eq!(config.backend.port, 8188);
        assert_eq!(config.backend.status_path, "system_stats");
        assert_eq!(config.readiness.interval, Duration::from_secs(1));
        assert_eq!(config.readiness.max_attempts, 120);
        assert_eq!(config.readiness.max_duration, None);
        assert_eq!(config.readiness.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.diagnostics.tail_lines, 40);
        assert!(config.storage.root.is_none());
        assert!(!config.storage.required);
        assert!(config.prestart.is_empty());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let json = r#"{"version": 1}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_deserialize_human_durations() {
        let json = r#"{
            "readiness": {"interval": "250ms", "max_attempts": 8, "max_duration": "2m"},
            "prestart": [{"name": "nodes", "program": "python3", "attempts": 3, "retry_delay": "2s"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.readiness.interval, Duration::from_millis(250));
        assert_eq!(config.readiness.max_attempts, 8);
        assert_eq!(config.readiness.max_duration, Some(Duration::from_secs(120)));
        assert_eq!(config.readiness.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.prestart[0].attempts, 3);
        assert_eq!(config.prestart[0].retry_delay, Duration::from_secs(2));
        assert!(config.prestart[0].args.is_empty());
    }

    #[test]
    fn test_reject_bad_duration() {
        let json = r#"{"readiness": {"interval": "soon"}}"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"version": 1, "unknown_field": "value"}"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let nested = r#"{"backend": {"prot": 9000}}"#;
        let result: Result<Config, _> = serde_json::from_str(nested);
        assert!(result.is_err());
    }

    #[test]
    fn test_directories_default_under_working_dir() {
        let mut backend = BackendConfig::default();
        backend.working_dir = PathBuf::from("/srv/engine");
        assert_eq!(backend.input_dir(), PathBuf::from("/srv/engine/input"));
        assert_eq!(backend.output_dir(), PathBuf::from("/srv/engine/output"));

        backend.output_dir = Some(PathBuf::from("/data/out"));
        assert_eq!(backend.output_dir(), PathBuf::from("/data/out"));
    }

    #[test]
    fn test_mapping_sources_resolve_against_working_dir() {
        let working_dir = Path::new("/srv/engine");
        let relative = StorageMappingConfig {
            source: PathBuf::from("models"),
            subdir: PathBuf::from("models"),
        };
        let absolute = StorageMappingConfig {
            source: PathBuf::from("/opt/cache"),
            subdir: PathBuf::from("cache"),
        };
        assert_eq!(
            relative.resolved_source(working_dir),
            PathBuf::from("/srv/engine/models")
        );
        assert_eq!(
            absolute.resolved_source(working_dir),
            PathBuf::from("/opt/cache")
        );
    }

    #[test]
    fn test_probe_host_uses_loopback_for_wildcard_binds() {
        assert_eq!(probe_host("0.0.0.0"), "127.0.0.1");
        assert_eq!(probe_host("::"), "::1");
        assert_eq!(probe_host("10.0.0.5"), "10.0.0.5");
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(!is_all_interfaces("127.0.0.1"));
    }

    #[test]
    fn test_base_url() {
        let mut backend = BackendConfig::default();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8188");
        backend.host = "::".to_string();
        assert_eq!(backend.base_url(), "http://[::1]:8188");
    }
}
