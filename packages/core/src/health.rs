//! Health gate
//!
//! Polls a readiness probe on a bounded schedule until the backend answers,
//! the backend process exits, or the budget runs out. Liveness is checked
//! before every probe so a crashed backend is reported as such instead of
//! being waited on until the budget is exhausted.

use crate::config::ReadinessConfig;
use crate::config::schema::{BackendConfig, probe_host, url_host};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of a single readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Any 2xx response
    Healthy,
    /// Nothing is listening yet
    ConnectionRefused,
    /// The request did not complete within the probe timeout
    Timeout,
    /// The server answered with a non-2xx status
    Unhealthy(u16),
    /// Any other transport error
    Failed,
}

impl ProbeOutcome {
    pub fn is_ready(self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Healthy => write!(f, "healthy"),
            ProbeOutcome::ConnectionRefused => write!(f, "connection refused"),
            ProbeOutcome::Timeout => write!(f, "timed out"),
            ProbeOutcome::Unhealthy(code) => write!(f, "HTTP {code}"),
            ProbeOutcome::Failed => write!(f, "request failed"),
        }
    }
}

/// Answers "is the backend ready to serve?"
pub trait ReadinessProbe {
    async fn probe(&self) -> ProbeOutcome;
}

/// State of the watched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    /// Exited with the given code, `None` when killed by a signal
    Exited(Option<i32>),
}

/// Answers "is the backend process still running?"
pub trait LivenessCheck {
    fn liveness(&mut self) -> Liveness;
}

/// Polling schedule of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub max_duration: Option<Duration>,
    pub probe_timeout: Duration,
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            interval: config.interval,
            max_attempts: config.max_attempts,
            max_duration: config.max_duration,
            probe_timeout: config.probe_timeout,
        }
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

/// Gate state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Waiting,
    Ready,
    Crashed { exit_code: Option<i32> },
    TimedOut,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GateState::Waiting)
    }

    /// Move to `next` unless already terminal
    pub fn advance(self, next: GateState) -> GateState {
        if self.is_terminal() { self } else { next }
    }
}

/// Proof that the backend passed the gate
///
/// Only a [`GateReport`] in the `Ready` state can produce one.
#[derive(Debug)]
pub struct ReadyProof {
    _private: (),
}

#[cfg(test)]
impl ReadyProof {
    pub(crate) fn for_tests() -> Self {
        Self { _private: () }
    }
}

/// How the gate ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    state: GateState,
    attempts: u32,
    elapsed: Duration,
    last_probe: Option<ProbeOutcome>,
}

impl GateReport {
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Number of readiness probes performed
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Outcome of the last unsuccessful probe, if any
    pub fn last_probe(&self) -> Option<ProbeOutcome> {
        self.last_probe
    }

    pub fn ready_proof(&self) -> Option<ReadyProof> {
        (self.state == GateState::Ready).then_some(ReadyProof { _private: () })
    }
}

/// Run the gate until a terminal state is reached
///
/// Each attempt checks the budget, then liveness, then probes. The gate
/// sleeps `interval` between failed attempts and never after success. When
/// the budget runs out, liveness is checked one last time so a backend that
/// died during the final sleep is reported as crashed rather than timed out.
pub async fn wait_for_ready<P, L>(
    probe: &P,
    liveness: &mut L,
    policy: &ReadinessPolicy,
) -> GateReport
where
    P: ReadinessProbe,
    L: LivenessCheck,
{
    let start = Instant::now();
    let mut state = GateState::Waiting;
    let mut attempts = 0u32;
    let mut last_probe = None;

    while !state.is_terminal() {
        let over_budget = attempts >= policy.max_attempts
            || policy
                .max_duration
                .is_some_and(|max| start.elapsed() >= max);

        if let Liveness::Exited(exit_code) = liveness.liveness() {
            state = state.advance(GateState::Crashed { exit_code });
            continue;
        }
        if over_budget {
            state = state.advance(GateState::TimedOut);
            continue;
        }

        attempts += 1;
        let outcome = tokio::time::timeout(policy.probe_timeout, probe.probe())
            .await
            .unwrap_or(ProbeOutcome::Timeout);

        if outcome.is_ready() {
            state = state.advance(GateState::Ready);
            continue;
        }

        debug!(
            "Readiness attempt {}/{}: {}",
            attempts, policy.max_attempts, outcome
        );
        if attempts % 10 == 0 {
            info!(
                "Still waiting for backend ({} attempts, {})",
                attempts,
                humantime::format_duration(round_secs(start.elapsed()))
            );
        }
        last_probe = Some(outcome);

        if attempts < policy.max_attempts {
            tokio::time::sleep(sleep_for(policy, start.elapsed())).await;
        }
    }

    GateReport {
        state,
        attempts,
        elapsed: start.elapsed(),
        last_probe,
    }
}

/// Interval, clipped to whatever is left of the wall-clock budget
fn sleep_for(policy: &ReadinessPolicy, elapsed: Duration) -> Duration {
    match policy.max_duration {
        Some(max) => policy.interval.min(max.saturating_sub(elapsed)),
        None => policy.interval,
    }
}

fn round_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}

/// Readiness probe issuing `GET http://host:port/<status_path>`
#[derive(Debug, Clone)]
pub struct HttpReadinessProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpReadinessProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Probe for the configured backend, reaching all-interfaces binds
    /// through loopback
    pub fn for_backend(
        backend: &BackendConfig,
        readiness: &ReadinessConfig,
    ) -> Result<Self, reqwest::Error> {
        Self::new(status_url(backend), readiness.probe_timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Full URL of the backend status endpoint
pub fn status_url(backend: &BackendConfig) -> String {
    format!(
        "http://{}:{}/{}",
        url_host(probe_host(&backend.host)),
        backend.port,
        backend.status_path.trim_start_matches('/')
    )
}

impl ReadinessProbe for HttpReadinessProbe {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Healthy,
            Ok(response) => ProbeOutcome::Unhealthy(response.status().as_u16()),
            Err(e) if e.is_timeout() => ProbeOutcome::Timeout,
            Err(e) if e.is_connect() => ProbeOutcome::ConnectionRefused,
            Err(e) => {
                debug!("Readiness probe to {} failed: {}", self.url, e);
                ProbeOutcome::Failed
            }
        }
    }
}
