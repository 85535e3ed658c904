/// Reachability probes.
///
/// `SystemPing` shells out to the OS `ping` with a single echo request and
/// enforces its own deadline: the child is killed when the deadline passes,
/// whatever the platform's ping would have done.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::monitor::ProbeStatus;

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub latency_ms: Option<f64>,
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn success(latency_ms: f64) -> Self {
        Self {
            latency_ms: Some(latency_ms),
            status: ProbeStatus::Success,
        }
    }

    pub fn failure(status: ProbeStatus) -> Self {
        Self {
            latency_ms: None,
            status,
        }
    }
}

/// Issues a single reachability check. Implementations must return within
/// their configured timeout and must not retry.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, host: &str) -> ProbeResult;
}

/// ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct SystemPing {
    timeout: Duration,
}

impl SystemPing {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(host: &str) -> Command {
        let count_flag = if cfg!(target_os = "windows") { "-n" } else { "-c" };
        let mut cmd = Command::new("ping");
        cmd.arg(count_flag)
            .arg("1")
            .arg(host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SystemPing {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::DEFAULT_PROBE_TIMEOUT_SECS))
    }
}

#[async_trait]
impl Probe for SystemPing {
    async fn probe(&self, host: &str) -> ProbeResult {
        let started = Instant::now();
        let result = match timeout(self.timeout, Self::command(host).output()).await {
            Err(_) => ProbeResult::failure(ProbeStatus::Timeout),
            Ok(Err(e)) => ProbeResult::failure(ProbeStatus::Error(e.to_string())),
            Ok(Ok(output)) => {
                classify_output(output.status.success(), &String::from_utf8_lossy(&output.stdout))
            }
        };

        tracing::trace!(
            host = %host,
            status = %result.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Probe finished"
        );
        result
    }
}

/// Map a finished `ping` run to a probe result.
///
/// A clean exit without a readable round-trip time is treated as a timeout
/// rather than dropped.
pub fn classify_output(exit_ok: bool, stdout: &str) -> ProbeResult {
    if !exit_ok {
        return ProbeResult::failure(ProbeStatus::ConnectionFailure);
    }
    match parse_latency(stdout) {
        Some(ms) => ProbeResult::success(ms),
        None => ProbeResult::failure(ProbeStatus::Timeout),
    }
}

/// Extract the round-trip time from `ping` output.
///
/// Understands `time=12.3 ms` (Unix), `time=12ms` (Windows) and the
/// Portuguese Windows form `tempo=12ms`.
pub fn parse_latency(output: &str) -> Option<f64> {
    for marker in ["time=", "tempo="] {
        if let Some(idx) = output.find(marker) {
            let rest = &output[idx + marker.len()..];
            let value = rest.split("ms").next()?.trim();
            if let Ok(ms) = value.parse::<f64>() {
                return Some(ms);
            }
        }
    }
    None
}
