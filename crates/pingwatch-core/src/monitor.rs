/// Per-host probe history and derived statistics.
///
/// One `HostMonitor` exists per registered host. Only that host's polling
/// task writes to it; the dashboard reads it through `statistics()` while
/// holding the registry lock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_between;

/// Classification of the most recent probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeStatus {
    /// No probe has completed yet
    Starting,
    Success,
    Timeout,
    ConnectionFailure,
    Error(String),
}

impl ProbeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeStatus::Success)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Starting => write!(f, "starting"),
            ProbeStatus::Success => write!(f, "success"),
            ProbeStatus::Timeout => write!(f, "timeout"),
            ProbeStatus::ConnectionFailure => write!(f, "connection failure"),
            ProbeStatus::Error(detail) => write!(f, "error: {}", detail),
        }
    }
}

/// One recorded probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: Option<f64>,
    pub status: ProbeStatus,
}

/// Point-in-time view of a host, as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStatistics {
    pub host: String,
    pub last_latency_ms: Option<f64>,
    pub status: ProbeStatus,
    /// Mean over probes that produced a latency (0.0 when none did)
    pub mean_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub failure_count: u64,
    /// Sum of the gaps between consecutive failures
    pub total_failure_secs: f64,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HostMonitor {
    host: String,
    last_latency_ms: Option<f64>,
    status: ProbeStatus,
    history: Vec<HistoryEntry>,
    failure_count: u64,
    last_failure_at: Option<DateTime<Utc>>,
    total_failure_secs: f64,
}

impl HostMonitor {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            last_latency_ms: None,
            status: ProbeStatus::Starting,
            history: Vec::new(),
            failure_count: 0,
            last_failure_at: None,
            total_failure_secs: 0.0,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn status(&self) -> &ProbeStatus {
        &self.status
    }

    pub fn last_latency_ms(&self) -> Option<f64> {
        self.last_latency_ms
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    pub fn last_failure_at(&self) -> Option<DateTime<Utc>> {
        self.last_failure_at
    }

    pub fn total_failure_secs(&self) -> f64 {
        self.total_failure_secs
    }

    /// Record one probe result taken at `now`.
    ///
    /// A failure that follows another failure adds the gap between the two
    /// to `total_failure_secs`; a success breaks the chain. An isolated
    /// outage with a single failure event therefore adds nothing.
    pub fn record_result(&mut self, latency_ms: Option<f64>, status: ProbeStatus, now: DateTime<Utc>) {
        self.last_latency_ms = latency_ms;
        self.status = status.clone();

        let failed = !status.is_success();
        self.history.push(HistoryEntry {
            timestamp: now,
            latency_ms,
            status,
        });

        if failed {
            self.failure_count += 1;
            if let Some(previous) = self.last_failure_at {
                self.total_failure_secs += elapsed_between(previous, now).as_secs_f64();
            }
            self.last_failure_at = Some(now);
        } else {
            self.last_failure_at = None;
        }
    }

    /// Every recorded non-success is a notification candidate; throttling
    /// happens in the dispatcher.
    pub fn should_notify(&self) -> bool {
        !self.history.is_empty() && !self.status.is_success()
    }

    pub fn statistics(&self) -> HostStatistics {
        let latencies: Vec<f64> = self.history.iter().filter_map(|e| e.latency_ms).collect();

        let (mean, min, max) = if latencies.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = latencies.iter().sum();
            let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
            let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (sum / latencies.len() as f64, min, max)
        };

        HostStatistics {
            host: self.host.clone(),
            last_latency_ms: self.last_latency_ms,
            status: self.status.clone(),
            mean_latency_ms: mean,
            min_latency_ms: min,
            max_latency_ms: max,
            failure_count: self.failure_count,
            total_failure_secs: self.total_failure_secs,
            last_failure_at: self.last_failure_at,
        }
    }
}
