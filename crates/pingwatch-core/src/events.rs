/// Records handed to the logging collaborator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchOutcome;
use crate::monitor::ProbeStatus;
use crate::throttle::Channel;

#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub latency_ms: Option<f64>,
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub channel: Channel,
    pub outcome: DispatchOutcome,
}

/// Receives everything the monitoring engine wants logged.
///
/// `host_added` / `host_removed` bracket a host's lifetime so a sink can
/// keep per-host resources (log files) in an explicit map.
pub trait EventSink: Send + Sync {
    fn host_added(&self, _host: &str) {}

    fn host_removed(&self, _host: &str) {}

    fn probe_recorded(&self, record: &ProbeRecord);

    fn notification_outcome(&self, record: &NotificationRecord);
}

/// Sink that only emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn probe_recorded(&self, record: &ProbeRecord) {
        if record.status.is_success() {
            debug!(host = %record.host, latency_ms = ?record.latency_ms, "Probe ok");
        } else {
            warn!(host = %record.host, status = %record.status, "Probe failed");
        }
    }

    fn notification_outcome(&self, record: &NotificationRecord) {
        match &record.outcome {
            DispatchOutcome::Sent => {
                info!(host = %record.host, channel = %record.channel, "Notification sent");
            }
            DispatchOutcome::Throttled { remaining_secs } => {
                debug!(
                    host = %record.host,
                    channel = %record.channel,
                    remaining_secs = *remaining_secs,
                    "Notification waiting for cool-down"
                );
            }
            DispatchOutcome::Failed { reason } => {
                warn!(
                    host = %record.host,
                    channel = %record.channel,
                    error = %reason,
                    "Notification failed"
                );
            }
        }
    }
}
