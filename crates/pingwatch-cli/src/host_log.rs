/// Per-host log files.
///
/// Every host gets its own `log_<host>_<YYYYmmdd_HHMMSS>.txt` under the log
/// directory, written through a non-blocking appender so the polling tasks
/// never wait on disk.
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, Utc};
use pingwatch_core::{DispatchOutcome, EventSink, NotificationRecord, ProbeRecord};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

struct HostLog {
    writer: NonBlocking,
    path: PathBuf,
    _guard: WorkerGuard,
}

pub struct HostLogBook {
    dir: PathBuf,
    logs: Mutex<HashMap<String, HostLog>>,
}

impl HostLogBook {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            logs: Mutex::new(HashMap::new()),
        })
    }

    /// Path of the host's current log file, if one is open.
    pub fn path_for(&self, host: &str) -> Option<PathBuf> {
        let logs = self.logs.lock().ok()?;
        logs.get(host).map(|l| l.path.clone())
    }

    /// Lines for hosts without an open log (already removed) are dropped.
    fn write_line(&self, host: &str, line: &str) {
        let Ok(mut logs) = self.logs.lock() else {
            return;
        };
        let Some(log) = logs.get_mut(host) else {
            tracing::debug!(host = %host, "Dropping log line for unregistered host");
            return;
        };
        if let Err(e) = writeln!(log.writer, "{}", line) {
            tracing::warn!(host = %host, error = %e, "Failed to write host log");
        }
    }
}

fn open_log(dir: &Path, host: &str) -> HostLog {
    let file_name = log_file_name(host, Local::now());
    let appender = tracing_appender::rolling::never(dir, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing::debug!(host = %host, file = %file_name, "Opened host log");
    HostLog {
        writer,
        path: dir.join(file_name),
        _guard: guard,
    }
}

/// Characters outside `[A-Za-z0-9._-]` (IPv6 colons, mostly) become `_`.
pub fn log_file_name(host: &str, opened_at: DateTime<Local>) -> String {
    let safe: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("log_{}_{}.txt", safe, opened_at.format("%Y%m%d_%H%M%S"))
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_probe(record: &ProbeRecord) -> String {
    let latency = match record.latency_ms {
        Some(ms) => format!("{}ms", ms),
        None => "-".to_string(),
    };
    format!(
        "[{}] Host: {} - Ping: {} - Status: {}",
        stamp(record.timestamp),
        record.host,
        latency,
        record.status
    )
}

pub fn format_notification(record: &NotificationRecord) -> String {
    let detail = match &record.outcome {
        DispatchOutcome::Sent => "sent".to_string(),
        DispatchOutcome::Throttled { remaining_secs } => {
            format!("waiting ({}s remaining)", remaining_secs)
        }
        DispatchOutcome::Failed { reason } => format!("error: {}", reason),
    };
    format!(
        "[{}] Host: {} - Notification {}: {}",
        stamp(record.timestamp),
        record.host,
        record.channel,
        detail
    )
}

impl EventSink for HostLogBook {
    fn host_added(&self, host: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.entry(host.to_string())
                .or_insert_with(|| open_log(&self.dir, host));
        }
    }

    fn host_removed(&self, host: &str) {
        // Dropping the guard flushes the worker
        if let Ok(mut logs) = self.logs.lock() {
            logs.remove(host);
        }
    }

    fn probe_recorded(&self, record: &ProbeRecord) {
        self.write_line(&record.host, &format_probe(record));
    }

    fn notification_outcome(&self, record: &NotificationRecord) {
        self.write_line(&record.host, &format_notification(record));
    }
}

/// Fans every event out to several sinks.
pub struct SinkSet(pub Vec<std::sync::Arc<dyn EventSink>>);

impl EventSink for SinkSet {
    fn host_added(&self, host: &str) {
        self.0.iter().for_each(|s| s.host_added(host));
    }

    fn host_removed(&self, host: &str) {
        self.0.iter().for_each(|s| s.host_removed(host));
    }

    fn probe_recorded(&self, record: &ProbeRecord) {
        self.0.iter().for_each(|s| s.probe_recorded(record));
    }

    fn notification_outcome(&self, record: &NotificationRecord) {
        self.0.iter().for_each(|s| s.notification_outcome(record));
    }
}
