/// Monitoring coordinator.
///
/// Owns the host registry and one polling task per monitored host. Every
/// task follows the same cycle: probe, record into the host's monitor
/// under the registry lock, report, notify when the host is unhealthy,
/// then sleep for the poll interval. Cancellation is only observed before
/// a probe and during the sleep, so a probe already in flight always
/// completes and gets recorded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dispatch::{Alert, NotificationDispatcher};
use crate::error::{Error, Result};
use crate::events::{EventSink, NotificationRecord, ProbeRecord};
use crate::monitor::{HostMonitor, HostStatistics};
use crate::probe::Probe;
use crate::throttle::Channel;

/// Per-host lifecycle. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    Idle,
    Polling,
    Stopped,
}

/// Values captured once when monitoring starts.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_hosts: usize,
    pub channels: Vec<Channel>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(crate::DEFAULT_POLL_INTERVAL_SECS),
            max_hosts: crate::DEFAULT_MAX_HOSTS,
            channels: vec![Channel::Desktop],
        }
    }
}

struct HostEntry {
    /// Distinguishes a re-added host from the task of its removed predecessor.
    id: u64,
    monitor: HostMonitor,
    state: HostState,
    cancel: Option<CancellationToken>,
}

struct RunHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    /// Entries moved to `Polling` by this run
    ids: Vec<u64>,
}

struct Inner {
    hosts: RwLock<Vec<HostEntry>>,
    next_id: AtomicU64,
    run: Mutex<Option<RunHandle>>,
    probe: Arc<dyn Probe>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

/// Cheap to clone; clones share the same registry and run state.
#[derive(Clone)]
pub struct MonitoringCoordinator {
    inner: Arc<Inner>,
}

impl MonitoringCoordinator {
    pub fn new(probe: Arc<dyn Probe>, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                hosts: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                run: Mutex::new(None),
                probe,
                clock,
                sink,
            }),
        }
    }

    /// Register a host in the `Idle` state.
    pub async fn add_host(&self, host: &str) -> Result<()> {
        let host = validate_host(host)?;
        {
            let mut hosts = self.inner.hosts.write().await;
            if hosts.iter().any(|e| e.monitor.host() == host) {
                return Err(Error::HostAlreadyMonitored(host.to_string()));
            }
            hosts.push(HostEntry {
                id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
                monitor: HostMonitor::new(host),
                state: HostState::Idle,
                cancel: None,
            });
        }
        self.inner.sink.host_added(host);
        info!(host = %host, "Host added");
        Ok(())
    }

    /// Cancel the host's task (if any) and drop it from the registry. Its
    /// statistics are discarded.
    pub async fn remove_host(&self, host: &str) -> Result<()> {
        let host = host.trim();
        let entry = {
            let mut hosts = self.inner.hosts.write().await;
            let idx = hosts
                .iter()
                .position(|e| e.monitor.host() == host)
                .ok_or_else(|| Error::UnknownHost(host.to_string()))?;
            hosts.remove(idx)
        };
        if let Some(cancel) = entry.cancel {
            cancel.cancel();
        }
        self.inner.sink.host_removed(host);
        info!(host = %host, "Host removed");
        Ok(())
    }

    /// Start polling. Returns how many hosts moved to `Polling`.
    pub async fn start(
        &self,
        settings: MonitorSettings,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Result<usize> {
        let mut run = self.inner.run.lock().await;
        if run.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let settings = Arc::new(settings);
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();
        let mut ids = Vec::new();

        {
            let mut hosts = self.inner.hosts.write().await;
            let eligible = hosts
                .iter_mut()
                .filter(|e| e.state == HostState::Idle)
                .take(settings.max_hosts);

            for entry in eligible {
                let token = cancel.child_token();
                entry.state = HostState::Polling;
                entry.cancel = Some(token.clone());

                let cycle = PollCycle {
                    inner: Arc::clone(&self.inner),
                    host: entry.monitor.host().to_string(),
                    id: entry.id,
                    settings: Arc::clone(&settings),
                    dispatcher: Arc::clone(&dispatcher),
                };
                tasks.push(tokio::spawn(cycle.run(token)));
                ids.push(entry.id);
            }
        }

        let started = tasks.len();
        info!(
            hosts = started,
            interval_ms = settings.poll_interval.as_millis() as u64,
            channels = ?settings.channels,
            "Monitoring started"
        );
        *run = Some(RunHandle { cancel, tasks, ids });
        Ok(started)
    }

    /// Signal every polling task and wait for all of them to exit.
    ///
    /// A probe in flight is allowed to finish; the call returns only once
    /// its result has been recorded. Returns false when nothing was running.
    ///
    /// The run lock is held until the sweep is done, so a concurrent `start`
    /// waits for this stop to finish.
    pub async fn stop(&self) -> bool {
        let mut run = self.inner.run.lock().await;
        let Some(handle) = run.take() else {
            return false;
        };

        handle.cancel.cancel();
        for task in handle.tasks {
            if let Err(e) = task.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }

        let mut hosts = self.inner.hosts.write().await;
        let stopped = hosts
            .iter_mut()
            .filter(|e| e.state == HostState::Polling && handle.ids.contains(&e.id));
        for entry in stopped {
            entry.state = HostState::Stopped;
            entry.cancel = None;
        }
        info!("Monitoring stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.inner.run.lock().await.is_some()
    }

    /// Statistics for every registered host, in registration order.
    pub async fn obtain_statistics(&self) -> Vec<HostStatistics> {
        let hosts = self.inner.hosts.read().await;
        hosts.iter().map(|e| e.monitor.statistics()).collect()
    }

    pub async fn host_state(&self, host: &str) -> Option<HostState> {
        let host = host.trim();
        let hosts = self.inner.hosts.read().await;
        hosts.iter().find(|e| e.monitor.host() == host).map(|e| e.state)
    }

    pub async fn hosts(&self) -> Vec<String> {
        let hosts = self.inner.hosts.read().await;
        hosts.iter().map(|e| e.monitor.host().to_string()).collect()
    }
}

/// Rejects identifiers that cannot be a hostname or address, including
/// anything `ping` would read as an option.
fn validate_host(host: &str) -> Result<&str> {
    let host = host.trim();
    if host.is_empty() || host.starts_with('-') || host.chars().any(char::is_whitespace) {
        return Err(Error::InvalidHost(host.to_string()));
    }
    Ok(host)
}

struct PollCycle {
    inner: Arc<Inner>,
    host: String,
    id: u64,
    settings: Arc<MonitorSettings>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl PollCycle {
    async fn run(self, cancel: CancellationToken) {
        debug!(host = %self.host, "Polling task started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = self.inner.probe.probe(&self.host).await;
            let now = self.inner.clock.now();

            let should_notify = {
                let mut hosts = self.inner.hosts.write().await;
                let Some(entry) = hosts.iter_mut().find(|e| e.id == self.id) else {
                    // Removed while probing
                    break;
                };
                entry
                    .monitor
                    .record_result(result.latency_ms, result.status.clone(), now);
                entry.monitor.should_notify()
            };

            self.inner.sink.probe_recorded(&ProbeRecord {
                timestamp: now,
                host: self.host.clone(),
                latency_ms: result.latency_ms,
                status: result.status.clone(),
            });

            if should_notify {
                let alert = Alert::host_failure(&self.host, &result.status);
                let outcomes = self.dispatcher.dispatch(&alert, &self.settings.channels).await;
                let timestamp = self.inner.clock.now();
                for (channel, outcome) in outcomes {
                    self.inner.sink.notification_outcome(&NotificationRecord {
                        timestamp,
                        host: self.host.clone(),
                        channel,
                        outcome,
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        debug!(host = %self.host, "Polling task exited");
    }
}
