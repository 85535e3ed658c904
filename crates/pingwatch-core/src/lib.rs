pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod monitor;
pub mod probe;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use coordinator::{HostState, MonitorSettings, MonitoringCoordinator};
pub use dispatch::{Alert, DispatchOutcome, NotificationDispatcher, Notifier, NotifyError};
pub use error::{Error, Result};
pub use events::{EventSink, NotificationRecord, ProbeRecord, TracingSink};
pub use monitor::{HostMonitor, HostStatistics, ProbeStatus};
pub use probe::{Probe, ProbeResult, SystemPing};
pub use throttle::{Channel, ChannelThrottle};

/// Monitoring defaults
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_MAX_HOSTS: usize = 9;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Notification cool-downs
pub const DESKTOP_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Size of the recently-monitored hosts list
pub const HISTORY_CAPACITY: usize = 9;

/// Host probed when the operator gives nothing else
pub const FALLBACK_HOST: &str = "8.8.8.8";
