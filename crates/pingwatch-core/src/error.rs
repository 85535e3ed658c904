use std::path::PathBuf;

use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by the coordinator API and the configuration loader.
///
/// Probe failures and notification failures are not errors at this level:
/// they are recorded as statuses and dispatch outcomes.
#[derive(Debug, Error)]
pub enum Error {
    /// Monitoring is already running.
    #[error("monitoring is already running")]
    AlreadyRunning,

    /// Could not read the configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not parse the configuration file.
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Could not write the configuration file.
    #[error("failed to write config {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialize the configuration.
    #[error(transparent)]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The host is already registered.
    #[error("host {0} is already being monitored")]
    HostAlreadyMonitored(String),

    /// Configuration value out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Blank or otherwise unusable host identifier.
    #[error("invalid host identifier {0:?}")]
    InvalidHost(String),

    /// The host is not registered.
    #[error("host {0} is not being monitored")]
    UnknownHost(String),
}
