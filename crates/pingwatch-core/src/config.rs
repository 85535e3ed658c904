/// TOML configuration: polling parameters, enabled channels and per-channel
/// credentials. Missing sections and fields fall back to defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::MonitorSettings;
use crate::error::{Error, Result};
use crate::throttle::Channel;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_hosts: default_max_hosts(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub whatsapp: WhatsappConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            email: EmailConfig::default(),
            telegram: TelegramConfig::default(),
            sms: SmsConfig::default(),
            whatsapp: WhatsappConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            password: None,
            recipient: None,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// Twilio account used for SMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// E.164, e.g. +1234567890
    pub from_number: Option<String>,
    pub to_number: Option<String>,
}

/// WhatsApp Business Cloud API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhatsappConfig {
    /// e.g. https://graph.facebook.com/v13.0/<PHONE_NUMBER_ID>/messages
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub recipient: Option<String>,
}

fn default_poll_interval() -> u64 { crate::DEFAULT_POLL_INTERVAL_SECS }
fn default_max_hosts() -> usize { crate::DEFAULT_MAX_HOSTS }
fn default_probe_timeout() -> u64 { crate::DEFAULT_PROBE_TIMEOUT_SECS }
fn default_channels() -> Vec<Channel> { vec![Channel::Desktop] }
fn default_smtp_server() -> String { "smtp.gmail.com".to_string() }
fn default_smtp_port() -> u16 { 587 }

impl MonitorConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MonitorConfig =
            toml::from_str(&contents).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load the file, or write the defaults there first if it does not exist.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "Wrote default configuration");
        Ok(config)
    }

    /// Write the config as pretty TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let write_err = |source| Error::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(write_err)
    }

    /// An empty channel list means "desktop only"; duplicates are dropped.
    pub fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.notifications.channels.len());
        for channel in self.notifications.channels.drain(..) {
            if !seen.contains(&channel) {
                seen.push(channel);
            }
        }
        if seen.is_empty() {
            seen = default_channels();
        }
        self.notifications.channels = seen;
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitoring.poll_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "monitoring.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.monitoring.probe_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "monitoring.probe_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.monitoring.probe_timeout_secs)
    }

    /// Snapshot taken by `MonitoringCoordinator::start`.
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.monitoring.poll_interval_secs),
            max_hosts: self.monitoring.max_hosts,
            channels: self.notifications.channels.clone(),
        }
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured = |set: bool| if set { "configured" } else { "not configured" };
        let n = &self.notifications;
        let channels: Vec<&str> = n.channels.iter().map(|c| c.as_str()).collect();

        writeln!(f, "Monitoring")?;
        writeln!(f, "  Poll interval:  {}s", self.monitoring.poll_interval_secs)?;
        writeln!(f, "  Max hosts:      {}", self.monitoring.max_hosts)?;
        writeln!(f, "  Probe timeout:  {}s", self.monitoring.probe_timeout_secs)?;
        writeln!(f, "Notifications")?;
        writeln!(f, "  Channels:       {}", channels.join(", "))?;
        writeln!(
            f,
            "  Email:          {} ({}:{})",
            configured(n.email.sender.is_some() && n.email.password.is_some() && n.email.recipient.is_some()),
            n.email.smtp_server,
            n.email.smtp_port
        )?;
        writeln!(
            f,
            "  Telegram:       {}",
            configured(n.telegram.bot_token.is_some() && n.telegram.chat_id.is_some())
        )?;
        writeln!(
            f,
            "  SMS:            {}",
            configured(
                n.sms.account_sid.is_some()
                    && n.sms.auth_token.is_some()
                    && n.sms.from_number.is_some()
                    && n.sms.to_number.is_some()
            )
        )?;
        write!(
            f,
            "  WhatsApp:       {}",
            configured(n.whatsapp.api_url.is_some() && n.whatsapp.token.is_some() && n.whatsapp.recipient.is_some())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.monitoring.poll_interval_secs, 1);
        assert_eq!(config.monitoring.max_hosts, 9);
        assert_eq!(config.monitoring.probe_timeout_secs, 5);
        assert_eq!(config.notifications.channels, vec![Channel::Desktop]);
        assert_eq!(config.notifications.email.smtp_server, "smtp.gmail.com");
        assert_eq!(config.notifications.email.smtp_port, 587);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [monitoring]
            max_hosts = 2

            [notifications]
            channels = ["desktop", "telegram"]

            [notifications.telegram]
            bot_token = "123:abc"
            chat_id = "42"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitoring.max_hosts, 2);
        assert_eq!(config.monitoring.poll_interval_secs, 1);
        assert_eq!(
            config.notifications.channels,
            vec![Channel::Desktop, Channel::Telegram]
        );
        assert_eq!(config.notifications.telegram.chat_id.as_deref(), Some("42"));
        assert!(config.notifications.sms.account_sid.is_none());
    }

    #[test]
    fn test_unknown_channel_is_rejected() {
        let parsed: std::result::Result<MonitorConfig, _> =
            toml::from_str("[notifications]\nchannels = [\"pager\"]\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_normalize_channels() {
        let mut config = MonitorConfig::default();
        config.notifications.channels = vec![];
        config.normalize();
        assert_eq!(config.notifications.channels, vec![Channel::Desktop]);

        config.notifications.channels = vec![Channel::Sms, Channel::Email, Channel::Sms];
        config.normalize();
        assert_eq!(config.notifications.channels, vec![Channel::Sms, Channel::Email]);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = MonitorConfig::default();
        config.monitoring.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pingwatch.toml");

        let config = MonitorConfig::load_or_init(&path).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert!(path.exists());

        let reloaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_save_roundtrip_keeps_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pingwatch.toml");

        let mut config = MonitorConfig::default();
        config.notifications.channels = vec![Channel::Email, Channel::Whatsapp];
        config.notifications.email.sender = Some("ops@example.com".into());
        config.notifications.whatsapp.api_url =
            Some("https://graph.facebook.com/v13.0/1/messages".into());
        config.save(&path).unwrap();

        assert_eq!(MonitorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[monitoring\nmax_hosts = ").unwrap();
        assert!(matches!(MonitorConfig::load(&path), Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_settings_snapshot() {
        let mut config = MonitorConfig::default();
        config.monitoring.poll_interval_secs = 3;
        config.monitoring.max_hosts = 4;
        let settings = config.settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(3));
        assert_eq!(settings.max_hosts, 4);
        assert_eq!(settings.channels, vec![Channel::Desktop]);
    }

    #[test]
    fn test_display_hides_secrets() {
        let mut config = MonitorConfig::default();
        config.notifications.telegram.bot_token = Some("secret-token".into());
        config.notifications.telegram.chat_id = Some("1".into());
        let text = config.to_string();
        assert!(text.contains("Telegram:       configured"));
        assert!(!text.contains("secret-token"));
    }
}
