/// Per-channel notification spacing.
///
/// Each channel keeps the time of its last successful send. A send is
/// allowed once the channel's minimum interval has passed; failed or
/// denied attempts leave the timestamp untouched so they never push the
/// next attempt further out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_between;

/// Notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Desktop,
    Email,
    Telegram,
    Sms,
    Whatsapp,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Desktop,
        Channel::Email,
        Channel::Telegram,
        Channel::Sms,
        Channel::Whatsapp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Desktop => "desktop",
            Channel::Email => "email",
            Channel::Telegram => "telegram",
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
        }
    }

    /// Minimum spacing between two successful sends on this channel.
    pub fn min_interval(&self) -> Duration {
        match self {
            Channel::Desktop => Duration::from_secs(crate::DESKTOP_COOLDOWN_SECS),
            _ => Duration::from_secs(crate::DEFAULT_COOLDOWN_SECS),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(Channel::Desktop),
            "email" => Ok(Channel::Email),
            "telegram" => Ok(Channel::Telegram),
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(format!("unknown notification channel '{}'", other)),
        }
    }
}

/// Throttle state for one channel.
#[derive(Debug, Clone)]
pub struct ChannelThrottle {
    min_interval: Duration,
    last_sent_at: Option<DateTime<Utc>>,
}

impl ChannelThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent_at: None,
        }
    }

    pub fn for_channel(channel: Channel) -> Self {
        Self::new(channel.min_interval())
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        self.last_sent_at
    }

    /// Whether a send may be attempted at `now`. Does not reserve anything;
    /// call `mark_sent` once the send is confirmed.
    pub fn can_send(&self, now: DateTime<Utc>) -> bool {
        match self.last_sent_at {
            None => true,
            Some(last) => elapsed_between(last, now) >= self.min_interval,
        }
    }

    /// Record a confirmed successful send.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.last_sent_at = Some(now);
    }

    /// Time left before `can_send` turns true again. Reporting only.
    pub fn remaining_cooldown(&self, now: DateTime<Utc>) -> Duration {
        match self.last_sent_at {
            None => Duration::ZERO,
            Some(last) => self.min_interval.saturating_sub(elapsed_between(last, now)),
        }
    }
}
