/// Alert fan-out across notification channels.
///
/// The dispatcher owns one throttle per channel and a `Notifier` that does
/// the actual delivery. Channels are evaluated independently: a throttled
/// or failing channel never affects the others in the same call.
///
/// Throttle state is shared by every host. The check → send → mark
/// sequence for a channel runs under that channel's lock, so an alert for
/// one host can be held back because another host just used the channel.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::monitor::ProbeStatus;
use crate::throttle::{Channel, ChannelThrottle};

/// Notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub host: String,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(host: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            title: title.into(),
            message: message.into(),
        }
    }

    /// Alert raised by the polling loop for a failed probe.
    pub fn host_failure(host: &str, status: &ProbeStatus) -> Self {
        Self::new(
            host,
            format!("Connection alert - {}", host),
            format!("Failure detected on host {}\nStatus: {}", host, status),
        )
    }
}

/// Why a single channel could not deliver.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Credentials for the channel are not configured.
    #[error("{0} credentials are not configured")]
    MissingCredentials(Channel),

    /// A configured value could not be used (bad address, bad URL, ...).
    #[error("invalid {channel} setting: {detail}")]
    InvalidSetting { channel: Channel, detail: String },

    /// The provider answered but refused the message.
    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Network, TLS, SMTP or OS-level failure.
    #[error("{0}")]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Delivery capability for one channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Result of one channel in one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    /// Denied by the cool-down; nothing was attempted
    Throttled { remaining_secs: u64 },
    Failed { reason: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

struct ChannelSlot {
    notifier: Arc<dyn Notifier>,
    throttle: Mutex<ChannelThrottle>,
}

pub struct NotificationDispatcher {
    slots: BTreeMap<Channel, ChannelSlot>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: BTreeMap::new(),
            clock,
        }
    }

    /// Register (or replace) the notifier for its channel, using the
    /// channel's default cool-down.
    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        let channel = notifier.channel();
        self.register_with_interval(notifier, channel.min_interval());
    }

    pub fn register_with_interval(&mut self, notifier: Arc<dyn Notifier>, min_interval: Duration) {
        self.slots.insert(
            notifier.channel(),
            ChannelSlot {
                notifier,
                throttle: Mutex::new(ChannelThrottle::new(min_interval)),
            },
        );
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.register(notifier);
        self
    }

    /// Channels that have a notifier.
    pub fn channels(&self) -> Vec<Channel> {
        self.slots.keys().copied().collect()
    }

    pub fn is_available(&self, channel: Channel) -> bool {
        self.slots.contains_key(&channel)
    }

    /// Send `alert` on every requested channel that has a notifier.
    ///
    /// Unavailable channels are skipped and do not appear in the result;
    /// every other requested channel appears exactly once.
    pub async fn dispatch(&self, alert: &Alert, channels: &[Channel]) -> BTreeMap<Channel, DispatchOutcome> {
        let mut outcomes = BTreeMap::new();

        for &channel in channels {
            if outcomes.contains_key(&channel) {
                continue;
            }
            let Some(slot) = self.slots.get(&channel) else {
                tracing::debug!(channel = %channel, "No notifier configured, skipping");
                continue;
            };

            let mut throttle = slot.throttle.lock().await;
            let now = self.clock.now();
            if !throttle.can_send(now) {
                let remaining = throttle.remaining_cooldown(now);
                outcomes.insert(
                    channel,
                    DispatchOutcome::Throttled {
                        remaining_secs: whole_secs_ceil(remaining),
                    },
                );
                continue;
            }

            let outcome = match slot.notifier.send(alert).await {
                Ok(()) => {
                    throttle.mark_sent(self.clock.now());
                    DispatchOutcome::Sent
                }
                Err(e) => DispatchOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            outcomes.insert(channel, outcome);
        }

        outcomes
    }

    /// `None` when the channel has no notifier.
    pub async fn can_send(&self, channel: Channel) -> Option<bool> {
        let slot = self.slots.get(&channel)?;
        let throttle = slot.throttle.lock().await;
        Some(throttle.can_send(self.clock.now()))
    }

    pub async fn remaining_cooldown(&self, channel: Channel) -> Option<Duration> {
        let slot = self.slots.get(&channel)?;
        let throttle = slot.throttle.lock().await;
        Some(throttle.remaining_cooldown(self.clock.now()))
    }
}

/// Partial seconds count as a full second, so a throttled channel never
/// reports 0s remaining.
fn whole_secs_ceil(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeNotifier {
        channel: Channel,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeNotifier {
        fn ok(channel: Channel) -> Arc<Self> {
            Arc::new(Self { channel, fail: false, calls: AtomicUsize::new(0) })
        }

        fn failing(channel: Channel) -> Arc<Self> {
            Arc::new(Self { channel, fail: true, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(&self, _alert: &Alert) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::MissingCredentials(self.channel))
            } else {
                Ok(())
            }
        }
    }

    fn alert() -> Alert {
        Alert::host_failure("10.0.0.1", &ProbeStatus::Timeout)
    }

    #[tokio::test]
    async fn test_unavailable_channels_are_skipped() {
        let clock = Arc::new(ManualClock::at_epoch());
        let desktop = FakeNotifier::ok(Channel::Desktop);
        let dispatcher = NotificationDispatcher::new(clock).with_notifier(desktop.clone());

        let outcomes = dispatcher
            .dispatch(&alert(), &[Channel::Desktop, Channel::Sms])
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[&Channel::Desktop], DispatchOutcome::Sent);
        assert!(!outcomes.contains_key(&Channel::Sms));
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_affect_others() {
        let clock = Arc::new(ManualClock::at_epoch());
        let desktop = FakeNotifier::ok(Channel::Desktop);
        let email = FakeNotifier::failing(Channel::Email);
        let telegram = FakeNotifier::ok(Channel::Telegram);
        let dispatcher = NotificationDispatcher::new(clock)
            .with_notifier(desktop)
            .with_notifier(email)
            .with_notifier(telegram);

        let outcomes = dispatcher
            .dispatch(&alert(), &[Channel::Email, Channel::Desktop, Channel::Telegram])
            .await;

        assert!(outcomes[&Channel::Desktop].is_sent());
        assert!(outcomes[&Channel::Telegram].is_sent());
        assert!(matches!(outcomes[&Channel::Email], DispatchOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_throttled_channel_is_not_attempted() {
        let clock = Arc::new(ManualClock::at_epoch());
        let desktop = FakeNotifier::ok(Channel::Desktop);
        let dispatcher = NotificationDispatcher::new(clock.clone()).with_notifier(desktop.clone());

        assert!(dispatcher.dispatch(&alert(), &[Channel::Desktop]).await[&Channel::Desktop].is_sent());

        clock.advance(Duration::from_secs(5));
        let outcomes = dispatcher.dispatch(&alert(), &[Channel::Desktop]).await;
        assert_eq!(
            outcomes[&Channel::Desktop],
            DispatchOutcome::Throttled { remaining_secs: 5 }
        );
        assert_eq!(desktop.calls(), 1);

        clock.advance(Duration::from_secs(6));
        assert!(dispatcher.dispatch(&alert(), &[Channel::Desktop]).await[&Channel::Desktop].is_sent());
        assert_eq!(desktop.calls(), 2);
    }

    #[tokio::test]
    async fn test_partial_second_rounds_up() {
        let clock = Arc::new(ManualClock::at_epoch());
        let desktop = FakeNotifier::ok(Channel::Desktop);
        let dispatcher = NotificationDispatcher::new(clock.clone()).with_notifier(desktop);

        dispatcher.dispatch(&alert(), &[Channel::Desktop]).await;
        clock.advance(Duration::from_millis(9_100));
        let outcomes = dispatcher.dispatch(&alert(), &[Channel::Desktop]).await;
        assert_eq!(
            outcomes[&Channel::Desktop],
            DispatchOutcome::Throttled { remaining_secs: 1 }
        );
    }

    #[tokio::test]
    async fn test_failed_send_keeps_channel_open() {
        let clock = Arc::new(ManualClock::at_epoch());
        let sms = FakeNotifier::failing(Channel::Sms);
        let dispatcher = NotificationDispatcher::new(clock.clone()).with_notifier(sms.clone());

        dispatcher.dispatch(&alert(), &[Channel::Sms]).await;
        assert_eq!(dispatcher.can_send(Channel::Sms).await, Some(true));
        assert_eq!(dispatcher.remaining_cooldown(Channel::Sms).await, Some(Duration::ZERO));

        // Retried immediately on the next failure, not delayed by the first
        dispatcher.dispatch(&alert(), &[Channel::Sms]).await;
        assert_eq!(sms.calls(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_request_sends_once() {
        let clock = Arc::new(ManualClock::at_epoch());
        let desktop = FakeNotifier::ok(Channel::Desktop);
        let dispatcher = NotificationDispatcher::new(clock).with_notifier(desktop.clone());

        let outcomes = dispatcher
            .dispatch(&alert(), &[Channel::Desktop, Channel::Desktop])
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(desktop.calls(), 1);
    }

    #[tokio::test]
    async fn test_throttle_is_shared_across_hosts() {
        let clock = Arc::new(ManualClock::at_epoch());
        let email = FakeNotifier::ok(Channel::Email);
        let dispatcher = NotificationDispatcher::new(clock.clone()).with_notifier(email);

        let a = Alert::host_failure("host-a", &ProbeStatus::Timeout);
        let b = Alert::host_failure("host-b", &ProbeStatus::Timeout);
        assert!(dispatcher.dispatch(&a, &[Channel::Email]).await[&Channel::Email].is_sent());

        clock.advance(Duration::from_secs(1));
        let outcomes = dispatcher.dispatch(&b, &[Channel::Email]).await;
        assert_eq!(
            outcomes[&Channel::Email],
            DispatchOutcome::Throttled { remaining_secs: 59 }
        );
    }

    #[test]
    fn test_host_failure_alert_text() {
        let alert = Alert::host_failure("example.com", &ProbeStatus::ConnectionFailure);
        assert_eq!(alert.title, "Connection alert - example.com");
        assert!(alert.message.contains("Status: connection failure"));
    }
}
