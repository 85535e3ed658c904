//! Notification providers for pingwatch.
//!
//! One `Notifier` per channel. Credentials come from the `[notifications]`
//! section of the config and are checked on every send, so a channel with
//! missing settings fails on its own without affecting the others.

pub mod desktop;
pub mod email;
pub mod sms;
pub mod telegram;
pub mod whatsapp;

use std::sync::Arc;
use std::time::Duration;

use pingwatch_core::config::NotificationConfig;
use pingwatch_core::{Channel, Clock, NotificationDispatcher, Notifier, NotifyError};

pub use desktop::DesktopNotifier;
pub use email::EmailNotifier;
pub use sms::SmsNotifier;
pub use telegram::TelegramNotifier;
pub use whatsapp::WhatsappNotifier;

/// Upper bound on any single provider request.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// One notifier for every channel, built from the configured credentials.
pub fn notifiers_from_config(config: &NotificationConfig) -> Vec<Arc<dyn Notifier>> {
    let client = http_client();
    vec![
        Arc::new(DesktopNotifier::new()),
        Arc::new(EmailNotifier::new(config.email.clone())),
        Arc::new(TelegramNotifier::new(config.telegram.clone(), client.clone())),
        Arc::new(SmsNotifier::new(config.sms.clone(), client.clone())),
        Arc::new(WhatsappNotifier::new(config.whatsapp.clone(), client)),
    ]
}

pub fn dispatcher_from_config(config: &NotificationConfig, clock: Arc<dyn Clock>) -> NotificationDispatcher {
    let mut dispatcher = NotificationDispatcher::new(clock);
    for notifier in notifiers_from_config(config) {
        dispatcher.register(notifier);
    }
    dispatcher
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Blank values count as missing.
pub(crate) fn required(channel: Channel, value: &Option<String>) -> Result<String, NotifyError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(NotifyError::MissingCredentials(channel)),
    }
}

pub(crate) fn transport<E>(e: E) -> NotifyError
where
    E: std::error::Error + Send + Sync + 'static,
{
    NotifyError::Transport(Box::new(e))
}

/// Turn a non-accepted response into `NotifyError::Rejected`, keeping a
/// bounded slice of the body for the log.
pub(crate) async fn rejected(resp: reqwest::Response) -> NotifyError {
    let status = resp.status().as_u16();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > 512 {
        let mut cut = 512;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    NotifyError::Rejected { status, body }
}
