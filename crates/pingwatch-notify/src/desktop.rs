use async_trait::async_trait;
use pingwatch_core::{Alert, Channel, Notifier, NotifyError};

/// Name shown as the toast's application.
pub const APP_NAME: &str = "pingwatch";

/// How long the toast stays on screen, in milliseconds.
const TOAST_TIMEOUT_MS: u32 = 10_000;

/// Local desktop toast.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn channel(&self) -> Channel {
        Channel::Desktop
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let summary = if alert.title.is_empty() {
            self.app_name.clone()
        } else {
            alert.title.clone()
        };
        let body = alert.message.clone();
        let app_name = self.app_name.clone();

        // The platform backends block (D-Bus, WinRT), keep them off the runtime
        tokio::task::spawn_blocking(move || show(&app_name, &summary, &body))
            .await
            .map_err(crate::transport)?
    }
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn show(app_name: &str, summary: &str, body: &str) -> Result<(), NotifyError> {
    notify_rust::Notification::new()
        .appname(app_name)
        .summary(summary)
        .body(body)
        .timeout(notify_rust::Timeout::Milliseconds(TOAST_TIMEOUT_MS))
        .show()
        .map(|_| ())
        .map_err(crate::transport)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn show(_app_name: &str, _summary: &str, _body: &str) -> Result<(), NotifyError> {
    Err(NotifyError::InvalidSetting {
        channel: Channel::Desktop,
        detail: "desktop notifications are not supported on this platform".into(),
    })
}
