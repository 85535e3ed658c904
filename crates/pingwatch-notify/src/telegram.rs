use async_trait::async_trait;
use pingwatch_core::config::TelegramConfig;
use pingwatch_core::{Alert, Channel, Notifier, NotifyError};
use reqwest::StatusCode;

use crate::{rejected, required, transport};

pub const API_BASE: &str = "https://api.telegram.org";

/// Bot API `sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            api_base: API_BASE.to_string(),
        }
    }

    /// Point at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base.trim_end_matches('/'), token)
    }
}

fn form(chat_id: &str, text: &str) -> [(&'static str, String); 3] {
    [
        ("chat_id", chat_id.to_string()),
        ("text", text.to_string()),
        ("parse_mode", "HTML".to_string()),
    ]
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let token = required(Channel::Telegram, &self.config.bot_token)?;
        let chat_id = required(Channel::Telegram, &self.config.chat_id)?;

        let resp = self
            .client
            .post(self.endpoint(&token))
            .form(&form(&chat_id, &alert.message))
            .send()
            .await
            .map_err(|e| transport(e.without_url()))?;

        // Anything but 200 is a failure, including other 2xx
        if resp.status() != StatusCode::OK {
            return Err(rejected(resp).await);
        }
        Ok(())
    }
}
