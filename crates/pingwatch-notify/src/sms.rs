use async_trait::async_trait;
use pingwatch_core::config::SmsConfig;
use pingwatch_core::{Alert, Channel, Notifier, NotifyError};
use serde::Deserialize;

use crate::{rejected, required, transport};

pub const API_BASE: &str = "https://api.twilio.com";

/// SMS through Twilio's Messages resource.
#[derive(Debug, Clone)]
pub struct SmsNotifier {
    config: SmsConfig,
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

impl SmsNotifier {
    pub fn new(config: SmsConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            account_sid
        )
    }
}

/// A created message always carries a SID.
fn accepted_sid(body: &str) -> Option<String> {
    serde_json::from_str::<MessageResource>(body)
        .ok()
        .and_then(|m| m.sid)
        .filter(|sid| !sid.is_empty())
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let account_sid = required(Channel::Sms, &self.config.account_sid)?;
        let auth_token = required(Channel::Sms, &self.config.auth_token)?;
        let from = required(Channel::Sms, &self.config.from_number)?;
        let to = required(Channel::Sms, &self.config.to_number)?;

        let resp = self
            .client
            .post(self.endpoint(&account_sid))
            .basic_auth(&account_sid, Some(&auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", alert.message.as_str())])
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        match accepted_sid(&body) {
            Some(sid) => {
                tracing::debug!(sid = %sid, "SMS queued");
                Ok(())
            }
            None => Err(NotifyError::Rejected {
                status,
                body: "response carried no message SID".into(),
            }),
        }
    }
}
