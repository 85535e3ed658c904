use async_trait::async_trait;
use pingwatch_core::config::WhatsappConfig;
use pingwatch_core::{Alert, Channel, Notifier, NotifyError};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::{rejected, required, transport};

/// WhatsApp Business Cloud API text message.
#[derive(Debug, Clone)]
pub struct WhatsappNotifier {
    config: WhatsappConfig,
    client: reqwest::Client,
}

impl WhatsappNotifier {
    pub fn new(config: WhatsappConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

fn payload(recipient: &str, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": recipient,
        "text": { "body": body },
    })
}

#[async_trait]
impl Notifier for WhatsappNotifier {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let api_url = required(Channel::Whatsapp, &self.config.api_url)?;
        let token = required(Channel::Whatsapp, &self.config.token)?;
        let recipient = required(Channel::Whatsapp, &self.config.recipient)?;

        let url = reqwest::Url::parse(&api_url).map_err(|e| NotifyError::InvalidSetting {
            channel: Channel::Whatsapp,
            detail: format!("api_url: {}", e),
        })?;

        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&payload(&recipient, &alert.message))
            .send()
            .await
            .map_err(transport)?;

        if resp.status() != StatusCode::OK {
            return Err(rejected(resp).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let value = payload("5511999999999", "Failure detected on host x");
        assert_eq!(value["messaging_product"], "whatsapp");
        assert_eq!(value["to"], "5511999999999");
        assert_eq!(value["text"]["body"], "Failure detected on host x");
    }

    #[tokio::test]
    async fn test_bad_url_is_invalid_setting() {
        let notifier = WhatsappNotifier::new(
            WhatsappConfig {
                api_url: Some("not a url".into()),
                token: Some("tok".into()),
                recipient: Some("551100000000".into()),
            },
            reqwest::Client::new(),
        );
        let err = notifier.send(&Alert::new("h", "t", "m")).await.unwrap_err();
        assert!(matches!(err, NotifyError::InvalidSetting { channel: Channel::Whatsapp, .. }));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let notifier = WhatsappNotifier::new(WhatsappConfig::default(), reqwest::Client::new());
        let err = notifier.send(&Alert::new("h", "t", "m")).await.unwrap_err();
        assert!(matches!(err, NotifyError::MissingCredentials(Channel::Whatsapp)));
    }
}
