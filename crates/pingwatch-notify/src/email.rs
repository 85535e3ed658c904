use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pingwatch_core::config::EmailConfig;
use pingwatch_core::{Alert, Channel, Notifier, NotifyError};

use crate::{required, transport, SEND_TIMEOUT};

/// Subject used when the alert has no title.
pub const DEFAULT_SUBJECT: &str = "Connectivity alert";

/// Plain-text mail through an SMTP relay with STARTTLS.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn mailbox(&self, value: &str) -> Result<Mailbox, NotifyError> {
        value.parse::<Mailbox>().map_err(|e| NotifyError::InvalidSetting {
            channel: Channel::Email,
            detail: format!("address {:?}: {}", value, e),
        })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, NotifyError> {
        let sender = required(Channel::Email, &self.config.sender)?;
        let recipient = required(Channel::Email, &self.config.recipient)?;
        let subject = if alert.title.trim().is_empty() {
            DEFAULT_SUBJECT
        } else {
            alert.title.as_str()
        };

        Message::builder()
            .from(self.mailbox(&sender)?)
            .to(self.mailbox(&recipient)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(alert.message.clone())
            .map_err(transport)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let password = required(Channel::Email, &self.config.password)?;
        let message = self.build_message(alert)?;
        let sender = required(Channel::Email, &self.config.sender)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
            .map_err(transport)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(sender, password))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        mailer.send(message).await.map_err(transport)?;
        tracing::debug!(relay = %self.config.smtp_server, "Mail accepted by relay");
        Ok(())
    }
}
