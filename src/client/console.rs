//! Email senders that do not talk to a provider

use async_trait::async_trait;

use super::{Email, EmailSender};
use crate::domain::EmailAddress;

/// Logs outgoing email instead of sending it (for development)
#[derive(Debug, Default)]
pub struct ConsoleEmailSender;

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, recipient: &EmailAddress, email: &Email) -> anyhow::Result<()> {
        tracing::info!(
            recipient = %recipient,
            subject = %email.subject,
            body = %email.text_body,
            "Email logged to console"
        );
        Ok(())
    }
}

/// Used when no provider is configured; every send fails
#[derive(Debug, Default)]
pub struct DisabledEmailSender;

#[async_trait]
impl EmailSender for DisabledEmailSender {
    async fn send(&self, _recipient: &EmailAddress, _email: &Email) -> anyhow::Result<()> {
        anyhow::bail!("No email provider configured")
    }
}
