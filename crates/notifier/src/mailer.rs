//! Mail transport trait and implementations.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{MailMessage, NotifyError, Result};

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Mailer that writes each message to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to_email,
            subject = %message.subject,
            body = %message.text_body(),
            "mail sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    sent: Vec<MailMessage>,
    fail: bool,
    failures_left: u32,
    attempts: u32,
}

/// In-memory mailer for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mailer to fail every send until reset.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Configures the mailer to fail the next `count` sends.
    pub async fn fail_next(&self, count: u32) {
        self.state.write().await.failures_left = count;
    }

    /// Returns every message delivered so far.
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.state.read().await.sent.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.state.read().await.sent.len()
    }

    /// Returns the number of send calls, successful or not.
    pub async fn attempts(&self) -> u32 {
        self.state.read().await.attempts
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let mut state = self.state.write().await;
        state.attempts += 1;

        if state.fail {
            return Err(NotifyError::Delivery("SMTP unavailable".to_string()));
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(NotifyError::Delivery("SMTP unavailable".to_string()));
        }

        state.sent.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            to_email: "ana@example.com".to_string(),
            to_name: "Ana".to_string(),
            subject: "Your travel order was approved".to_string(),
            greeting: "Hello, Ana".to_string(),
            intro: vec![],
            action: None,
            outro: vec![],
        }
    }

    #[tokio::test]
    async fn test_captures_sent_messages() {
        let mailer = InMemoryMailer::new();

        mailer.send(&message()).await.unwrap();

        assert_eq!(mailer.sent().await, vec![message()]);
        assert_eq!(mailer.attempts().await, 1);
    }

    #[tokio::test]
    async fn test_set_fail_rejects_every_send() {
        let mailer = InMemoryMailer::new();
        mailer.set_fail(true).await;

        assert!(matches!(
            mailer.send(&message()).await,
            Err(NotifyError::Delivery(_))
        ));
        assert_eq!(mailer.sent_count().await, 0);

        mailer.set_fail(false).await;
        mailer.send(&message()).await.unwrap();
        assert_eq!(mailer.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_fail_next_recovers_after_count() {
        let mailer = InMemoryMailer::new();
        mailer.fail_next(2).await;

        assert!(mailer.send(&message()).await.is_err());
        assert!(mailer.send(&message()).await.is_err());
        assert!(mailer.send(&message()).await.is_ok());
        assert_eq!(mailer.attempts().await, 3);
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        assert!(LogMailer.send(&message()).await.is_ok());
    }
}
