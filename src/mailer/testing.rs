/// In-process mail transports for tests
use super::{MailMessage, MailTransport};
use crate::error::{BoardError, BoardResult};
use async_trait::async_trait;
use std::sync::Mutex;

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, MailMessage)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, MailMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<MailMessage> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == address)
            .map(|(_, message)| message)
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, to: &str, message: &MailMessage) -> BoardResult<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), message.clone()));
        }
        Ok(())
    }
}

/// Configured, but every send fails
#[derive(Default)]
pub struct FailingMailer;

#[async_trait]
impl MailTransport for FailingMailer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, to: &str, _message: &MailMessage) -> BoardResult<()> {
        Err(BoardError::Delivery(format!("relay refused mail to {}", to)))
    }
}
