use crate::gateway::{MailTransport, TemplatedGateway};
use crate::templates::Templates;
use async_trait::async_trait;
use harmony_core::{HarmonyError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email gateway that keeps every message in memory instead of sending it.
pub type RecordingEmailGateway = TemplatedGateway<RecordingMailer>;

impl TemplatedGateway<RecordingMailer> {
    pub fn recording() -> Self {
        Self::new(RecordingMailer::default(), Templates::default())
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.transport().sent()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentEmail> {
        self.transport().sent_to(address)
    }
}

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    /// Sends to `address` fail from now on.
    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().insert(address.into());
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentEmail> {
        self.sent
            .lock()
            .iter()
            .filter(|e| e.to == address)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing.lock().contains(to) {
            return Err(HarmonyError::Email(format!("mailbox unavailable: {}", to)));
        }
        self.sent.lock().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
