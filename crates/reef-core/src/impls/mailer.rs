//! Mailer implementations for development and tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use crate::domain::OutboundEmail;
use crate::ports::{MailError, Mailer};

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "email (log only)");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Outbox {
    sent: Vec<OutboundEmail>,
    rejected: HashSet<String>,
    unavailable: bool,
}

/// Keeps accepted messages in memory. Can be told to refuse.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Outbox>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuse every message to `address` from now on.
    pub fn reject(&self, address: impl Into<String>) {
        self.outbox().rejected.insert(address.into());
    }

    pub fn accept(&self, address: &str) {
        self.outbox().rejected.remove(address);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.outbox().unavailable = unavailable;
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.outbox().sent.clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutboundEmail> {
        self.outbox()
            .sent
            .iter()
            .filter(|m| m.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let mut outbox = self.outbox();
        if outbox.unavailable {
            return Err(MailError::Unavailable("mailer switched off".to_string()));
        }
        if outbox.rejected.contains(&email.to) {
            return Err(MailError::Rejected(format!("recipient {} refused", email.to)));
        }
        outbox.sent.push(email.clone());
        Ok(())
    }
}
