//! Mail transport and template renderer ports.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{EmailTemplate, OutboundEmail, RenderedEmail};

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),

    #[error("rejected by mail transport: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error)]
#[error("render {template}: {reason}")]
pub struct RenderError {
    pub template: &'static str,
    pub reason: String,
}

/// Outbound mail transport (SMTP relay, provider API, ...).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Turns a template plus its data into subject, html and text.
pub trait EmailRenderer: Send + Sync {
    fn render(&self, template: &EmailTemplate) -> Result<RenderedEmail, RenderError>;
}
