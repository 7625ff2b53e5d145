//! NotificationDispatch - render and send, with a definite verdict.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{EmailTemplate, OutboundEmail, RenderedEmail};
use crate::error::JobError;
use crate::ports::{EmailRenderer, Mailer};

/// Verdict of one send. `success` is only true when the mail transport
/// accepted the message; callers gate their bookkeeping on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    /// Turn a failed send into a job error so the transport retries it.
    pub fn into_result(self, to: &str) -> Result<(), JobError> {
        if self.success {
            Ok(())
        } else {
            Err(JobError::Dispatch {
                to: to.to_string(),
                reason: self.error.unwrap_or_else(|| "unknown".to_string()),
            })
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatch {
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn EmailRenderer>,
}

impl NotificationDispatch {
    pub fn new(mailer: Arc<dyn Mailer>, renderer: Arc<dyn EmailRenderer>) -> Self {
        Self { mailer, renderer }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> DispatchResult {
        let email = OutboundEmail::new(
            to,
            RenderedEmail {
                subject: subject.to_string(),
                html: html.to_string(),
                text: text.to_string(),
            },
        );
        self.deliver(&email).await
    }

    pub async fn send_template(&self, to: &str, template: &EmailTemplate) -> DispatchResult {
        let rendered = match self.renderer.render(template) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(template = template.name(), %err, "email render failed");
                return DispatchResult::failed(err.to_string());
            }
        };
        self.deliver(&OutboundEmail::new(to, rendered)).await
    }

    async fn deliver(&self, email: &OutboundEmail) -> DispatchResult {
        match self.mailer.deliver(email).await {
            Ok(()) => {
                debug!(to = %email.to, subject = %email.subject, "email sent");
                DispatchResult::sent()
            }
            Err(err) => {
                warn!(to = %email.to, subject = %email.subject, %err, "email send failed");
                DispatchResult::failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{RecordingMailer, TextRenderer};

    fn dispatch(mailer: &RecordingMailer) -> NotificationDispatch {
        NotificationDispatch::new(Arc::new(mailer.clone()), Arc::new(TextRenderer::default()))
    }

    #[tokio::test]
    async fn accepted_message_is_success() {
        let mailer = RecordingMailer::new();
        let result = dispatch(&mailer)
            .send("owner@shop.test", "Hello", "<p>hi</p>", "hi")
            .await;

        assert_eq!(result, DispatchResult::sent());
        assert_eq!(mailer.sent_to("owner@shop.test").len(), 1);
    }

    #[tokio::test]
    async fn unavailable_transport_is_a_definite_failure() {
        let mailer = RecordingMailer::new();
        mailer.set_unavailable(true);

        let result = dispatch(&mailer)
            .send_template(
                "owner@shop.test",
                &EmailTemplate::Welcome {
                    name: "Mia".to_string(),
                    shop_name: "Blue Hole Divers".to_string(),
                },
            )
            .await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(mailer.sent().is_empty());
        assert!(matches!(
            result.into_result("owner@shop.test"),
            Err(JobError::Dispatch { .. })
        ));
    }
}
