//! email queue: one job per outbound message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::notifications::NotificationDispatch;
use crate::domain::{EmailTemplate, QueueName};
use crate::error::JobError;
use crate::typed::{Handler, JobPayload};

/// An email job: who gets it and which template renders it.
pub trait EmailJob: JobPayload {
    fn recipient(&self) -> &str;
    fn template(&self) -> EmailTemplate;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReminderEmail {
    pub to: String,
    pub customer_name: String,
    pub trip_name: String,
    /// `YYYY-MM-DD`
    pub trip_date: String,
    /// `HH:MM`, UTC
    pub trip_time: String,
    pub booking_number: String,
    pub shop_name: String,
}

impl JobPayload for BookingReminderEmail {
    const NAME: &'static str = "booking-reminder";
    const QUEUE: QueueName = QueueName::Email;
}

impl EmailJob for BookingReminderEmail {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn template(&self) -> EmailTemplate {
        EmailTemplate::BookingReminder {
            customer_name: self.customer_name.clone(),
            trip_name: self.trip_name.clone(),
            trip_date: self.trip_date.clone(),
            trip_time: self.trip_time.clone(),
            booking_number: self.booking_number.clone(),
            shop_name: self.shop_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialExpiringEmail {
    pub to: String,
    pub shop_name: String,
    pub days_left: i64,
}

impl JobPayload for TrialExpiringEmail {
    const NAME: &'static str = "trial-expiring";
    const QUEUE: QueueName = QueueName::Email;
}

impl EmailJob for TrialExpiringEmail {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn template(&self) -> EmailTemplate {
        EmailTemplate::TrialExpiring {
            shop_name: self.shop_name.clone(),
            days_left: self.days_left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReadyEmail {
    pub to: String,
    pub shop_name: String,
    pub title: String,
    pub lines: Vec<String>,
}

impl JobPayload for ReportReadyEmail {
    const NAME: &'static str = "report-ready";
    const QUEUE: QueueName = QueueName::Email;
}

impl EmailJob for ReportReadyEmail {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn template(&self) -> EmailTemplate {
        EmailTemplate::ReportReady {
            shop_name: self.shop_name.clone(),
            title: self.title.clone(),
            lines: self.lines.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeEmail {
    pub to: String,
    pub name: String,
    pub shop_name: String,
}

impl JobPayload for WelcomeEmail {
    const NAME: &'static str = "welcome";
    const QUEUE: QueueName = QueueName::Email;
}

impl EmailJob for WelcomeEmail {
    fn recipient(&self) -> &str {
        &self.to
    }

    fn template(&self) -> EmailTemplate {
        EmailTemplate::Welcome {
            name: self.name.clone(),
            shop_name: self.shop_name.clone(),
        }
    }
}

/// Renders and sends any [`EmailJob`]. A failed send is a job failure, so
/// the transport retries it with the job's backoff.
#[derive(Clone)]
pub struct EmailJobHandler {
    notifications: NotificationDispatch,
}

impl EmailJobHandler {
    pub fn new(notifications: NotificationDispatch) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl<T: EmailJob> Handler<T> for EmailJobHandler {
    async fn handle(&self, job: T) -> Result<(), JobError> {
        let to = job.recipient();
        self.notifications
            .send_template(to, &job.template())
            .await
            .into_result(to)?;
        info!(job_name = T::NAME, to, "email job sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::impls::{RecordingMailer, TextRenderer};

    fn reminder() -> BookingReminderEmail {
        BookingReminderEmail {
            to: "diver@example.test".to_string(),
            customer_name: "Ken".to_string(),
            trip_name: "Manta Point".to_string(),
            trip_date: "2026-07-02".to_string(),
            trip_time: "08:30".to_string(),
            booking_number: "BK-1042".to_string(),
            shop_name: "Blue Hole Divers".to_string(),
        }
    }

    fn handler(mailer: &RecordingMailer) -> EmailJobHandler {
        EmailJobHandler::new(NotificationDispatch::new(
            Arc::new(mailer.clone()),
            Arc::new(TextRenderer::default()),
        ))
    }

    #[test]
    fn reminder_payload_uses_camel_case() {
        let value = serde_json::to_value(reminder()).unwrap();
        assert_eq!(value["customerName"], "Ken");
        assert_eq!(value["tripTime"], "08:30");
        assert_eq!(value["bookingNumber"], "BK-1042");
    }

    #[tokio::test]
    async fn sends_rendered_template() {
        let mailer = RecordingMailer::new();
        handler(&mailer).handle(reminder()).await.unwrap();

        let sent = mailer.sent_to("diver@example.test");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Manta Point"));
        assert!(sent[0].text.contains("BK-1042"));
    }

    #[tokio::test]
    async fn failed_send_is_a_job_error() {
        let mailer = RecordingMailer::new();
        mailer.reject("diver@example.test");

        let err = handler(&mailer).handle(reminder()).await.unwrap_err();
        assert!(matches!(err, JobError::Dispatch { ref to, .. } if to == "diver@example.test"));
    }
}
