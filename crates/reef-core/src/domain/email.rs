use serde::{Deserialize, Serialize};

/// Every email the background jobs can send, with the data its template
/// needs. Turning one into subject/html/text is the renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum EmailTemplate {
    BookingReminder {
        customer_name: String,
        trip_name: String,
        trip_date: String,
        trip_time: String,
        booking_number: String,
        shop_name: String,
    },
    TrialExpiring {
        shop_name: String,
        days_left: i64,
    },
    ReportReady {
        shop_name: String,
        title: String,
        lines: Vec<String>,
    },
    Welcome {
        name: String,
        shop_name: String,
    },
    /// First inactivity notice ("we miss you").
    InactivityWarning {
        owner_name: String,
        shop_name: String,
        days_inactive: i64,
    },
    /// Second inactivity notice, sent before the soft delete.
    InactivityFinalNotice {
        owner_name: String,
        shop_name: String,
        days_remaining: i64,
    },
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::BookingReminder { .. } => "booking-reminder",
            EmailTemplate::TrialExpiring { .. } => "trial-expiring",
            EmailTemplate::ReportReady { .. } => "report-ready",
            EmailTemplate::Welcome { .. } => "welcome",
            EmailTemplate::InactivityWarning { .. } => "inactivity-warning",
            EmailTemplate::InactivityFinalNotice { .. } => "inactivity-final-notice",
        }
    }
}

/// Output of the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// A message ready for the mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, rendered: RenderedEmail) -> Self {
        Self {
            to: to.into(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        }
    }
}
