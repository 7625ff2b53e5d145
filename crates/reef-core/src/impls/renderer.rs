//! Plain renderer: short text bodies with a minimal html wrapper.

use crate::domain::{EmailTemplate, RenderedEmail};
use crate::ports::{EmailRenderer, RenderError};

#[derive(Debug, Clone)]
pub struct TextRenderer {
    product: String,
}

impl TextRenderer {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
        }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new("Reef")
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl EmailRenderer for TextRenderer {
    fn render(&self, template: &EmailTemplate) -> Result<RenderedEmail, RenderError> {
        let (subject, text) = match template {
            EmailTemplate::BookingReminder {
                customer_name,
                trip_name,
                trip_date,
                trip_time,
                booking_number,
                shop_name,
            } => (
                format!("Reminder: {trip_name} on {trip_date}"),
                format!(
                    "Hi {customer_name},\n\nsee you for {trip_name} on {trip_date} at {trip_time}.\n\
                     Booking {booking_number} with {shop_name}."
                ),
            ),
            EmailTemplate::TrialExpiring {
                shop_name,
                days_left,
            } => (
                format!("Your {} trial ends in {days_left} days", self.product),
                format!(
                    "The trial for {shop_name} ends in {days_left} days. \
                     Pick a plan to keep your data."
                ),
            ),
            EmailTemplate::ReportReady {
                shop_name,
                title,
                lines,
            } => {
                if title.trim().is_empty() {
                    return Err(RenderError {
                        template: template.name(),
                        reason: "report without a title".to_string(),
                    });
                }
                (
                    format!("{shop_name}: {title}"),
                    format!("{title}\n\n{}", lines.join("\n")),
                )
            }
            EmailTemplate::Welcome { name, shop_name } => (
                format!("Welcome to {}", self.product),
                format!("Hi {name},\n\n{shop_name} is ready to take bookings."),
            ),
            EmailTemplate::InactivityWarning {
                owner_name,
                shop_name,
                days_inactive,
            } => (
                format!("We miss you at {shop_name}"),
                format!(
                    "Hi {owner_name},\n\nnobody has signed in to {shop_name} for {days_inactive} days. \
                     Inactive free accounts are removed after 90 days."
                ),
            ),
            EmailTemplate::InactivityFinalNotice {
                owner_name,
                shop_name,
                days_remaining,
            } => (
                format!("{shop_name} will be removed in {days_remaining} days"),
                format!(
                    "Hi {owner_name},\n\n{shop_name} will be removed in {days_remaining} days \
                     unless someone signs in."
                ),
            ),
        };

        let html = format!(
            "<html><body><p>{}</p></body></html>",
            escape_html(&text).replace("\n\n", "</p><p>").replace('\n', "<br>")
        );
        Ok(RenderedEmail {
            subject,
            html,
            text,
        })
    }
}
