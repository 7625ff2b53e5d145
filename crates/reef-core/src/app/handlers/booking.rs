//! booking queue.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::email::BookingReminderEmail;
use crate::app::producer::JobProducer;
use crate::domain::{JobOptions, QueueName};
use crate::error::JobError;
use crate::ports::{BookingStore, Clock, UpcomingBooking};
use crate::typed::{Handler, JobPayload};

/// Daily reminder fan-out for trips departing tomorrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReminders {}

impl JobPayload for SendReminders {
    const NAME: &'static str = "send-reminders";
    const QUEUE: QueueName = QueueName::Booking;

    fn options() -> JobOptions {
        JobOptions::recurring()
    }
}

pub struct SendRemindersHandler {
    bookings: Arc<dyn BookingStore>,
    producer: JobProducer,
    clock: Arc<dyn Clock>,
}

impl SendRemindersHandler {
    pub fn new(bookings: Arc<dyn BookingStore>, producer: JobProducer, clock: Arc<dyn Clock>) -> Self {
        Self {
            bookings,
            producer,
            clock,
        }
    }
}

/// `[start of tomorrow, start of the day after)` in UTC.
fn tomorrow(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), JobError> {
    let start = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| JobError::Other(format!("no calendar day after {now}")))?;
    let end = start
        .checked_add_days(Days::new(1))
        .ok_or_else(|| JobError::Other(format!("no calendar day after {start}")))?;
    Ok((start, end))
}

fn reminder_for(booking: &UpcomingBooking) -> BookingReminderEmail {
    BookingReminderEmail {
        to: booking.customer_email.clone(),
        customer_name: booking.customer_name.clone(),
        trip_name: booking.trip_name.clone(),
        trip_date: booking.departs_at.format("%Y-%m-%d").to_string(),
        trip_time: booking.departs_at.format("%H:%M").to_string(),
        booking_number: booking.booking_number.clone(),
        shop_name: booking.shop_name.clone(),
    }
}

#[async_trait]
impl Handler<SendReminders> for SendRemindersHandler {
    async fn handle(&self, _job: SendReminders) -> Result<(), JobError> {
        let (from, to) = tomorrow(self.clock.now())?;
        let bookings = self
            .bookings
            .bookings_departing_between(from, to)
            .await?;

        for booking in &bookings {
            self.producer.enqueue(&reminder_for(booking)).await?;
        }

        info!(reminders = bookings.len(), day = %from.date_naive(), "booking reminders enqueued");
        Ok(())
    }
}
