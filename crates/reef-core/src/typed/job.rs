//! JobPayload trait - ties a payload type to its job name and queue.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{JobOptions, QueueName};

/// A typed job payload.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct SendReminders {}
///
/// impl JobPayload for SendReminders {
///     const NAME: &'static str = "send-reminders";
///     const QUEUE: QueueName = QueueName::Booking;
/// }
/// ```
///
/// The job name is the routing key inside its queue, so a typo becomes a
/// compile error instead of a silently dropped job.
pub trait JobPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
    const QUEUE: QueueName;

    /// Options used when this job is enqueued by a producer.
    fn options() -> JobOptions {
        JobOptions::one_shot()
    }
}
