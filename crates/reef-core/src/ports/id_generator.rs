//! Job id generation.

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::JobId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn job_id(&self) -> JobId;
}

/// ULIDs whose timestamp part comes from the injected clock, so ids stay
/// ordered with the clock the rest of the system sees.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn job_id(&self) -> JobId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        JobId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
