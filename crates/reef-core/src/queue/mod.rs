//! Queue internals: job state machine, backoff and the in-memory transport.

mod memory;
mod record;
mod recurring;
mod retry;
mod state;

pub use memory::{DEAD_JOBS_KEPT, InMemoryTransport};
pub use record::JobRecord;
pub use recurring::parse_cron;
pub use retry::BackoffPolicy;
pub use state::JobState;
