//! Typed job API.
//!
//! Two layers:
//! - **typed surface**: `JobPayload`, `Handler<T>` - the job name and queue
//!   are bound to the payload type at compile time
//! - **erased core**: `DynHandler` - object-safe, stored per queue in the
//!   `JobRouter`

pub mod handler;
pub mod job;
pub mod router;

pub use self::handler::{DynHandler, Handler};
pub use self::job::JobPayload;
pub use self::router::JobRouter;
