//! Handler trait - typed on the surface, erased for storage.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::job::JobPayload;
use crate::error::JobError;

/// Runs one job of type `T`. Returning an error reports the job as failed
/// to the transport, which then retries it per its options.
#[async_trait]
pub trait Handler<T: JobPayload>: Send + Sync {
    async fn handle(&self, job: T) -> Result<(), JobError>;
}

/// Object-safe form stored in the router.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<(), JobError>;
    fn job_name(&self) -> &'static str;
}

pub struct TypedHandler<T: JobPayload, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn(T)>,
}

impl<T: JobPayload, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: JobPayload, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<(), JobError> {
        let job: T = serde_json::from_value(payload).map_err(|source| JobError::Decode {
            job_name: T::NAME.to_string(),
            source,
        })?;
        self.handler.handle(job).await
    }

    fn job_name(&self) -> &'static str {
        T::NAME
    }
}


#[cfg(test)]
mod tests {
    use super::test_jobs::{Ping, PingHandler};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn typed_handler_decodes_and_runs() {
        let handler = TypedHandler::<Ping, _>::new(PingHandler);
        assert_eq!(handler.job_name(), "ping");
        handler.handle_dyn(json!({ "value": 100 })).await.unwrap();
    }

    #[tokio::test]
    async fn bad_payload_is_a_decode_error() {
        let handler = TypedHandler::<Ping, _>::new(PingHandler);
        let err = handler.handle_dyn(json!({ "value": "nope" })).await.unwrap_err();
        assert!(matches!(err, JobError::Decode { ref job_name, .. } if job_name == "ping"));
    }
}
