//! reef-core
//!
//! Background jobs and tenant lifecycle scheduling for the Reef shop backend.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, queue_name, job, tenant, lifecycle, email）
//! - **ports**: 外部との境界（QueueTransport, data stores, Mailer, EmailRenderer, Clock）
//! - **queue**: job state machine, backoff, in-memory transport
//! - **typed**: 型付き job API（JobPayload, Handler, JobRouter）
//! - **app**: JobSystem, worker pools, scheduler, lifecycle scanner, handlers
//! - **impls**: 開発・テスト用の port 実装
//! - **config** / **observability**: 設定読み込みと tracing

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod typed;

pub use app::{Collaborators, JobSystem, JobSystemBuilder, assemble};
pub use config::{LogFormat, ReefConfig};
pub use error::{BuildError, ConfigError, JobError, StoreError, TransportError};
