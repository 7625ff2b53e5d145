//! Impls - 開発用・テスト用の port 実装
//!
//! - **InMemoryDataStore**: tenant / booking / maintenance / report store
//! - **LogMailer**, **RecordingMailer**: mail transport
//! - **TextRenderer**: email renderer
//!
//! queue transport の in-memory 実装は `queue` モジュールにある。

pub mod mailer;
pub mod memory_store;
pub mod renderer;

pub use self::mailer::{LogMailer, RecordingMailer};
pub use self::memory_store::InMemoryDataStore;
pub use self::renderer::TextRenderer;
