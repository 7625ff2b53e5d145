//! App - アプリケーション層
//!
//! ports を組み合わせて job system を組み立てる。
//!
//! # 主要コンポーネント
//! - **JobSystemBuilder** / **JobSystem**: 構築 (fail-fast 検証) と実行
//! - **WorkerPool**: queue ごとの bounded-concurrency consumer
//! - **Scheduler**: recurring job の登録
//! - **TenantLifecycleScanner**: 非アクティブ tenant の警告と soft delete
//! - **NotificationDispatch**: メール送信の成否を返す
//! - **handlers**: queue ごとの payload と handler

pub mod assembly;
pub mod builder;
pub mod handlers;
pub mod job_system;
pub mod lifecycle_scanner;
pub mod notifications;
pub mod producer;
pub mod scheduler;
pub mod worker_pool;

pub use self::assembly::{Collaborators, assemble};
pub use self::builder::JobSystemBuilder;
pub use self::job_system::JobSystem;
pub use self::lifecycle_scanner::{ScanReport, TenantFailure, TenantLifecycleScanner};
pub use self::notifications::{DispatchResult, NotificationDispatch};
pub use self::producer::JobProducer;
pub use self::scheduler::{RecurringJob, Scheduler, standard_schedule};
pub use self::worker_pool::WorkerPool;
