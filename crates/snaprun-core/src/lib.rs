//! snaprun-core
//!
//! Run precompiled snapshots on worker threads through a pluggable engine.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Snapshot, ids, errors, outcome）
//! - **ports**: 抽象化レイヤー（SnapshotEngine, Scheduler, Clock, IdGenerator）
//! - **task**: `Runnable` と `SnapshotTask`
//! - **worker**: 固定数ワーカーの `WorkerPool`
//! - **impls**: 実装（CommandEngine, RecordingEngine, ThreadScheduler）
//! - **config** / **logging** / **observability**: 設定・ログ・カウンタ

pub mod config;
pub mod domain;
pub mod impls;
pub mod logging;
pub mod observability;
pub mod ports;
pub mod task;
pub mod worker;

pub use crate::config::{ConfigError, EngineConfig, PoolConfig, RunnerConfig};
pub use crate::domain::{EngineError, RunOutcome, RunStatus, SchedulerError, Snapshot, TaskId};
pub use crate::ports::{Scheduler, SnapshotEngine, TaskHandle};
pub use crate::task::{Runnable, SnapshotTask};
pub use crate::worker::WorkerPool;
