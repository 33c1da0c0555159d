//! Ports - 抽象化レイヤー
//!
//! 外部のスナップショットエンジン、スケジューラ、時刻、ID 生成を trait として
//! 切り出し、本番実装とテスト用実装を差し替えられるようにします。

pub mod clock;
pub mod engine;
pub mod id_generator;
pub mod scheduler;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::engine::SnapshotEngine;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::scheduler::{Completion, Scheduler, TaskHandle};
