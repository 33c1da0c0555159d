//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **CommandEngine**: 外部プログラムを起動するエンジン
//! - **RecordingEngine**: 受け取ったバイト列を記録する開発・テスト用エンジン
//! - **ThreadScheduler**: タスクごとにスレッドを起動するスケジューラ
//!
//! 固定数ワーカーのスケジューラは `worker::WorkerPool` にあります。

pub mod command;
pub mod recording;
pub mod thread;

pub use self::command::CommandEngine;
pub use self::recording::RecordingEngine;
pub use self::thread::ThreadScheduler;
