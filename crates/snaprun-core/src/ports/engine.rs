//! SnapshotEngine port - スナップショット実行エンジンの抽象化
//!
//! エンジン本体（スナップショットを解釈する VM）はこのクレートの外にあり、
//! ここでは「バイト列を渡して実行してもらう」一点だけを定義します。
//!
//! # 実装
//! - **CommandEngine**: 外部プログラムに stdin で渡す（本番用）
//! - **RecordingEngine**: 受け取ったバイト列を記録する（テスト・dry-run 用）

use std::sync::Arc;

use crate::domain::errors::EngineError;

/// The external execution entry point.
///
/// `run_snapshot` blocks until the engine is done with the snapshot, which
/// may take arbitrarily long. Implementations receive the bytes exactly as
/// the task holds them and must not expect them to outlive the call.
pub trait SnapshotEngine: Send + Sync {
    fn run_snapshot(&self, snapshot: &[u8]) -> Result<(), EngineError>;
}

impl<E: SnapshotEngine + ?Sized> SnapshotEngine for Arc<E> {
    fn run_snapshot(&self, snapshot: &[u8]) -> Result<(), EngineError> {
        (**self).run_snapshot(snapshot)
    }
}
