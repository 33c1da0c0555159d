//! SnapshotTask - スナップショットを 1 つ保持して、実行時にエンジンへ渡す
//!
//! # 学習ポイント
//! - `Runnable` は引数なしの 1 メソッド trait（スケジューラへ渡す単位）
//! - エンジンは `Arc<dyn SnapshotEngine>` で注入（テストでは RecordingEngine）
//! - `run()` はエンジンの結果をそのまま返す（catch も変換もしない）

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::domain::errors::EngineError;
use crate::domain::ids::TaskId;
use crate::domain::outcome::{RunOutcome, RunStatus};
use crate::domain::snapshot::Snapshot;
use crate::ports::{Clock, Completion, IdGenerator, SnapshotEngine};

/// A unit of work a scheduler can execute with no arguments.
pub trait Runnable: Send + Sync + 'static {
    fn id(&self) -> TaskId;

    /// Size of the payload this task forwards, for reporting.
    fn payload_len(&self) -> usize;

    fn run(&self) -> Result<(), EngineError>;
}

/// Holds a snapshot and forwards it to the engine when run.
///
/// Calling `run` more than once forwards the same bytes each time; what a
/// second execution means is up to the engine.
pub struct SnapshotTask {
    id: TaskId,
    snapshot: Snapshot,
    engine: Arc<dyn SnapshotEngine>,
}

impl SnapshotTask {
    pub fn new(snapshot: impl Into<Snapshot>, engine: Arc<dyn SnapshotEngine>) -> Self {
        Self::with_id(TaskId::generate(), snapshot, engine)
    }

    pub fn with_id(
        id: TaskId,
        snapshot: impl Into<Snapshot>,
        engine: Arc<dyn SnapshotEngine>,
    ) -> Self {
        Self {
            id,
            snapshot: snapshot.into(),
            engine,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Turn the task into a plain closure for APIs that take `FnOnce`.
    pub fn into_fn(self) -> impl FnOnce() -> Result<(), EngineError> + Send + 'static {
        move || self.run()
    }
}

impl Runnable for SnapshotTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn payload_len(&self) -> usize {
        self.snapshot.len()
    }

    fn run(&self) -> Result<(), EngineError> {
        trace!(task_id = %self.id, bytes = self.snapshot.len(), "running snapshot");
        self.engine.run_snapshot(self.snapshot.as_bytes())
    }
}

impl std::fmt::Debug for SnapshotTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotTask")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

/// Run a task once and record timestamps around it. The engine's result is
/// kept as-is in `Completion::result`.
pub(crate) fn run_recorded(
    task: &dyn Runnable,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
) -> Completion {
    let run_id = ids.generate_run_id();
    let started_at = clock.now();
    let result = task.run();
    let finished_at = clock.now();

    let (status, error) = match &result {
        Ok(()) => (RunStatus::Succeeded, None),
        Err(e) => (RunStatus::Failed, Some(e.to_string())),
    };

    Completion {
        outcome: RunOutcome {
            task_id: task.id(),
            run_id,
            status,
            error,
            payload_len: task.payload_len(),
            started_at,
            finished_at,
        },
        result,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
