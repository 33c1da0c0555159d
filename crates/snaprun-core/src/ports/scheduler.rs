//! Scheduler port - タスクを実行するスレッド/プールの抽象化
//!
//! `Runnable` を受け取り、どこかのスレッドで `run()` を一度呼び、
//! 結果を `TaskHandle` で返します。
//!
//! # 実装
//! - **WorkerPool**: 固定数のワーカー + 有界キュー
//! - **ThreadScheduler**: タスクごとに OS スレッドを起動

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::errors::{EngineError, SchedulerError};
use crate::domain::ids::TaskId;
use crate::domain::outcome::RunOutcome;
use crate::task::Runnable;

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Hand a task over for execution. Returns once the task is accepted,
    /// not once it has run.
    async fn submit(&self, task: Box<dyn Runnable>) -> Result<TaskHandle, SchedulerError>;
}

/// What a scheduler sends back after `run()` returned.
#[derive(Debug)]
pub struct Completion {
    pub outcome: RunOutcome,
    pub result: Result<(), EngineError>,
}

pub(crate) type CompletionSender = oneshot::Sender<Result<Completion, SchedulerError>>;

/// Awaitable result of one submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    rx: oneshot::Receiver<Result<Completion, SchedulerError>>,
}

impl TaskHandle {
    pub(crate) fn channel(task_id: TaskId) -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { task_id, rx })
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Wait for the task. An engine failure comes back as
    /// `SchedulerError::Engine` holding the engine's error untouched.
    pub async fn join(self) -> Result<(), SchedulerError> {
        let completion = self.completion().await?;
        completion.result.map_err(SchedulerError::Engine)
    }

    /// Wait for the task and return its recorded outcome. Engine failures
    /// are reported inside the outcome, not as `Err`.
    pub async fn join_outcome(self) -> Result<RunOutcome, SchedulerError> {
        Ok(self.completion().await?.outcome)
    }

    async fn completion(self) -> Result<Completion, SchedulerError> {
        let task_id = self.task_id;
        self.rx
            .await
            .map_err(|_| SchedulerError::Abandoned(task_id))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_sender_is_abandoned() {
        let task_id = TaskId::generate();
        let (tx, handle) = TaskHandle::channel(task_id);
        drop(tx);

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Abandoned(id) if id == task_id));
    }

    #[tokio::test]
    async fn scheduler_errors_pass_through() {
        let task_id = TaskId::generate();
        let (tx, handle) = TaskHandle::channel(task_id);
        tx.send(Err(SchedulerError::ShutDown)).unwrap();

        let err = handle.join_outcome().await.unwrap_err();
        assert!(matches!(err, SchedulerError::ShutDown));
    }
}
