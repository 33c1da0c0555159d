//! Errors - エラー型
//!
//! - `EngineError`: エンジンが返す不透明な失敗。内容はエンジン側の責務で、
//!   このクレートはメッセージを書き換えずにそのまま呼び出し元へ返す
//! - `SchedulerError`: スケジューラ（WorkerPool など）側の失敗

use thiserror::Error;

use super::ids::TaskId;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a snapshot engine.
///
/// `Display` is exactly the engine's message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is shut down")]
    ShutDown,

    #[error("task {task_id} panicked: {message}")]
    Panicked { task_id: TaskId, message: String },

    #[error("failed to start a thread for the task: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("task {0} was abandoned before completion")]
    Abandoned(TaskId),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SchedulerError {
    /// The engine failure, if this error is one.
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            SchedulerError::Engine(e) => Some(e),
            _ => None,
        }
    }
}
