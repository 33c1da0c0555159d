//! ThreadScheduler - タスクごとに専用の OS スレッドを起動する
//!
//! プールを持たず、submit のたびに名前付きスレッドを 1 本立てて `run()` を
//! 呼びます。エンジンの panic はスレッド内で捕まえて `Panicked` として返します。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::errors::SchedulerError;
use crate::ports::{Clock, IdGenerator, Scheduler, SystemClock, TaskHandle, UlidGenerator};
use crate::task::{Runnable, panic_message, run_recorded};

pub struct ThreadScheduler {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self { clock, ids }
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for ThreadScheduler {
    async fn submit(&self, task: Box<dyn Runnable>) -> Result<TaskHandle, SchedulerError> {
        let task_id = task.id();
        let (tx, handle) = TaskHandle::channel(task_id);
        let clock = Arc::clone(&self.clock);
        let ids = Arc::clone(&self.ids);

        std::thread::Builder::new()
            .name(format!("snaprun-{task_id}"))
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    run_recorded(task.as_ref(), clock.as_ref(), ids.as_ref())
                }));
                let delivered = match result {
                    Ok(completion) => Ok(completion),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(%task_id, %message, "task panicked");
                        Err(SchedulerError::Panicked { task_id, message })
                    }
                };
                // receiver may already be gone
                let _ = tx.send(delivered);
            })
            .map_err(SchedulerError::Spawn)?;

        debug!(%task_id, "task thread started");
        Ok(handle)
    }
}
