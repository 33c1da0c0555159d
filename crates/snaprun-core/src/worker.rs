use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, PoolConfig};
use crate::domain::errors::SchedulerError;
use crate::observability::PoolCounts;
use crate::ports::scheduler::CompletionSender;
use crate::ports::{Clock, IdGenerator, Scheduler, SystemClock, TaskHandle, UlidGenerator};
use crate::task::{Runnable, panic_message, run_recorded};

struct Job {
    task: Box<dyn Runnable>,
    done: CompletionSender,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    running: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn load(&self) -> PoolCounts {
        PoolCounts {
            submitted: self.submitted.load(Ordering::Relaxed),
            running: self.running.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Shared by every worker of one pool.
struct WorkerContext {
    queue: Mutex<mpsc::Receiver<Job>>,
    counters: Arc<Counters>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// Fixed-size worker pool.
/// - 各ワーカーは有界キューから 1 件ずつ取り出し、`spawn_blocking` で `run()` を呼ぶ
/// - `request_shutdown()` 以降は新しいタスクを取らない（実行中のエンジン呼び出しは止めない）
/// - `drain_and_join()` はキューに残ったタスクを実行し切ってから終わる
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawn `config.workers` workers on the current tokio runtime.
    pub fn spawn(config: &PoolConfig) -> Result<Self, ConfigError> {
        Self::spawn_with_clock(config, Arc::new(SystemClock))
    }

    pub fn spawn_with_clock(config: &PoolConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));

        let ctx = Arc::new(WorkerContext {
            queue: Mutex::new(rx),
            counters: Arc::clone(&counters),
            clock,
            ids,
        });

        let mut joins = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let ctx = Arc::clone(&ctx);
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, ctx, &mut rx).await;
            }));
        }
        info!(workers = config.workers, queue_capacity = config.queue_capacity, "worker pool started");

        Ok(Self {
            tx,
            shutdown_tx,
            joins,
            counters,
        })
    }

    pub fn counts(&self) -> PoolCounts {
        self.counters.load()
    }

    pub fn workers(&self) -> usize {
        self.joins.len()
    }

    /// Stop taking new tasks. Tasks still queued are dropped and their
    /// handles report `Abandoned`.
    ///
    /// A `submit` that races with this call may still get its task into the
    /// queue. That handle then reports `Abandoned` rather than `ShutDown`.
    pub fn request_shutdown(&self) {
        // ignore send error: workers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }

    /// Close the queue, run whatever is still in it, then wait for all workers.
    pub async fn drain_and_join(self) {
        // shutdown_tx stays alive until the workers are done, otherwise they
        // would read its drop as a stop signal
        let Self {
            tx,
            joins,
            shutdown_tx,
            ..
        } = self;
        drop(tx);
        for j in joins {
            let _ = j.await;
        }
        drop(shutdown_tx);
    }
}

#[async_trait]
impl Scheduler for WorkerPool {
    async fn submit(&self, task: Box<dyn Runnable>) -> Result<TaskHandle, SchedulerError> {
        let shut_down = *self.shutdown_tx.borrow();
        if shut_down {
            return Err(SchedulerError::ShutDown);
        }

        let task_id = task.id();
        let (done, handle) = TaskHandle::channel(task_id);

        // 有界キューなので満杯ならここで待つ
        self.tx
            .send(Job { task, done })
            .await
            .map_err(|_| SchedulerError::ShutDown)?;

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(%task_id, "task queued");
        Ok(handle)
    }
}

async fn worker_loop(worker_id: usize, ctx: Arc<WorkerContext>, shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        let shut_down = *shutdown_rx.borrow();
        if shut_down {
            break;
        }

        let job = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // pool handle dropped without shutdown
                    break;
                }
                continue;
            }
            job = async { ctx.queue.lock().await.recv().await } => job,
        };

        // queue closed and empty
        let Some(job) = job else {
            break;
        };

        execute(worker_id, &ctx, job).await;
    }
    debug!(worker_id, "worker stopped");
}

async fn execute(worker_id: usize, ctx: &WorkerContext, job: Job) {
    let Job { task, done } = job;
    let task_id = task.id();
    let counters = &ctx.counters;
    let clock = Arc::clone(&ctx.clock);
    let ids = Arc::clone(&ctx.ids);

    counters.running.fetch_add(1, Ordering::Relaxed);
    debug!(worker_id, %task_id, "task started");

    // エンジン呼び出しはブロックするので async ワーカーから切り離す
    let joined = tokio::task::spawn_blocking(move || {
        run_recorded(task.as_ref(), clock.as_ref(), ids.as_ref())
    })
    .await;

    counters.running.fetch_sub(1, Ordering::Relaxed);

    let delivered = match joined {
        Ok(completion) => {
            match &completion.result {
                Ok(()) => {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                    info!(
                        worker_id,
                        %task_id,
                        elapsed_ms = completion.outcome.elapsed_ms(),
                        "task succeeded"
                    );
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(worker_id, %task_id, error = %e, "task failed");
                }
            }
            Ok(completion)
        }
        Err(join_err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic().as_ref())
            } else {
                join_err.to_string()
            };
            error!(worker_id, %task_id, %message, "task panicked");
            Err(SchedulerError::Panicked { task_id, message })
        }
    };

    // the submitter may have dropped its handle
    let _ = done.send(delivered);
}
