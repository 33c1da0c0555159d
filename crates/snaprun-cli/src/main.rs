use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{error, info};

use snaprun_core::impls::{CommandEngine, RecordingEngine, ThreadScheduler};
use snaprun_core::logging::init_tracing;
use snaprun_core::ports::{IdGenerator, SystemClock, UlidGenerator};
use snaprun_core::{
    RunOutcome, Runnable, RunnerConfig, Scheduler, SchedulerError, Snapshot, SnapshotEngine,
    SnapshotTask, TaskId, WorkerPool,
};

const USAGE: &str = "usage: snaprun [--workers N] [--dry-run] [--threads] <snapshot>...";

#[derive(Debug, Default, PartialEq)]
struct Args {
    workers: Option<usize>,
    dry_run: bool,
    threads: bool,
    help: bool,
    snapshots: Vec<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--workers" => {
                let n = args.next().context("--workers needs a value")?;
                let n: usize = n.parse().with_context(|| format!("invalid --workers: {n}"))?;
                parsed.workers = Some(n);
            }
            "--dry-run" => parsed.dry_run = true,
            "--threads" => parsed.threads = true,
            "-h" | "--help" => {
                // 他の引数は見ない
                parsed.help = true;
                return Ok(parsed);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            path => parsed.snapshots.push(PathBuf::from(path)),
        }
    }
    if parsed.snapshots.is_empty() {
        bail!(USAGE);
    }
    Ok(parsed)
}

fn build_engine(config: &RunnerConfig, dry_run: bool) -> anyhow::Result<Arc<dyn SnapshotEngine>> {
    if dry_run {
        return Ok(Arc::new(RecordingEngine::new()));
    }
    let engine = CommandEngine::from_config(&config.engine)
        .context("no engine configured: set SNAPRUN_ENGINE or pass --dry-run")?;
    info!(program = %engine.program().display(), "using command engine");
    Ok(Arc::new(engine))
}

/// Submit every task, then wait for all of them in submission order.
async fn run_all(
    scheduler: &dyn Scheduler,
    tasks: Vec<SnapshotTask>,
) -> Vec<(TaskId, Result<RunOutcome, SchedulerError>)> {
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let task_id = task.id();
        match scheduler.submit(Box::new(task)).await {
            Ok(handle) => handles.push((task_id, Ok(handle))),
            Err(e) => handles.push((task_id, Err(e))),
        }
    }

    let mut results = Vec::with_capacity(handles.len());
    for (task_id, handle) in handles {
        let result = match handle {
            Ok(handle) => handle.join_outcome().await,
            Err(e) => Err(e),
        };
        results.push((task_id, result));
    }
    results
}

async fn run() -> anyhow::Result<ExitCode> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    }

    // .env は任意
    let _ = dotenvy::dotenv();
    let mut config = RunnerConfig::from_env().context("loading configuration")?;
    if let Some(workers) = args.workers {
        config.pool.workers = workers;
    }
    init_tracing(config.log_json);

    let engine = build_engine(&config, args.dry_run)?;
    let ids = UlidGenerator::new(SystemClock);

    let mut tasks = Vec::with_capacity(args.snapshots.len());
    for path in &args.snapshots {
        let snapshot = Snapshot::read_from(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let task = SnapshotTask::with_id(ids.generate_task_id(), snapshot, Arc::clone(&engine));
        info!(task_id = %task.id(), path = %path.display(), "loaded snapshot");
        tasks.push(task);
    }

    let results = if args.threads {
        run_all(&ThreadScheduler::new(), tasks).await
    } else {
        let pool = WorkerPool::spawn(&config.pool).context("starting worker pool")?;
        let results = run_all(&pool, tasks).await;
        info!(counts = ?pool.counts(), "all tasks finished");
        pool.shutdown_and_join().await;
        results
    };

    let mut failed = 0usize;
    for (task_id, result) in results {
        match result {
            Ok(outcome) => {
                if !outcome.is_success() {
                    failed += 1;
                }
                println!("{}", serde_json::to_string(&outcome)?);
            }
            Err(e) => {
                failed += 1;
                error!(%task_id, error = %e, "task did not complete");
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("snaprun: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_paths() {
        let parsed = parse_args(args(&["--workers", "2", "--dry-run", "a.snap", "b.snap"])).unwrap();
        assert_eq!(
            parsed,
            Args {
                workers: Some(2),
                dry_run: true,
                threads: false,
                help: false,
                snapshots: vec![PathBuf::from("a.snap"), PathBuf::from("b.snap")],
            }
        );
    }

    #[test]
    fn help_needs_no_snapshots() {
        for flag in ["--help", "-h"] {
            let parsed = parse_args(args(&[flag])).unwrap();
            assert!(parsed.help);
            assert!(parsed.snapshots.is_empty());
        }
        // help 以降の引数は読まない
        assert!(parse_args(args(&["--workers", "1", "--help", "--fast"])).unwrap().help);
    }

    #[test]
    fn requires_at_least_one_snapshot() {
        let err = parse_args(args(&["--threads"])).unwrap_err();
        assert!(err.to_string().contains("usage"));
    }

    #[test]
    fn rejects_unknown_option_and_bad_worker_count() {
        assert!(parse_args(args(&["--fast", "a.snap"])).is_err());
        assert!(parse_args(args(&["--workers", "lots", "a.snap"])).is_err());
        assert!(parse_args(args(&["a.snap", "--workers"])).is_err());
    }

    #[test]
    fn missing_engine_is_an_error_unless_dry_run() {
        let config = RunnerConfig::default();
        assert!(build_engine(&config, false).is_err());
        assert!(build_engine(&config, true).is_ok());
    }

    #[tokio::test]
    async fn run_all_reports_each_task_in_order() {
        let engine = Arc::new(RecordingEngine::new().fail_on(vec![2], "bad"));
        let tasks = vec![
            SnapshotTask::new(vec![1], engine.clone()),
            SnapshotTask::new(vec![2], engine.clone()),
        ];
        let first = tasks[0].id();

        let results = run_all(&ThreadScheduler::new(), tasks).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, first);
        assert!(results[0].1.as_ref().unwrap().is_success());
        assert_eq!(results[1].1.as_ref().unwrap().error.as_deref(), Some("bad"));
    }
}
