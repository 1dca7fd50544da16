//! Dual Executor (C4).
//!
//! Dispatches every planned task's SRC and TGT checksum SQL against two
//! independently bounded worker pools, the way `mantis::worker::client`
//! wraps a blocking RPC round trip in an async-friendly handle. Both
//! `oracle` and `postgres` are blocking drivers, so "worker pool" here
//! means a [`tokio::sync::Semaphore`] permit held for the duration of a
//! [`tokio::task::spawn_blocking`] call, not an OS thread pool of its own.
//! See `SPEC_FULL.md` §4.4 and §5.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{ChecksumResult, TaskKey};

/// How long the executor waits for in-flight work to drain after a
/// shutdown signal before giving up and reporting whatever finished.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

#[derive(Debug, Error, Clone)]
pub enum ExecutionError {
    #[error("SRC execution failed: {0}")]
    Src(String),
    #[error("TGT execution failed: {0}")]
    Tgt(String),
    #[error("shut down before this task could run")]
    Cancelled,
}

/// Which side of a task an [`ExecutionError`] (or a duration sample)
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Src,
    Tgt,
}

/// One side's checksum-producing facility. The real implementations in
/// `src/db` hold a blocking `oracle`/`postgres` connection; tests
/// substitute an in-memory fake so C4/C5 are exercised without a live
/// database.
pub trait ChecksumSource: Send + Sync {
    fn execute(&self, sql: &str) -> Result<ChecksumResult, String>;
}

/// Shared, concurrency-safe accumulator for one run's results. Built on
/// `dashmap::DashMap` rather than a `Mutex<HashMap<_>>` so SRC and TGT
/// workers never contend on the same lock for distinct task keys.
#[derive(Default)]
pub struct ExecutionReport {
    pub src_results: DashMap<TaskKey, ChecksumResult>,
    pub tgt_results: DashMap<TaskKey, ChecksumResult>,
    pub errors: DashMap<TaskKey, Vec<(Side, ExecutionError)>>,
    pub src_durations: DashMap<TaskKey, Duration>,
    pub tgt_durations: DashMap<TaskKey, Duration>,
}

impl ExecutionReport {
    fn record_error(&self, key: &TaskKey, side: Side, err: ExecutionError) {
        self.errors.entry(key.clone()).or_default().push((side, err));
    }
}

/// Run every task's SRC and TGT query against its respective bounded
/// pool, returning once all dispatched work has completed or the grace
/// period has elapsed after a shutdown signal.
///
/// `shutdown` is polled before each task is dispatched; once it reports
/// `true`, no new task is started. Tasks already running are blocking
/// calls on borrowed threads and cannot be forcibly interrupted, so the
/// grace period bounds how long this function waits for them, not
/// whether they eventually finish.
pub async fn run(
    src: Arc<dyn ChecksumSource>,
    tgt: Arc<dyn ChecksumSource>,
    tasks: Vec<crate::types::CheckTask>,
    thread_count: usize,
    shutdown: Arc<AtomicBool>,
) -> ExecutionReport {
    let report = Arc::new(ExecutionReport::default());
    let pool_size = (thread_count / 2).max(1);
    let src_permits = Arc::new(tokio::sync::Semaphore::new(pool_size));
    let tgt_permits = Arc::new(tokio::sync::Semaphore::new(pool_size));

    let mut handles = Vec::with_capacity(tasks.len() * 2);

    for task in tasks {
        if shutdown.load(Ordering::Relaxed) {
            report.record_error(&task.key, Side::Src, ExecutionError::Cancelled);
            report.record_error(&task.key, Side::Tgt, ExecutionError::Cancelled);
            continue;
        }

        handles.push(spawn_side(
            Side::Src,
            task.key.clone(),
            task.src_sql.clone(),
            Arc::clone(&src),
            Arc::clone(&src_permits),
            Arc::clone(&report),
        ));
        handles.push(spawn_side(
            Side::Tgt,
            task.key.clone(),
            task.tgt_sql.clone(),
            Arc::clone(&tgt),
            Arc::clone(&tgt_permits),
            Arc::clone(&report),
        ));
    }

    await_with_grace_period(handles, &shutdown).await;

    Arc::try_unwrap(report).unwrap_or_else(|arc| {
        // Another clone outlived the join (shouldn't happen once every
        // handle above has completed); fall back to a shallow copy.
        ExecutionReport {
            src_results: arc.src_results.clone(),
            tgt_results: arc.tgt_results.clone(),
            errors: arc.errors.clone(),
            src_durations: arc.src_durations.clone(),
            tgt_durations: arc.tgt_durations.clone(),
        }
    })
}

fn spawn_side(
    side: Side,
    key: TaskKey,
    sql: String,
    source: Arc<dyn ChecksumSource>,
    permits: Arc<tokio::sync::Semaphore>,
    report: Arc<ExecutionReport>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let _permit = permits.acquire_owned().await.expect("semaphore is never closed");
        let start = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || source.execute(&sql)).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(result)) => {
                match side {
                    Side::Src => {
                        report.src_results.insert(key.clone(), result);
                        report.src_durations.insert(key, elapsed);
                    }
                    Side::Tgt => {
                        report.tgt_results.insert(key.clone(), result);
                        report.tgt_durations.insert(key, elapsed);
                    }
                }
            }
            Ok(Err(message)) => {
                let err = match side {
                    Side::Src => ExecutionError::Src(message),
                    Side::Tgt => ExecutionError::Tgt(message),
                };
                report.record_error(&key, side, err);
            }
            Err(join_err) => {
                let message = format!("worker thread panicked: {join_err}");
                let err = match side {
                    Side::Src => ExecutionError::Src(message),
                    Side::Tgt => ExecutionError::Tgt(message),
                };
                report.record_error(&key, side, err);
            }
        }
    })
}

/// Waits for `handles` to finish, but no longer than [`SHUTDOWN_GRACE`]
/// past the moment `shutdown` first reads `true`.
async fn await_with_grace_period(handles: Vec<tokio::task::JoinHandle<()>>, shutdown: &Arc<AtomicBool>) {
    let all_done = futures::future::join_all(handles);
    tokio::pin!(all_done);

    loop {
        let watch_shutdown = wait_until_flag_set(shutdown);
        tokio::select! {
            _ = &mut all_done => return,
            _ = watch_shutdown => break,
        }
    }

    info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "shutdown requested, draining in-flight work");
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut all_done).await.is_err() {
        warn!("grace period elapsed with work still in flight; reporting partial results");
    }
}

fn wait_until_flag_set(flag: &Arc<AtomicBool>) -> impl Future<Output = ()> + '_ {
    async move {
        while !flag.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckTask;

    struct FakeSource {
        checksum: i64,
        fail: bool,
    }

    impl ChecksumSource for FakeSource {
        fn execute(&self, _sql: &str) -> Result<ChecksumResult, String> {
            if self.fail {
                return Err("simulated failure".to_string());
            }
            Ok(ChecksumResult {
                count: 10,
                checksum: self.checksum,
            })
        }
    }

    fn task(label: &str) -> CheckTask {
        CheckTask {
            key: TaskKey::custom(label),
            src_sql: format!("SRC {label}"),
            tgt_sql: format!("TGT {label}"),
        }
    }

    #[tokio::test]
    async fn matching_checksums_populate_both_sides() {
        let src = Arc::new(FakeSource { checksum: 42, fail: false });
        let tgt = Arc::new(FakeSource { checksum: 42, fail: false });
        let report = run(src, tgt, vec![task("t1")], 2, Arc::new(AtomicBool::new(false))).await;
        let key = TaskKey::custom("t1");
        assert_eq!(report.src_results.get(&key).unwrap().checksum, 42);
        assert_eq!(report.tgt_results.get(&key).unwrap().checksum, 42);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn a_src_failure_does_not_block_tgt_from_completing() {
        let src = Arc::new(FakeSource { checksum: 0, fail: true });
        let tgt = Arc::new(FakeSource { checksum: 7, fail: false });
        let report = run(src, tgt, vec![task("t1")], 2, Arc::new(AtomicBool::new(false))).await;
        let key = TaskKey::custom("t1");
        assert!(report.src_results.get(&key).is_none());
        assert_eq!(report.tgt_results.get(&key).unwrap().checksum, 7);
        assert_eq!(report.errors.get(&key).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tasks_are_isolated_from_each_other() {
        let src = Arc::new(FakeSource { checksum: 1, fail: false });
        let tgt = Arc::new(FakeSource { checksum: 1, fail: false });
        let tasks = vec![task("a"), task("b"), task("c")];
        let report = run(src, tgt, tasks, 2, Arc::new(AtomicBool::new(false))).await;
        assert_eq!(report.src_results.len(), 3);
        assert_eq!(report.tgt_results.len(), 3);
    }

    #[tokio::test]
    async fn thread_count_of_one_still_runs_both_sides_of_a_task() {
        // A single configured thread still yields a pool of size 1 per
        // engine (not zero), so SRC and TGT run concurrently even though
        // each pool serializes its own side across tasks.
        let src = Arc::new(FakeSource { checksum: 5, fail: false });
        let tgt = Arc::new(FakeSource { checksum: 5, fail: false });
        let tasks = vec![task("a"), task("b")];
        let report = run(src, tgt, tasks, 1, Arc::new(AtomicBool::new(false))).await;
        assert_eq!(report.src_results.len(), 2);
        assert_eq!(report.tgt_results.len(), 2);
    }

    #[tokio::test]
    async fn already_set_shutdown_flag_cancels_every_task() {
        let src = Arc::new(FakeSource { checksum: 1, fail: false });
        let tgt = Arc::new(FakeSource { checksum: 1, fail: false });
        let report = run(src, tgt, vec![task("t1")], 2, Arc::new(AtomicBool::new(true))).await;
        assert!(report.src_results.is_empty());
        assert_eq!(report.errors.get(&TaskKey::custom("t1")).unwrap().len(), 2);
    }
}
