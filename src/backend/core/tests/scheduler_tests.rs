//! Tests for scheduler queueing, ordering and shutdown.
//!
//! Tests cover:
//! - Running a single job through its full lifecycle
//! - Aborting a queued job behind a running one
//! - FIFO start order and the serial guarantee
//! - Bounded parallelism
//! - Submission errors (shutdown, duplicates, non-READY jobs)
//! - Failure and panic isolation
//! - Shutdown of queued and running work
//! - Event subscription, history and concurrent submit/abort

mod common;

use cadence_core::error::ErrorCode;
use cadence_core::jobs::{
    Job, JobContext, JobError, JobId, JobStatus, Scheduler, SchedulerConfig, StatusChange,
    StatusHistory,
};
use common::wait_until;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn serial(name: &str) -> Scheduler {
    Scheduler::new(name, SchedulerConfig::default()).unwrap()
}

/// Job that sleeps then returns `value`.
fn sleeping_job(id: &str, sleep: Duration, value: &str) -> Arc<Job<String>> {
    let value = value.to_string();
    Arc::new(Job::from_fn(id, id, move |_ctx| {
        let value = value.clone();
        async move {
            tokio::time::sleep(sleep).await;
            Ok(value)
        }
    }))
}

/// Job that runs until it is cancelled.
fn blocking_job(id: &str) -> Arc<Job<String>> {
    Arc::new(Job::from_fn(id, id, |ctx: JobContext<String>| async move {
        ctx.cancelled().await;
        Err(JobError::cancelled("cancelled"))
    }))
}

/// Tracks how many bodies run at once.
#[derive(Default)]
struct Concurrency {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Lifecycle Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_job_runs_to_completion() {
    let scheduler = serial("single");
    let history = StatusHistory::new();
    let job = sleeping_job("job-1", Duration::from_millis(100), "1000");
    job.add_listener(Arc::new(history.clone()));

    assert_eq!(job.status(), JobStatus::Ready);
    scheduler.submit(job.clone()).unwrap();

    assert!(wait_until(|| job.is_running()).await);
    assert!(wait_until(|| job.is_terminated()).await);

    assert_eq!(
        history.statuses_for(job.id()),
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Finished]
    );
    assert_eq!(job.status(), JobStatus::Finished);
    assert_eq!(job.result().as_deref(), Some("1000"));
    assert!(job.date_started().is_some());
    assert!(job.date_finished().is_some());
    assert_eq!(scheduler.status(job.id()), Some(JobStatus::Finished));
}

#[tokio::test]
async fn test_abort_on_pending() {
    let scheduler = serial("abort-on-pending");

    let job1 = sleeping_job("job-1", Duration::from_millis(500), "1000");

    let job2_ran = Arc::new(AtomicBool::new(false));
    let ran = job2_ran.clone();
    let job2 = Arc::new(
        Job::from_fn("job-2", "job-2", move |_ctx| {
            let ran = ran.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
                Ok("1000".to_string())
            }
        })
        .with_result("result2".to_string()),
    );

    scheduler.submit(job1.clone()).unwrap();
    scheduler.submit(job2.clone()).unwrap();

    assert!(wait_until(|| job1.is_running()).await);
    assert!(job2.is_pending());

    job2.abort().await;

    assert!(job2.is_terminated());
    assert_eq!(job2.status(), JobStatus::Abort);
    assert!(job2.date_finished().is_none());
    assert_eq!(job2.result().as_deref(), Some("result2"));
    assert_eq!(scheduler.pending_count(), 0);

    assert!(wait_until(|| job1.is_terminated()).await);
    assert_eq!(job1.status(), JobStatus::Finished);
    assert!(job1.date_finished().is_some());
    assert_eq!(job1.result().as_deref(), Some("1000"));

    // Give the dispatcher a chance to misbehave.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!job2_ran.load(Ordering::SeqCst));
    assert_eq!(job2.status(), JobStatus::Abort);
}

// ============================================================================
// Ordering and Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_serial_scheduler_is_fifo() {
    let scheduler = serial("fifo");
    let started = Arc::new(Mutex::new(Vec::new()));
    let concurrency = Arc::new(Concurrency::default());

    let jobs: Vec<Arc<Job<usize>>> = (0..6)
        .map(|i| {
            let started = started.clone();
            let concurrency = concurrency.clone();
            Arc::new(Job::from_fn(format!("job-{}", i), "ordered", move |_ctx| {
                let started = started.clone();
                let concurrency = concurrency.clone();
                async move {
                    concurrency.enter();
                    started.lock().push(i);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    concurrency.exit();
                    Ok(i)
                }
            }))
        })
        .collect();

    for job in &jobs {
        scheduler.submit(job.clone()).unwrap();
    }

    assert!(wait_until(|| jobs.iter().all(|job| job.is_terminated())).await);
    assert_eq!(*started.lock(), (0..6).collect::<Vec<_>>());
    assert_eq!(concurrency.max.load(Ordering::SeqCst), 1);
    for (i, job) in jobs.iter().enumerate() {
        assert_eq!(job.result(), Some(i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_scheduler_is_bounded() {
    let scheduler = Scheduler::new(
        "parallel",
        SchedulerConfig::default().with_max_concurrency(3),
    )
    .unwrap();
    let concurrency = Arc::new(Concurrency::default());

    let jobs: Vec<Arc<Job<()>>> = (0..9)
        .map(|i| {
            let concurrency = concurrency.clone();
            Arc::new(Job::from_fn(format!("job-{}", i), "bounded", move |_ctx| {
                let concurrency = concurrency.clone();
                async move {
                    concurrency.enter();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    concurrency.exit();
                    Ok(())
                }
            }))
        })
        .collect();

    for job in &jobs {
        scheduler.submit(job.clone()).unwrap();
    }

    assert!(wait_until(|| jobs.iter().all(|job| job.is_terminated())).await);
    let max = concurrency.max.load(Ordering::SeqCst);
    assert!(max <= 3, "ran {} jobs at once", max);
    assert!(max >= 2, "parallel scheduler never overlapped jobs");
    assert!(wait_until(|| scheduler.stats().finished == 9).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submit_and_abort_terminates_every_job() {
    let scheduler = Arc::new(serial("contended"));

    let mut handles = Vec::new();
    for i in 0..40 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            let job = sleeping_job(&format!("job-{}", i), Duration::from_millis(2), "ok");
            scheduler.submit(job.clone()).unwrap();
            if i % 3 == 0 {
                job.abort().await;
            }
            job
        }));
    }

    let mut jobs = Vec::new();
    for handle in handles {
        jobs.push(handle.await.unwrap());
    }

    assert!(wait_until(|| jobs.iter().all(|job| job.is_terminated())).await);
    for job in &jobs {
        assert!(matches!(job.status(), JobStatus::Finished | JobStatus::Abort));
    }
    assert!(
        wait_until(|| {
            let stats = scheduler.stats();
            stats.finished + stats.aborted == 40
        })
        .await
    );

    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 40);
    assert_eq!(stats.errored, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.running, 0);
}

// ============================================================================
// Submission Error Tests
// ============================================================================

#[tokio::test]
async fn test_submit_after_shutdown_fails() {
    let scheduler = serial("closed");
    scheduler.shutdown().await;

    assert!(scheduler.is_shutdown());
    let job = sleeping_job("late", Duration::from_millis(1), "x");
    let error = scheduler.submit(job.clone()).unwrap_err();

    assert_eq!(error.code(), ErrorCode::SchedulerShutdown);
    assert_eq!(job.status(), JobStatus::Ready);
}

#[tokio::test]
async fn test_duplicate_live_job_rejected() {
    let scheduler = serial("duplicates");
    let first = blocking_job("dup");
    scheduler.submit(first.clone()).unwrap();

    let second = sleeping_job("dup", Duration::from_millis(1), "x");
    let error = scheduler.submit(second.clone()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::DuplicateJob);
    assert_eq!(second.status(), JobStatus::Ready);

    first.abort().await;
    assert!(wait_until(|| first.is_terminated()).await);
    assert!(wait_until(|| scheduler.stats().aborted == 1).await);

    // Once the first one is gone the id may be reused.
    scheduler.submit(second.clone()).unwrap();
    assert!(wait_until(|| second.is_terminated()).await);
    assert_eq!(second.status(), JobStatus::Finished);
}

#[tokio::test]
async fn test_terminal_job_cannot_be_resubmitted() {
    let scheduler = serial("resubmit");
    let job = sleeping_job("once", Duration::from_millis(1), "x");
    scheduler.submit(job.clone()).unwrap();
    assert!(wait_until(|| job.is_terminated()).await);

    let error = scheduler.submit(job.clone()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn test_rejected_duplicate_leaves_live_job_alone() {
    let scheduler = Arc::new(serial("duplicate-race"));
    let blocker = blocking_job("blocker");
    scheduler.submit(blocker.clone()).unwrap();

    let live = sleeping_job("shared-id", Duration::from_millis(10), "live");
    let late = sleeping_job("shared-id", Duration::from_millis(10), "late");

    // `live` is submitted after `late` turns PENDING but before it is enqueued.
    let raced = AtomicBool::new(false);
    let racing = scheduler.clone();
    let racer = live.clone();
    late.add_listener(Arc::new(move |change: &StatusChange| {
        if change.current == JobStatus::Pending && !raced.swap(true, Ordering::SeqCst) {
            racing.submit(racer.clone()).unwrap();
        }
    }));

    let error = scheduler.submit(late.clone()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::DuplicateJob);
    assert_eq!(late.status(), JobStatus::Abort);
    assert_eq!(scheduler.status(live.id()), Some(JobStatus::Pending));
    assert_eq!(scheduler.pending_count(), 1);

    blocker.abort().await;
    assert!(wait_until(|| live.is_terminated()).await);
    assert_eq!(live.status(), JobStatus::Finished);
    assert_eq!(live.result(), Some("live".to_string()));

    assert!(wait_until(|| scheduler.stats().finished == 1).await);
    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.errored, 0);
}

// ============================================================================
// Failure Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_failures_do_not_stop_the_queue() {
    let scheduler = serial("isolation");

    let failing = Arc::new(Job::from_fn("fails", "fails", |_ctx| async {
        Err::<String, _>(JobError::failed("bad input"))
    }));
    let panicking = Arc::new(Job::from_fn("panics", "panics", |_ctx| async {
        if true {
            panic!("body exploded");
        }
        Ok::<String, JobError>(String::new())
    }));
    let healthy = sleeping_job("healthy", Duration::from_millis(1), "fine");

    scheduler.submit(failing.clone()).unwrap();
    scheduler.submit(panicking.clone()).unwrap();
    scheduler.submit(healthy.clone()).unwrap();

    assert!(wait_until(|| healthy.is_terminated()).await);

    assert_eq!(failing.status(), JobStatus::Error);
    assert_eq!(failing.error().unwrap().code, ErrorCode::JobExecutionFailed);
    assert_eq!(panicking.status(), JobStatus::Error);
    assert_eq!(panicking.error().unwrap().code, ErrorCode::JobPanicked);
    assert_eq!(healthy.status(), JobStatus::Finished);

    let stats = scheduler.stats();
    assert_eq!(stats.errored, 2);
    assert_eq!(stats.finished, 1);
}

// ============================================================================
// Control Tests
// ============================================================================

#[tokio::test]
async fn test_cancel_by_id() {
    let scheduler = serial("cancel-by-id");
    let running = blocking_job("running");
    let queued = sleeping_job("queued", Duration::from_millis(1), "x");

    scheduler.submit(running.clone()).unwrap();
    scheduler.submit(queued.clone()).unwrap();
    assert!(wait_until(|| running.is_running()).await);

    assert!(scheduler.cancel(&JobId::new("queued")).await);
    assert_eq!(queued.status(), JobStatus::Abort);

    assert!(scheduler.cancel(&JobId::new("running")).await);
    assert!(wait_until(|| running.is_terminated()).await);
    assert_eq!(running.status(), JobStatus::Abort);

    assert!(!scheduler.cancel(&JobId::new("unknown")).await);
}

#[tokio::test]
async fn test_shutdown_aborts_queued_and_running_jobs() {
    let scheduler = Scheduler::new(
        "shutdown",
        SchedulerConfig {
            shutdown_timeout: Duration::from_secs(2),
            ..Default::default()
        },
    )
    .unwrap();

    let running = blocking_job("running");
    let queued = sleeping_job("queued", Duration::from_millis(1), "x");
    scheduler.submit(running.clone()).unwrap();
    scheduler.submit(queued.clone()).unwrap();
    assert!(wait_until(|| running.is_running()).await);

    scheduler.shutdown().await;

    assert_eq!(queued.status(), JobStatus::Abort);
    assert!(queued.date_finished().is_none());
    assert_eq!(running.status(), JobStatus::Abort);
    assert!(running.date_finished().is_some());
    assert_eq!(scheduler.running_count(), 0);

    // A second shutdown is a no-op.
    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_dropping_scheduler_aborts_queued_jobs() {
    let running = sleeping_job("running", Duration::from_millis(200), "done");
    let queued = sleeping_job("queued", Duration::from_millis(1), "x");
    {
        let scheduler = serial("dropped");
        scheduler.submit(running.clone()).unwrap();
        scheduler.submit(queued.clone()).unwrap();
        assert!(wait_until(|| running.is_running()).await);
    }

    assert!(wait_until(|| queued.is_terminated()).await);
    assert_eq!(queued.status(), JobStatus::Abort);
    assert!(wait_until(|| running.is_terminated()).await);
    assert_eq!(running.status(), JobStatus::Finished);
}

// ============================================================================
// Observation Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_receives_status_changes() {
    let scheduler = serial("events");
    let mut events = scheduler.subscribe();
    let job = sleeping_job("observed", Duration::from_millis(5), "x");

    scheduler.submit(job.clone()).unwrap();

    let mut seen = Vec::new();
    while seen.last() != Some(&JobStatus::Finished) {
        let change = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for events")
            .unwrap();
        assert_eq!(change.job_id, JobId::new("observed"));
        seen.push(change.current);
    }

    assert_eq!(
        seen,
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Finished]
    );
}

#[tokio::test]
async fn test_history_is_bounded() {
    let scheduler = Scheduler::new(
        "history",
        SchedulerConfig {
            history_size: 2,
            ..Default::default()
        },
    )
    .unwrap();

    let jobs: Vec<_> = (0..4)
        .map(|i| sleeping_job(&format!("job-{}", i), Duration::from_millis(1), "x"))
        .collect();
    for job in &jobs {
        scheduler.submit(job.clone()).unwrap();
    }
    assert!(wait_until(|| jobs.iter().all(|job| job.is_terminated())).await);
    assert!(wait_until(|| scheduler.jobs().len() == 2).await);

    assert_eq!(scheduler.status(&JobId::new("job-0")), None);
    assert_eq!(
        scheduler.status(&JobId::new("job-3")),
        Some(JobStatus::Finished)
    );
    assert_eq!(scheduler.stats().submitted, 4);
}
