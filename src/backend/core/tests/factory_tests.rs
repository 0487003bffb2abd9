//! Tests for the scheduler registry.
//!
//! Tests cover:
//! - Process-wide singleton identity
//! - Create-or-get semantics and the concurrency argument
//! - Removal, re-creation and shutdown of removed schedulers
//! - Terminal jobs surviving scheduler removal
//! - Concurrent registry access
//! - Remote scheduler creation

mod common;

use cadence_core::error::ErrorCode;
use cadence_core::jobs::{Job, JobStatus, SchedulerConfig, SchedulerFactory};
use cadence_core::remote::{LoopbackExecutor, RemoteConfig};
use common::wait_until;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Singleton Tests
// ============================================================================

#[tokio::test]
async fn test_singleton_is_shared() {
    let a = SchedulerFactory::singleton();
    let b = SchedulerFactory::singleton();
    assert!(std::ptr::eq(a, b));

    let first = a.create_or_get_fifo_scheduler("singleton-shared").unwrap();
    let second = b.create_or_get_scheduler("singleton-shared", 4).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert!(a.remove_scheduler("singleton-shared").await);
    assert!(b.get("singleton-shared").is_none());
}

// ============================================================================
// Create-or-get Tests
// ============================================================================

#[tokio::test]
async fn test_first_concurrency_wins() {
    let factory = SchedulerFactory::default();
    let parallel = factory.create_or_get_parallel_scheduler("pool", 4).unwrap();
    let again = factory.create_or_get_fifo_scheduler("pool").unwrap();

    assert!(Arc::ptr_eq(&parallel, &again));
    assert_eq!(again.max_concurrency(), 4);
}

#[tokio::test]
async fn test_defaults_apply_to_created_schedulers() {
    let factory = SchedulerFactory::new(SchedulerConfig {
        history_size: 7,
        shutdown_timeout: Duration::from_secs(3),
        ..Default::default()
    });
    let scheduler = factory.create_or_get_scheduler("configured", 2).unwrap();

    assert_eq!(scheduler.config().history_size, 7);
    assert_eq!(scheduler.config().shutdown_timeout, Duration::from_secs(3));
    assert_eq!(scheduler.max_concurrency(), 2);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let factory = SchedulerFactory::default();
    let error = factory.create_or_get_parallel_scheduler("empty", 0).unwrap_err();

    assert_eq!(error.code(), ErrorCode::InvalidConfiguration);
    assert!(factory.is_empty());
}

#[test]
fn test_create_outside_runtime_fails() {
    let factory = SchedulerFactory::default();
    let error = factory.create_or_get_fifo_scheduler("no-runtime").unwrap_err();

    assert_eq!(error.code(), ErrorCode::NoRuntime);
    assert!(factory.get("no-runtime").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_returns_one_instance() {
    let factory = Arc::new(SchedulerFactory::default());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let factory = factory.clone();
            tokio::spawn(async move { factory.create_or_get_fifo_scheduler("raced").unwrap() })
        })
        .collect();

    let mut schedulers = Vec::new();
    for handle in handles {
        schedulers.push(handle.await.unwrap());
    }

    assert!(schedulers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(factory.len(), 1);
}

// ============================================================================
// Removal Tests
// ============================================================================

#[tokio::test]
async fn test_remove_then_recreate_gives_fresh_instance() {
    let factory = SchedulerFactory::default();
    let old = factory.create_or_get_fifo_scheduler("recycled").unwrap();

    assert!(factory.remove_scheduler("recycled").await);
    assert!(old.is_shutdown());
    assert!(!factory.remove_scheduler("recycled").await);

    let fresh = factory.create_or_get_fifo_scheduler("recycled").unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert!(!fresh.is_shutdown());

    let job = Arc::new(Job::from_fn("late", "late", |_ctx| async { Ok(()) }));
    let error = old.submit(job.clone()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::SchedulerShutdown);
    fresh.submit(job.clone()).unwrap();
    assert!(wait_until(|| job.is_terminated()).await);
}

#[tokio::test]
async fn test_removal_keeps_terminal_job_state() {
    let factory = SchedulerFactory::default();
    let scheduler = factory.create_or_get_fifo_scheduler("finished-work").unwrap();

    let job = Arc::new(Job::from_fn("done", "done", |_ctx| async {
        Ok("1000".to_string())
    }));
    scheduler.submit(job.clone()).unwrap();
    assert!(wait_until(|| job.is_terminated()).await);
    let finished_at = job.date_finished();

    assert!(factory.remove_scheduler("finished-work").await);

    assert_eq!(job.status(), JobStatus::Finished);
    assert_eq!(job.result().as_deref(), Some("1000"));
    assert_eq!(job.date_finished(), finished_at);
}

#[tokio::test]
async fn test_shutdown_all() {
    let factory = SchedulerFactory::default();
    factory.create_or_get_fifo_scheduler("b").unwrap();
    factory.create_or_get_fifo_scheduler("a").unwrap();
    factory.create_or_get_parallel_scheduler("c", 2).unwrap();

    assert_eq!(factory.names(), vec!["a", "b", "c"]);

    factory.shutdown_all().await;
    assert!(factory.is_empty());
}

// ============================================================================
// Remote Scheduler Tests
// ============================================================================

#[tokio::test]
async fn test_create_remote_scheduler() {
    let factory = SchedulerFactory::default();
    let executor = Arc::new(LoopbackExecutor::new("loopback"));
    let config = RemoteConfig {
        max_concurrency: 2,
        ..Default::default()
    };

    let remote = factory
        .create_or_get_remote_scheduler("remote", executor, config)
        .unwrap();

    assert_eq!(remote.name(), "remote");
    assert_eq!(remote.scheduler().max_concurrency(), 2);
    assert_eq!(remote.executor().name(), "loopback");
    assert!(Arc::ptr_eq(
        remote.scheduler(),
        &factory.get("remote").unwrap()
    ));
}
