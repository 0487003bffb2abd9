//! Job definitions and lifecycle.
//!
//! This module provides the unit of work handled by a scheduler:
//!
//! - **JobStatus**: The lifecycle states and the transitions allowed between them
//! - **JobRunner**: The trait a job body implements (run, and an optional abort hook)
//! - **JobContext**: Handle passed to a running body for cancellation, progress and results
//! - **Job**: A runner plus its identity, dates, result slot and listeners
//! - **ScheduledJob**: Type-erased view of a job, so one queue can hold jobs of any result type
//!
//! Status is the single source of truth. Every transition is serialized per job
//! and listeners observe them in commit order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::listener::{JobListener, StatusChange};
use crate::error::{CadenceError, ErrorCode, Result};

/// Info key holding the failure message of an errored job.
pub const INFO_ERROR: &str = "error";
/// Info key holding the [`ErrorCode`] of an errored job.
pub const INFO_ERROR_CODE: &str = "error_code";
/// Info key recording whether the runner's abort hook accepted the request.
pub const INFO_ABORT_ACCEPTED: &str = "abort_accepted";
/// Info key holding the reason an abort hook failed.
pub const INFO_ABORT_ERROR: &str = "abort_error";

// ═══════════════════════════════════════════════════════════════════════════════
// Job Identification
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller-chosen identifier of a job, unique among a scheduler's live jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&JobId> for JobId {
    fn from(id: &JobId) -> Self {
        id.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a job.
///
/// ```text
/// READY ──▶ PENDING ──▶ RUNNING ──▶ FINISHED | ERROR | ABORT
///   │          │
///   └──────────┴──▶ ABORT
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created, not yet submitted
    Ready,
    /// Queued, waiting for a free slot
    Pending,
    /// Body is executing
    Running,
    /// Body returned a value
    Finished,
    /// Body failed or panicked
    Error,
    /// Aborted by a caller or by scheduler shutdown
    Abort,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Abort)
    }

    /// Check whether the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Ready, Pending)
                | (Ready, Abort)
                | (Pending, Running)
                | (Pending, Abort)
                | (Running, Finished)
                | (Running, Error)
                | (Running, Abort)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "READY",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Abort => "ABORT",
        };
        f.write_str(label)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure captured from a job body.
///
/// These never propagate to the submitter; they end up on the job itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    /// Error message
    pub message: String,
    /// Classification of the failure
    pub code: ErrorCode,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Result type returned by job bodies.
pub type JobResult<T> = std::result::Result<T, JobError>;

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            context: None,
        }
    }

    /// The body could not complete its work.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::JobExecutionFailed, message)
    }

    /// The body stopped because it observed cancellation.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::JobCancelled, message)
    }

    /// Add context.
    pub fn with_context(mut self, context: impl Serialize) -> Self {
        self.context = serde_json::to_value(context).ok();
        self
    }

    /// Whether this error means the work was cancelled rather than failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.code, ErrorCode::JobCancelled | ErrorCode::RemoteCancelled)
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for JobError {}

impl From<CadenceError> for JobError {
    fn from(error: CadenceError) -> Self {
        let mut job_error = Self::new(error.code(), error.message());
        if let Some(internal) = error.internal_message() {
            job_error.context = Some(serde_json::json!({ "cause": internal }));
        }
        job_error
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shared State
// ═══════════════════════════════════════════════════════════════════════════════

struct ResultSlot<T> {
    value: Option<T>,
    /// Set when the body stored a value through its context during this run.
    set_by_body: bool,
}

/// State shared between a [`Job`] and the contexts handed to its body.
struct JobShared<T> {
    progress: AtomicU8,
    info: Mutex<HashMap<String, serde_json::Value>>,
    result: Mutex<ResultSlot<T>>,
    listeners: RwLock<Vec<Arc<dyn JobListener>>>,
}

impl<T> JobShared<T> {
    fn new() -> Self {
        Self {
            progress: AtomicU8::new(0),
            info: Mutex::new(HashMap::new()),
            result: Mutex::new(ResultSlot {
                value: None,
                set_by_body: false,
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn insert_info(&self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.info.lock().insert(key.into(), value);
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn JobListener>> {
        self.listeners.read().clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle given to a job body while it runs.
pub struct JobContext<T> {
    job_id: JobId,
    job_name: String,
    cancellation: CancellationToken,
    shared: Arc<JobShared<T>>,
}

impl<T> Clone for JobContext<T> {
    fn clone(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            job_name: self.job_name.clone(),
            cancellation: self.cancellation.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T> JobContext<T> {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// A token that is cancelled when the job is aborted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Report progress (clamped to 100).
    pub fn report_progress(&self, percent: u8) {
        let percent = percent.min(100);
        self.shared.progress.store(percent, Ordering::Release);
        for listener in self.shared.listeners() {
            listener.on_progress(&self.job_id, percent);
        }
    }

    /// Attach a diagnostic entry to the job's info map.
    pub fn set_info(&self, key: impl Into<String>, value: impl Serialize) {
        self.shared.insert_info(key, value);
    }

    /// Store the job's result from inside the body.
    ///
    /// A value stored this way wins over the body's return value.
    pub fn set_result(&self, value: T) {
        let mut slot = self.shared.result.lock();
        slot.value = Some(value);
        slot.set_by_body = true;
    }

    /// Log a message associated with this job.
    pub fn log_info(&self, message: &str) {
        tracing::info!(job_id = %self.job_id, job_name = %self.job_name, message);
    }

    /// Log a warning associated with this job.
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(job_id = %self.job_id, job_name = %self.job_name, message);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// The body of a job.
#[async_trait]
pub trait JobRunner<T: Send + 'static>: Send + Sync {
    /// Execute the work.
    ///
    /// Runs at most once per job. Long-running bodies should watch
    /// [`JobContext::cancelled`] to honour aborts.
    async fn run(&self, ctx: JobContext<T>) -> JobResult<T>;

    /// Ask in-progress work to stop.
    ///
    /// Invoked at most once per job, only while it is RUNNING. Returns whether
    /// the request was accepted. The default relies on cooperative cancellation.
    async fn abort(&self, _ctx: &JobContext<T>) -> bool {
        false
    }

    /// Static diagnostics merged into [`Job::info`].
    fn info(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}

/// Runner backed by an async closure.
pub struct FnRunner<F> {
    f: F,
}

#[async_trait]
impl<T, F, Fut> JobRunner<T> for FnRunner<F>
where
    T: Send + 'static,
    F: Fn(JobContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult<T>> + Send + 'static,
{
    async fn run(&self, ctx: JobContext<T>) -> JobResult<T> {
        (self.f)(ctx).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Lifecycle {
    status: JobStatus,
    date_created: DateTime<Utc>,
    date_started: Option<DateTime<Utc>>,
    date_finished: Option<DateTime<Utc>>,
    abort_requested: bool,
    error: Option<JobError>,
}

/// Serializable point-in-time view of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub progress: u8,
    pub date_created: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobSnapshot {
    /// Time spent running, if the job started and finished.
    pub fn run_duration(&self) -> Option<std::time::Duration> {
        let started = self.date_started?;
        let finished = self.date_finished?;
        (finished - started).to_std().ok()
    }
}

/// A unit of work with a lifecycle.
///
/// Jobs are shared as `Arc<Job<T>>`: the submitter keeps one handle to observe
/// status and result while the scheduler holds another to run it.
pub struct Job<T: Send + 'static> {
    id: JobId,
    name: String,
    runner: Box<dyn JobRunner<T>>,
    /// Serializes transitions together with their notifications.
    transition: Mutex<()>,
    lifecycle: RwLock<Lifecycle>,
    abort_hook_invoked: AtomicBool,
    cancellation: CancellationToken,
    shared: Arc<JobShared<T>>,
}

impl<T: Send + 'static> Job<T> {
    /// Create a job in READY state.
    pub fn new(
        id: impl Into<JobId>,
        name: impl Into<String>,
        runner: impl JobRunner<T> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            runner: Box::new(runner),
            transition: Mutex::new(()),
            lifecycle: RwLock::new(Lifecycle {
                status: JobStatus::Ready,
                date_created: Utc::now(),
                date_started: None,
                date_finished: None,
                abort_requested: false,
                error: None,
            }),
            abort_hook_invoked: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
            shared: Arc::new(JobShared::new()),
        }
    }

    /// Create a job whose body is an async closure.
    pub fn from_fn<F, Fut>(id: impl Into<JobId>, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(JobContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<T>> + Send + 'static,
    {
        Self::new(id, name, FnRunner { f })
    }

    /// Pre-seed the result slot.
    pub fn with_result(self, value: T) -> Self {
        self.set_result(value);
        self
    }

    /// Attach a listener (builder form).
    pub fn with_listener(self, listener: Arc<dyn JobListener>) -> Self {
        self.add_listener(listener);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> JobStatus {
        self.lifecycle.read().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    pub fn is_pending(&self) -> bool {
        self.status() == JobStatus::Pending
    }

    pub fn is_terminated(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whether an abort was requested while the job was running.
    pub fn is_abort_requested(&self) -> bool {
        self.lifecycle.read().abort_requested
    }

    /// Last reported progress, 0 to 100.
    pub fn progress(&self) -> u8 {
        self.shared.progress.load(Ordering::Acquire)
    }

    /// The failure captured from the body, if it failed.
    pub fn error(&self) -> Option<JobError> {
        self.lifecycle.read().error.clone()
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.lifecycle.read().date_created
    }

    pub fn date_started(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.read().date_started
    }

    pub fn date_finished(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.read().date_finished
    }

    /// Runner diagnostics merged with entries recorded during the lifecycle.
    pub fn info(&self) -> HashMap<String, serde_json::Value> {
        let mut info = self.runner.info();
        info.extend(
            self.shared
                .info
                .lock()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        info
    }

    /// Store a result value from outside the body.
    pub fn set_result(&self, value: T) {
        let mut slot = self.shared.result.lock();
        slot.value = Some(value);
        slot.set_by_body = false;
    }

    pub fn add_listener(&self, listener: Arc<dyn JobListener>) {
        self.shared.listeners.write().push(listener);
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let lifecycle = self.lifecycle.read().clone();
        JobSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            status: lifecycle.status,
            progress: self.progress(),
            date_created: lifecycle.date_created,
            date_started: lifecycle.date_started,
            date_finished: lifecycle.date_finished,
            error: lifecycle.error,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Abort
    // ─────────────────────────────────────────────────────────────────────────

    /// Request that the job stop.
    ///
    /// - READY or PENDING: moves straight to ABORT; the body never runs.
    /// - RUNNING: invokes the runner's abort hook (once) and signals
    ///   cancellation; the job becomes ABORT when its body returns.
    /// - Terminal: no-op.
    pub async fn abort(&self) {
        let invoke_hook = {
            let _guard = self.transition.lock();
            let status = self.lifecycle.read().status;
            match status {
                JobStatus::Ready | JobStatus::Pending => {
                    if let Ok(change) = self.transition_locked(JobStatus::Abort, |_| {}) {
                        self.notify(&change);
                    }
                    false
                }
                JobStatus::Running => {
                    self.lifecycle.write().abort_requested = true;
                    !self.abort_hook_invoked.swap(true, Ordering::AcqRel)
                }
                JobStatus::Finished | JobStatus::Error | JobStatus::Abort => false,
            }
        };

        if !invoke_hook {
            return;
        }

        tracing::info!(job_id = %self.id, job_name = %self.name, "Aborting running job");

        let ctx = self.context();
        let accepted = AssertUnwindSafe(self.runner.abort(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!(job_id = %self.id, panic = %message, "Abort hook panicked");
                self.shared.insert_info(INFO_ABORT_ERROR, message);
                false
            });
        self.shared.insert_info(INFO_ABORT_ACCEPTED, accepted);
        if !accepted {
            let error = CadenceError::abort_failed(&self.id);
            tracing::warn!(
                job_id = %self.id,
                error_code = %error.code(),
                "Abort hook did not accept the request, relying on cooperative cancellation"
            );
        }

        self.cancellation.cancel();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduler-driven transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// READY → PENDING.
    pub(crate) fn mark_pending(&self) -> Result<()> {
        let _guard = self.transition.lock();
        match self.transition_locked(JobStatus::Pending, |_| {}) {
            Ok(change) => {
                self.notify(&change);
                Ok(())
            }
            Err(from) => Err(CadenceError::invalid_transition(
                &self.id,
                from,
                JobStatus::Pending,
            )),
        }
    }

    /// PENDING → RUNNING. Returns false if the job left PENDING meanwhile.
    pub(crate) fn start(&self) -> bool {
        let _guard = self.transition.lock();
        match self.transition_locked(JobStatus::Running, |lc| {
            lc.date_started = Some(Utc::now())
        }) {
            Ok(change) => {
                self.notify(&change);
                true
            }
            Err(_) => false,
        }
    }

    /// Abort without involving the runner. Only acts on READY or PENDING jobs.
    pub(crate) fn abort_if_queued(&self) -> bool {
        let _guard = self.transition.lock();
        if !matches!(self.lifecycle.read().status, JobStatus::Ready | JobStatus::Pending) {
            return false;
        }
        match self.transition_locked(JobStatus::Abort, |_| {}) {
            Ok(change) => {
                self.notify(&change);
                true
            }
            Err(_) => false,
        }
    }

    /// Run the body of a RUNNING job and commit its terminal status.
    pub(crate) async fn run_to_completion(&self) -> JobStatus {
        self.shared.result.lock().set_by_body = false;

        let outcome = AssertUnwindSafe(self.runner.run(self.context()))
            .catch_unwind()
            .await;

        let _guard = self.transition.lock();
        let abort_requested = self.lifecycle.read().abort_requested;

        let (status, error) = match outcome {
            Ok(Ok(value)) => {
                let mut slot = self.shared.result.lock();
                if !slot.set_by_body {
                    slot.value = Some(value);
                }
                let status = if abort_requested {
                    JobStatus::Abort
                } else {
                    JobStatus::Finished
                };
                (status, None)
            }
            Ok(Err(error)) => {
                let status = if abort_requested || error.is_cancellation() {
                    JobStatus::Abort
                } else {
                    JobStatus::Error
                };
                (status, Some(error))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                let status = if abort_requested {
                    JobStatus::Abort
                } else {
                    JobStatus::Error
                };
                (
                    status,
                    Some(JobError::new(
                        ErrorCode::JobPanicked,
                        format!("job panicked: {}", message),
                    )),
                )
            }
        };

        if let Some(error) = &error {
            self.shared.insert_info(INFO_ERROR, &error.message);
            self.shared.insert_info(INFO_ERROR_CODE, error.code);
            if status == JobStatus::Error {
                tracing::warn!(
                    job_id = %self.id,
                    job_name = %self.name,
                    error_code = %error.code,
                    error = %error.message,
                    "Job failed"
                );
            }
        }

        match self.transition_locked(status, |lc| {
            lc.date_finished = Some(Utc::now());
            lc.error = error;
        }) {
            Ok(change) => {
                self.notify(&change);
                status
            }
            Err(current) => current,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn context(&self) -> JobContext<T> {
        JobContext {
            job_id: self.id.clone(),
            job_name: self.name.clone(),
            cancellation: self.cancellation.clone(),
            shared: self.shared.clone(),
        }
    }

    /// Commit a transition. The caller must hold `self.transition`.
    fn transition_locked(
        &self,
        to: JobStatus,
        update: impl FnOnce(&mut Lifecycle),
    ) -> std::result::Result<StatusChange, JobStatus> {
        let mut lifecycle = self.lifecycle.write();
        let from = lifecycle.status;
        if !from.can_transition_to(to) {
            return Err(from);
        }
        lifecycle.status = to;
        update(&mut lifecycle);

        Ok(StatusChange {
            job_id: self.id.clone(),
            job_name: self.name.clone(),
            previous: from,
            current: to,
            at: Utc::now(),
        })
    }

    fn notify(&self, change: &StatusChange) {
        tracing::debug!(
            job_id = %change.job_id,
            from = %change.previous,
            to = %change.current,
            "Job status changed"
        );
        for listener in self.shared.listeners() {
            listener.on_status_change(change);
        }
    }
}

impl<T: Clone + Send + 'static> Job<T> {
    /// The job's result value, if any.
    ///
    /// After an abort of a queued job this is whatever was stored before.
    pub fn result(&self) -> Option<T> {
        self.shared.result.lock().value.clone()
    }
}

impl<T: Send + 'static> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type-erased view
// ═══════════════════════════════════════════════════════════════════════════════

/// A job as seen by a scheduler, independent of its result type.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn id(&self) -> &JobId;
    fn name(&self) -> &str;
    fn status(&self) -> JobStatus;
    fn snapshot(&self) -> JobSnapshot;
    fn info(&self) -> HashMap<String, serde_json::Value>;
    fn add_listener(&self, listener: Arc<dyn JobListener>);
    fn mark_pending(&self) -> Result<()>;
    fn start(&self) -> bool;
    fn abort_if_queued(&self) -> bool;
    async fn run_to_completion(&self) -> JobStatus;
    async fn abort(&self);
}

#[async_trait]
impl<T: Send + 'static> ScheduledJob for Job<T> {
    fn id(&self) -> &JobId {
        Job::id(self)
    }

    fn name(&self) -> &str {
        Job::name(self)
    }

    fn status(&self) -> JobStatus {
        Job::status(self)
    }

    fn snapshot(&self) -> JobSnapshot {
        Job::snapshot(self)
    }

    fn info(&self) -> HashMap<String, serde_json::Value> {
        Job::info(self)
    }

    fn add_listener(&self, listener: Arc<dyn JobListener>) {
        Job::add_listener(self, listener)
    }

    fn mark_pending(&self) -> Result<()> {
        Job::mark_pending(self)
    }

    fn start(&self) -> bool {
        Job::start(self)
    }

    fn abort_if_queued(&self) -> bool {
        Job::abort_if_queued(self)
    }

    async fn run_to_completion(&self) -> JobStatus {
        Job::run_to_completion(self).await
    }

    async fn abort(&self) {
        Job::abort(self).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
