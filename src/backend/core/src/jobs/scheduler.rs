//! Named schedulers with bounded concurrency.
//!
//! A scheduler owns a FIFO queue and a single dispatch task. The dispatch task
//! takes a concurrency permit, pops the oldest pending job, moves it to RUNNING
//! and spawns its body. With `max_concurrency == 1` this is a strictly serial
//! FIFO executor; larger values give a bounded parallel pool that still starts
//! jobs in submission order.
//!
//! Queue bookkeeping is driven by a listener attached to every submitted job,
//! so a job leaves the queue on any terminal transition regardless of who
//! caused it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::job::{Job, JobId, JobSnapshot, JobStatus, ScheduledJob};
use super::listener::{JobListener, StatusChange};
use super::queue::JobQueue;
use crate::error::{CadenceError, Result};
use crate::telemetry::metrics::{JobMetrics, OperationTimer};

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of jobs running at once (1 = serial FIFO)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Number of finished jobs kept for lookups
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// How long shutdown waits for running jobs to wind down
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Capacity of the status-change broadcast channel
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            history_size: default_history_size(),
            shutdown_timeout: default_shutdown_timeout(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl SchedulerConfig {
    /// Same settings with a different concurrency limit.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(CadenceError::invalid_configuration(
                "max_concurrency must be at least 1",
            ));
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS || self.max_concurrency > u32::MAX as usize {
            return Err(CadenceError::invalid_configuration(format!(
                "max_concurrency {} is too large",
                self.max_concurrency
            )));
        }
        if self.event_buffer_size == 0 {
            return Err(CadenceError::invalid_configuration(
                "event_buffer_size must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_max_concurrency() -> usize {
    1
}

fn default_history_size() -> usize {
    1000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_event_buffer_size() -> usize {
    256
}

// ═══════════════════════════════════════════════════════════════════════════════
// Statistics
// ═══════════════════════════════════════════════════════════════════════════════

/// Point-in-time scheduler statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Jobs accepted by `submit`
    pub submitted: u64,
    /// Jobs that ended FINISHED
    pub finished: u64,
    /// Jobs that ended ERROR
    pub errored: u64,
    /// Jobs that ended ABORT
    pub aborted: u64,
    /// Jobs waiting in the queue
    pub pending: usize,
    /// Jobs currently running
    pub running: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    finished: AtomicU64,
    errored: AtomicU64,
    aborted: AtomicU64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler
// ═══════════════════════════════════════════════════════════════════════════════

struct SchedulerInner {
    name: String,
    config: SchedulerConfig,
    queue: parking_lot::Mutex<JobQueue>,
    wakeup: Notify,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    events: broadcast::Sender<StatusChange>,
    counters: Counters,
}

/// A named executor of jobs.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    dispatcher: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler and start its dispatch task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: impl Into<String>, config: SchedulerConfig) -> Result<Self> {
        let name = name.into();
        config.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CadenceError::no_runtime(name.clone()))?;

        let (events, _) = broadcast::channel(config.event_buffer_size);
        let inner = Arc::new(SchedulerInner {
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            queue: parking_lot::Mutex::new(JobQueue::new(config.history_size)),
            wakeup: Notify::new(),
            shutdown: CancellationToken::new(),
            events,
            counters: Counters::default(),
            name,
            config,
        });

        let dispatcher = runtime.spawn(dispatch_loop(inner.clone()));

        info!(
            scheduler = %inner.name,
            max_concurrency = inner.config.max_concurrency,
            "Scheduler created"
        );

        Ok(Self {
            inner,
            dispatcher: parking_lot::Mutex::new(Some(dispatcher)),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.config.max_concurrency
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Enqueue a READY job. It becomes PENDING before this returns.
    ///
    /// # Errors
    ///
    /// - `SchedulerShutdown` after [`Scheduler::shutdown`]
    /// - `DuplicateJob` if a job with the same id is pending or running here
    /// - `InvalidStateTransition` if the job is not READY
    pub fn submit<T: Send + 'static>(&self, job: Arc<Job<T>>) -> Result<()> {
        self.submit_dyn(job)
    }

    /// Type-erased form of [`Scheduler::submit`].
    pub fn submit_dyn(&self, job: Arc<dyn ScheduledJob>) -> Result<()> {
        {
            let queue = self.inner.queue.lock();
            if !queue.is_accepting() {
                return Err(CadenceError::scheduler_shutdown(&self.inner.name));
            }
            if queue.is_active(job.id()) {
                return Err(CadenceError::duplicate_job(job.id()));
            }
        }

        let status = job.status();
        if status != JobStatus::Ready {
            return Err(CadenceError::invalid_transition(
                job.id(),
                status,
                JobStatus::Pending,
            ));
        }

        let listener = Arc::new(SchedulerListener {
            scheduler: Arc::downgrade(&self.inner),
            enqueued: AtomicBool::new(false),
        });
        job.add_listener(listener.clone());
        job.mark_pending()?;

        let depth = {
            let mut queue = self.inner.queue.lock();
            if !queue.is_accepting() || queue.is_active(job.id()) {
                let shut_down = !queue.is_accepting();
                drop(queue);
                job.abort_if_queued();
                return Err(if shut_down {
                    CadenceError::scheduler_shutdown(&self.inner.name)
                } else {
                    CadenceError::duplicate_job(job.id())
                });
            }
            queue.enqueue(job.clone());
            listener.enqueued.store(true, Ordering::Release);
            queue.pending_len()
        };

        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        JobMetrics::record_submitted(&self.inner.name);
        JobMetrics::set_queue_depth(&self.inner.name, depth);
        self.inner.wakeup.notify_one();

        debug!(
            scheduler = %self.inner.name,
            job_id = %job.id(),
            job_name = %job.name(),
            queue_depth = depth,
            "Job submitted"
        );

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Status of a live or recently finished job.
    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.job(id).map(|job| job.status())
    }

    /// Look up a live or recently finished job.
    pub fn job(&self, id: &JobId) -> Option<Arc<dyn ScheduledJob>> {
        self.inner.queue.lock().find(id)
    }

    /// Snapshots of pending, running and recently finished jobs.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.inner.queue.lock().snapshots()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.queue.lock().pending_len()
    }

    pub fn running_count(&self) -> usize {
        self.inner.queue.lock().running_len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let (pending, running) = {
            let queue = self.inner.queue.lock();
            (queue.pending_len(), queue.running_len())
        };
        let counters = &self.inner.counters;
        SchedulerStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            finished: counters.finished.load(Ordering::Relaxed),
            errored: counters.errored.load(Ordering::Relaxed),
            aborted: counters.aborted.load(Ordering::Relaxed),
            pending,
            running,
        }
    }

    /// Receive every status change of jobs submitted here.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.inner.events.subscribe()
    }

    pub fn is_shutdown(&self) -> bool {
        !self.inner.queue.lock().is_accepting()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────────────────────

    /// Abort a pending or running job by id.
    ///
    /// Returns false if no such job is live in this scheduler.
    pub async fn cancel(&self, id: &JobId) -> bool {
        let job = self.inner.queue.lock().find_active(id);
        match job {
            Some(job) => {
                job.abort().await;
                true
            }
            None => false,
        }
    }

    /// Stop accepting work, abort queued jobs, then abort running jobs and
    /// wait up to `shutdown_timeout` for them to reach a terminal status.
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        {
            let mut queue = self.inner.queue.lock();
            if !queue.is_accepting() {
                return;
            }
            queue.stop_accepting();
        }

        let timer = OperationTimer::start("scheduler_shutdown");
        info!(scheduler = %self.inner.name, "Shutting down scheduler");

        // The dispatch task aborts whatever is still queued on its way out.
        self.inner.shutdown.cancel();
        let dispatcher = self.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                warn!(scheduler = %self.inner.name, error = %e, "Dispatch task ended abnormally");
            }
        }

        let running = self.inner.queue.lock().running_jobs();
        for job in &running {
            job.abort().await;
        }

        let max = self.inner.config.max_concurrency as u32;
        let drained = tokio::time::timeout(
            self.inner.config.shutdown_timeout,
            self.inner.permits.acquire_many(max),
        )
        .await;

        match drained {
            Ok(_) => info!(
                scheduler = %self.inner.name,
                elapsed_ms = timer.finish().as_millis() as u64,
                "Scheduler shut down"
            ),
            Err(_) => warn!(
                scheduler = %self.inner.name,
                still_running = self.running_count(),
                timeout = ?self.inner.config.shutdown_timeout,
                "Shutdown timed out waiting for running jobs"
            ),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .field("max_concurrency", &self.inner.config.max_concurrency)
            .field("stats", &self.stats())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Bookkeeping listener
// ═══════════════════════════════════════════════════════════════════════════════

struct SchedulerListener {
    scheduler: Weak<SchedulerInner>,
    /// Set under the queue lock once the job is in this scheduler's queue.
    /// Until then terminal transitions are ignored, so a rejected job never
    /// touches a live job with the same id.
    enqueued: AtomicBool,
}

impl JobListener for SchedulerListener {
    fn on_status_change(&self, change: &StatusChange) {
        let Some(inner) = self.scheduler.upgrade() else {
            return;
        };

        match change.current {
            JobStatus::Running => {
                let running = {
                    let mut queue = inner.queue.lock();
                    queue.mark_running(&change.job_id);
                    queue.running_len()
                };
                JobMetrics::set_running(&inner.name, running);
            }
            status if status.is_terminal() => {
                let (job, depth, running) = {
                    let mut queue = inner.queue.lock();
                    if !self.enqueued.load(Ordering::Acquire) {
                        return;
                    }
                    let Some(job) = queue.finish(&change.job_id) else {
                        return;
                    };
                    (job, queue.pending_len(), queue.running_len())
                };

                let counter = match status {
                    JobStatus::Finished => &inner.counters.finished,
                    JobStatus::Error => &inner.counters.errored,
                    _ => &inner.counters.aborted,
                };
                counter.fetch_add(1, Ordering::Relaxed);

                let duration = job.snapshot().run_duration();
                JobMetrics::record_completed(&inner.name, status, duration);
                JobMetrics::set_queue_depth(&inner.name, depth);
                JobMetrics::set_running(&inner.name, running);

                info!(
                    scheduler = %inner.name,
                    job_id = %change.job_id,
                    job_name = %change.job_name,
                    status = %status,
                    "Job terminated"
                );
            }
            _ => {}
        }

        // No subscribers is fine.
        let _ = inner.events.send(change.clone());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Dispatch loop
// ═══════════════════════════════════════════════════════════════════════════════

async fn dispatch_loop(inner: Arc<SchedulerInner>) {
    debug!(scheduler = %inner.name, "Dispatch loop started");

    loop {
        let permit = tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => break,
            permit = inner.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let Some(job) = next_job(&inner).await else {
            break;
        };

        let span = info_span!("job", scheduler = %inner.name, job_id = %job.id(), job_name = %job.name());
        tokio::spawn(
            async move {
                let status = job.run_to_completion().await;
                debug!(status = %status, "Job body returned");
                drop(permit);
            }
            .instrument(span),
        );
    }

    let leftovers = inner.queue.lock().drain_pending();
    if !leftovers.is_empty() {
        info!(
            scheduler = %inner.name,
            count = leftovers.len(),
            "Aborting queued jobs"
        );
    }
    for job in leftovers {
        job.abort_if_queued();
    }

    debug!(scheduler = %inner.name, "Dispatch loop stopped");
}

/// Wait for the next job that can be started, moving it to RUNNING.
async fn next_job(inner: &SchedulerInner) -> Option<Arc<dyn ScheduledJob>> {
    loop {
        if inner.shutdown.is_cancelled() {
            return None;
        }

        // Register interest before checking the queue so a submit between the
        // check and the wait is not missed.
        let notified = inner.wakeup.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let head = inner.queue.lock().pop_front();
        match head {
            Some(job) => {
                if job.start() {
                    return Some(job);
                }
                debug!(job_id = %job.id(), "Skipping job that left the queue before starting");
            }
            None => {
                tokio::select! {
                    biased;
                    _ = inner.shutdown.cancelled() => return None,
                    _ = notified => {}
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
