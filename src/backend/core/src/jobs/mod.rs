//! Job scheduling for Cadence Core.
//!
//! - **Job**: A unit of work with a READY → PENDING → RUNNING → terminal lifecycle
//! - **Listener**: Observers of status transitions
//! - **Scheduler**: Named FIFO executor with a configurable concurrency limit
//! - **Factory**: Registry that creates or returns schedulers by name
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  submit   ┌─────────────────────────────────────────┐
//! │  Job<T>      │──────────▶│ Scheduler                               │
//! │  (runner,    │           │  queue ─▶ dispatch task ─▶ spawned body │
//! │   listeners) │◀──────────│  (FIFO)   (permits = concurrency)       │
//! └──────────────┘  status   └─────────────────────────────────────────┘
//!                                  ▲
//!                   SchedulerFactory (name → Arc<Scheduler>)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use cadence_core::jobs::{Job, SchedulerFactory};
//!
//! let scheduler = SchedulerFactory::singleton().create_or_get_fifo_scheduler("interpreter-1")?;
//! let job = Arc::new(Job::from_fn("paragraph-1", "run paragraph", |ctx| async move {
//!     ctx.report_progress(50);
//!     Ok("done".to_string())
//! }));
//! scheduler.submit(job.clone())?;
//! ```

pub mod factory;
pub mod job;
pub mod listener;
pub(crate) mod queue;
pub mod scheduler;

pub use factory::SchedulerFactory;
pub use job::{
    FnRunner, Job, JobContext, JobError, JobId, JobResult, JobRunner, JobSnapshot, JobStatus,
    ScheduledJob, INFO_ABORT_ACCEPTED, INFO_ABORT_ERROR, INFO_ERROR, INFO_ERROR_CODE,
};
pub use listener::{JobListener, StatusChange, StatusHistory};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
