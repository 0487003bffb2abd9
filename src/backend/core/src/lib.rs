#![allow(clippy::result_large_err)]
//! # Cadence Core
//!
//! Job scheduling and execution engine.
//!
//! ## Architecture
//!
//! - **Jobs**: Units of work with an observable READY → PENDING → RUNNING → terminal lifecycle
//! - **Schedulers**: Named FIFO executors, serial or bounded-parallel, created through a factory
//! - **Remote**: Jobs whose body runs on a worker behind the [`remote::Executor`] trait
//! - **Telemetry**: Structured logging and Prometheus metrics
//! - **Config**: File and environment configuration

pub mod config;
pub mod error;
pub mod jobs;
pub mod remote;
pub mod telemetry;

pub use error::{CadenceError, ErrorCode, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{CadenceError, ErrorCode, Result};
    pub use crate::jobs::{
        Job, JobContext, JobError, JobId, JobListener, JobResult, JobRunner, JobSnapshot,
        JobStatus, Scheduler, SchedulerConfig, SchedulerFactory, SchedulerStats, StatusChange,
        StatusHistory,
    };
    pub use crate::remote::{
        Executor, LoopbackExecutor, LoopbackTask, RemoteConfig, RemoteJob, RemoteScheduler,
    };
}
