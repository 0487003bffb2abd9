//! Remote execution.
//!
//! A remote job is an ordinary [`Job`](crate::jobs::Job) whose body sends its
//! payload to an [`Executor`] and maps the worker's answer onto the job
//! lifecycle. Aborting such a job forwards a cancel request to the worker.
//!
//! - **Executor**: Transport-agnostic worker interface
//! - **RemoteJob**: Runner that bridges a job to an executor, with timeouts
//! - **RemoteScheduler**: Named scheduler plus the executor its jobs use
//! - **LoopbackExecutor**: In-process worker for tests and demos

pub mod executor;
pub mod job;
pub mod loopback;
pub mod scheduler;

pub use executor::{CancelAck, ExecuteRequest, ExecuteResponse, Executor, ExecutorError};
pub use job::RemoteJob;
pub use loopback::{LoopbackExecutor, LoopbackTask};
pub use scheduler::{RemoteConfig, RemoteScheduler};
