//! Job runner that delegates its work to an [`Executor`].
//!
//! Outcome mapping:
//!
//! | Worker outcome             | Job status | Error code               |
//! |----------------------------|------------|--------------------------|
//! | `Success { output }`       | FINISHED   |                          |
//! | `Failure { message }`      | ERROR      | `RemoteApplicationError` |
//! | `Cancelled`                | ABORT      | `RemoteCancelled`        |
//! | executor error             | ERROR      | `RemoteUnreachable`      |
//! | no answer within timeout   | ERROR      | `RemoteTimeout`          |
//!
//! A cancel that reaches the worker before it has registered the job is
//! answered with `NotRunning`. The request is then repeated until the worker
//! acknowledges it or the cancel budget runs out, so an abort is never lost in
//! transit.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::executor::{CancelAck, ExecuteRequest, ExecuteResponse, Executor, ExecutorError};
use super::scheduler::RemoteConfig;
use crate::error::{CadenceError, ErrorCode};
use crate::jobs::{JobContext, JobError, JobResult, JobRunner, INFO_ABORT_ERROR};

/// Pause between cancel requests while the worker reports `NotRunning`.
const CANCEL_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Runs a JSON payload on a remote worker.
pub struct RemoteJob {
    executor: Arc<dyn Executor>,
    payload: Value,
    config: RemoteConfig,
    /// The worker acknowledged a cancel for this job.
    cancel_acknowledged: AtomicBool,
}

impl RemoteJob {
    pub fn new(executor: Arc<dyn Executor>, payload: Value, config: RemoteConfig) -> Self {
        Self {
            executor,
            payload,
            config,
            cancel_acknowledged: AtomicBool::new(false),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    fn map_response(&self, response: Result<ExecuteResponse, ExecutorError>) -> JobResult<Value> {
        match response {
            Ok(ExecuteResponse::Success { output }) => Ok(output),
            Ok(ExecuteResponse::Failure { message }) => {
                Err(JobError::new(ErrorCode::RemoteApplicationError, message))
            }
            Ok(ExecuteResponse::Cancelled) => Err(JobError::new(
                ErrorCode::RemoteCancelled,
                format!("worker '{}' cancelled the job", self.executor.name()),
            )),
            Err(error) => Err(CadenceError::remote_unreachable(
                self.executor.name(),
                error.to_string(),
            )
            .into()),
        }
    }

    /// Send cancel requests until the worker acknowledges one, it fails, or
    /// `budget` elapses. Returns whether the worker acknowledged.
    async fn deliver_cancel(&self, ctx: &JobContext<Value>, budget: Duration) -> bool {
        if self.cancel_acknowledged.load(Ordering::Acquire) {
            return true;
        }

        let attempts = async {
            loop {
                match self.executor.cancel(ctx.job_id()).await {
                    Ok(CancelAck::Accepted) => return true,
                    Ok(CancelAck::NotRunning) => {
                        tokio::time::sleep(CANCEL_RETRY_INTERVAL).await;
                    }
                    Err(error) => {
                        debug!(job_id = %ctx.job_id(), error = %error, "Cancel retry failed");
                        return false;
                    }
                }
            }
        };

        let acknowledged = tokio::time::timeout(budget, attempts)
            .await
            .unwrap_or(false);
        if acknowledged {
            self.cancel_acknowledged.store(true, Ordering::Release);
        }
        acknowledged
    }

    /// Bounded cancel before the execute call is dropped. Failures are only logged.
    async fn cancel_before_abandon(&self, ctx: &JobContext<Value>, reason: &str) {
        if !self.deliver_cancel(ctx, self.config.cancel_timeout).await {
            warn!(
                job_id = %ctx.job_id(),
                executor = %self.executor.name(),
                reason,
                "Worker did not acknowledge cancel, remote work may still be running"
            );
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl JobRunner<Value> for RemoteJob {
    async fn run(&self, ctx: JobContext<Value>) -> JobResult<Value> {
        let request = ExecuteRequest {
            job_id: ctx.job_id().clone(),
            payload: self.payload.clone(),
        };
        let deadline = self.config.execute_timeout.map(|t| Instant::now() + t);

        info!(
            job_id = %ctx.job_id(),
            executor = %self.executor.name(),
            "Dispatching job to remote worker"
        );

        let execute = self.executor.execute(request);
        tokio::pin!(execute);

        let response = tokio::select! {
            response = &mut execute => response,
            _ = ctx.cancelled() => {
                // Give the worker a bounded window to report back, repeating
                // the cancel meanwhile if it has not acknowledged one yet.
                let grace = tokio::time::sleep(self.config.abort_grace);
                tokio::pin!(grace);
                let resend = self.deliver_cancel(&ctx, self.config.abort_grace);
                tokio::pin!(resend);
                let mut resend_done = false;

                loop {
                    tokio::select! {
                        response = &mut execute => break response,
                        _ = &mut resend, if !resend_done => resend_done = true,
                        _ = &mut grace => {
                            self.cancel_before_abandon(&ctx, "abort").await;
                            warn!(
                                job_id = %ctx.job_id(),
                                grace = ?self.config.abort_grace,
                                "Abandoning remote job that did not stop after abort"
                            );
                            return Err(JobError::new(
                                ErrorCode::RemoteCancelled,
                                "remote job abandoned after abort",
                            ));
                        }
                    }
                }
            }
            _ = sleep_until(deadline) => {
                self.cancel_before_abandon(&ctx, "execute timeout").await;
                let timeout = self.config.execute_timeout.unwrap_or_default();
                return Err(CadenceError::remote_timeout("execute", timeout).into());
            }
        };

        debug!(job_id = %ctx.job_id(), "Remote worker answered");
        self.map_response(response)
    }

    async fn abort(&self, ctx: &JobContext<Value>) -> bool {
        let cancel = tokio::time::timeout(
            self.config.cancel_timeout,
            self.executor.cancel(ctx.job_id()),
        )
        .await;

        match cancel {
            Ok(Ok(CancelAck::Accepted)) => {
                self.cancel_acknowledged.store(true, Ordering::Release);
                true
            }
            Ok(Ok(CancelAck::NotRunning)) => {
                // The request is still in flight to the worker; the body keeps
                // sending the cancel until it is acknowledged.
                debug!(job_id = %ctx.job_id(), "Worker has not registered the job yet");
                true
            }
            Ok(Err(error)) => {
                warn!(job_id = %ctx.job_id(), error = %error, "Remote cancel failed");
                ctx.set_info(INFO_ABORT_ERROR, error.to_string());
                false
            }
            Err(_) => {
                let error = CadenceError::remote_timeout("cancel", self.config.cancel_timeout);
                warn!(job_id = %ctx.job_id(), "Remote cancel timed out");
                ctx.set_info(INFO_ABORT_ERROR, error.message());
                false
            }
        }
    }

    fn info(&self) -> HashMap<String, Value> {
        HashMap::from([
            ("executor".to_string(), Value::from(self.executor.name())),
            ("payload".to_string(), self.payload.clone()),
        ])
    }
}
