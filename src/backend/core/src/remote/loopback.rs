//! In-process [`Executor`] that simulates a remote worker.
//!
//! Payloads are [`LoopbackTask`]s: sleep for a while, then succeed with the
//! given output or fail with the given message. Cancel requests interrupt the
//! sleep. The worker can be switched offline, made to acknowledge cancels
//! without acting on them, slowed down before it registers a job, or made to
//! hang on cancel requests, to exercise the failure paths of remote jobs.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::executor::{CancelAck, ExecuteRequest, ExecuteResponse, Executor, ExecutorError};
use crate::jobs::JobId;

/// Work understood by [`LoopbackExecutor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopbackTask {
    /// Simulated run time
    #[serde(default)]
    pub sleep_ms: u64,

    /// Output returned on success
    #[serde(default)]
    pub output: Value,

    /// Fail with this message instead of succeeding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

impl LoopbackTask {
    pub fn sleep(sleep_ms: u64) -> Self {
        Self {
            sleep_ms,
            ..Default::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<Value>) -> Self {
        self.output = output.into();
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }

    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Removes an in-flight entry when the execute call ends or is dropped.
struct InFlight<'a> {
    map: &'a DashMap<JobId, CancellationToken>,
    job_id: JobId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.job_id);
    }
}

/// Simulated remote worker.
pub struct LoopbackExecutor {
    name: String,
    in_flight: DashMap<JobId, CancellationToken>,
    reachable: AtomicBool,
    honor_cancel: AtomicBool,
    hang_on_cancel: AtomicBool,
    registration_delay_ms: AtomicU64,
    executed: AtomicU64,
    cancel_requests: AtomicU64,
}

impl LoopbackExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_flight: DashMap::new(),
            reachable: AtomicBool::new(true),
            honor_cancel: AtomicBool::new(true),
            hang_on_cancel: AtomicBool::new(false),
            registration_delay_ms: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            cancel_requests: AtomicU64::new(0),
        }
    }

    /// Simulate the worker going offline (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// When false, cancels are acknowledged but the work keeps running.
    pub fn set_honor_cancel(&self, honor: bool) {
        self.honor_cancel.store(honor, Ordering::SeqCst);
    }

    /// When true, cancel requests are counted and then never answered.
    pub fn set_hang_on_cancel(&self, hang: bool) {
        self.hang_on_cancel.store(hang, Ordering::SeqCst);
    }

    /// Time an execute call spends in transit before the worker knows the job.
    /// Cancels arriving in that window see `NotRunning`.
    pub fn set_registration_delay(&self, delay: Duration) {
        self.registration_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of execute calls that reached the worker.
    pub fn executed_count(&self) -> u64 {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn cancel_request_count(&self) -> u64 {
        self.cancel_requests.load(Ordering::SeqCst)
    }

    pub fn is_running(&self, job_id: &JobId) -> bool {
        self.in_flight.contains_key(job_id)
    }

    fn ensure_reachable(&self) -> Result<(), ExecutorError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExecutorError::Unreachable(format!("{} is offline", self.name)))
        }
    }
}

#[async_trait]
impl Executor for LoopbackExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, ExecutorError> {
        self.ensure_reachable()?;

        let task: LoopbackTask = match serde_json::from_value(request.payload) {
            Ok(task) => task,
            Err(e) => {
                return Ok(ExecuteResponse::Failure {
                    message: format!("invalid payload: {}", e),
                })
            }
        };

        let delay = self.registration_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let token = CancellationToken::new();
        self.in_flight.insert(request.job_id.clone(), token.clone());
        let _in_flight = InFlight {
            map: &self.in_flight,
            job_id: request.job_id.clone(),
        };
        self.executed.fetch_add(1, Ordering::SeqCst);
        debug!(executor = %self.name, job_id = %request.job_id, sleep_ms = task.sleep_ms, "Executing");

        let response = tokio::select! {
            _ = token.cancelled() => ExecuteResponse::Cancelled,
            _ = tokio::time::sleep(Duration::from_millis(task.sleep_ms)) => match task.fail {
                Some(message) => ExecuteResponse::Failure { message },
                None => ExecuteResponse::Success { output: task.output },
            },
        };

        Ok(response)
    }

    async fn cancel(&self, job_id: &JobId) -> Result<CancelAck, ExecutorError> {
        self.cancel_requests.fetch_add(1, Ordering::SeqCst);
        self.ensure_reachable()?;
        if self.hang_on_cancel.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let Some(token) = self.in_flight.get(job_id).map(|entry| entry.value().clone()) else {
            return Ok(CancelAck::NotRunning);
        };

        if self.honor_cancel.load(Ordering::SeqCst) {
            token.cancel();
        } else {
            debug!(executor = %self.name, job_id = %job_id, "Ignoring cancel request");
        }
        Ok(CancelAck::Accepted)
    }
}
