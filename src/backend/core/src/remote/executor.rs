//! The seam between a remote job and the worker that executes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jobs::JobId;

/// Work sent to a remote worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub job_id: JobId,
    pub payload: serde_json::Value,
}

/// Outcome reported by a worker for an executed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecuteResponse {
    /// The work completed
    Success { output: serde_json::Value },
    /// The work ran and failed
    Failure { message: String },
    /// The work was stopped by a cancel request
    Cancelled,
}

/// Worker answer to a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelAck {
    /// The worker will stop the job
    Accepted,
    /// The worker has no such job in flight
    NotRunning,
}

/// Failure to talk to the worker at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("worker unreachable: {0}")]
    Unreachable(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// A worker able to run job payloads out of process.
///
/// Implementations must tolerate `cancel` for a job that is not running.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Identifier used in logs and error context.
    fn name(&self) -> &str;

    /// Run a request and wait for its outcome.
    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, ExecutorError>;

    /// Ask the worker to stop `job_id`.
    async fn cancel(&self, job_id: &JobId) -> Result<CancelAck, ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shape() {
        let response = ExecuteResponse::Success {
            output: serde_json::json!("1000"),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["output"], "1000");

        let cancelled: ExecuteResponse =
            serde_json::from_value(serde_json::json!({ "type": "cancelled" })).unwrap();
        assert_eq!(cancelled, ExecuteResponse::Cancelled);
    }
}
