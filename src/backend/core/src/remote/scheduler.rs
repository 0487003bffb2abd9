//! Scheduler front-end for jobs executed on a remote worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::executor::Executor;
use super::job::RemoteJob;
use crate::error::{CadenceError, Result};
use crate::jobs::{Job, JobId, JobStatus, Scheduler};

/// Timeouts and concurrency for remote execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Upper bound on a single execute call; `None` waits indefinitely
    #[serde(default = "default_execute_timeout", with = "humantime_serde")]
    pub execute_timeout: Option<Duration>,

    /// Upper bound on a cancel call
    #[serde(default = "default_cancel_timeout", with = "humantime_serde")]
    pub cancel_timeout: Duration,

    /// How long an aborted job waits for the worker before it is abandoned
    #[serde(default = "default_abort_grace", with = "humantime_serde")]
    pub abort_grace: Duration,

    /// Jobs in flight on the worker at once
    #[serde(default = "default_remote_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            execute_timeout: default_execute_timeout(),
            cancel_timeout: default_cancel_timeout(),
            abort_grace: default_abort_grace(),
            max_concurrency: default_remote_concurrency(),
        }
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(CadenceError::invalid_configuration(
                "remote max_concurrency must be at least 1",
            ));
        }
        if self.cancel_timeout.is_zero() {
            return Err(CadenceError::invalid_configuration(
                "remote cancel_timeout must be positive",
            ));
        }
        Ok(())
    }
}

fn default_execute_timeout() -> Option<Duration> {
    Some(Duration::from_secs(600))
}

fn default_cancel_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_abort_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_remote_concurrency() -> usize {
    1
}

/// A named scheduler bound to an [`Executor`].
///
/// Jobs submitted here follow the same lifecycle and queueing as local jobs;
/// only their body runs elsewhere.
#[derive(Clone)]
pub struct RemoteScheduler {
    scheduler: Arc<Scheduler>,
    executor: Arc<dyn Executor>,
    config: RemoteConfig,
}

impl RemoteScheduler {
    pub fn new(scheduler: Arc<Scheduler>, executor: Arc<dyn Executor>, config: RemoteConfig) -> Self {
        Self {
            scheduler,
            executor,
            config,
        }
    }

    pub fn name(&self) -> &str {
        self.scheduler.name()
    }

    /// The underlying local scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Build a READY job without submitting it.
    pub fn create_job(
        &self,
        id: impl Into<JobId>,
        name: impl Into<String>,
        payload: Value,
    ) -> Arc<Job<Value>> {
        let runner = RemoteJob::new(self.executor.clone(), payload, self.config.clone());
        Arc::new(Job::new(id, name, runner))
    }

    /// Build and submit a job running `payload` remotely.
    pub fn submit(
        &self,
        id: impl Into<JobId>,
        name: impl Into<String>,
        payload: Value,
    ) -> Result<Arc<Job<Value>>> {
        let job = self.create_job(id, name, payload);
        self.scheduler.submit(job.clone())?;
        Ok(job)
    }

    /// Submit a job built with [`RemoteScheduler::create_job`].
    pub fn submit_job(&self, job: Arc<Job<Value>>) -> Result<()> {
        self.scheduler.submit(job)
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.scheduler.status(id)
    }

    pub async fn cancel(&self, id: &JobId) -> bool {
        self.scheduler.cancel(id).await
    }
}

impl std::fmt::Debug for RemoteScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteScheduler")
            .field("name", &self.scheduler.name())
            .field("executor", &self.executor.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_defaults() {
        let config = RemoteConfig::default();
        assert_eq!(config.execute_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.cancel_timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_remote_config_humantime() {
        let config: RemoteConfig = serde_json::from_value(serde_json::json!({
            "execute_timeout": "2m",
            "abort_grace": "250ms",
        }))
        .unwrap();
        assert_eq!(config.execute_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.abort_grace, Duration::from_millis(250));
        assert_eq!(config.cancel_timeout, Duration::from_secs(10));
    }
}
