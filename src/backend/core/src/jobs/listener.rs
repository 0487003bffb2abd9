//! Status-change observers.
//!
//! A [`JobListener`] is notified after every committed transition of a job it
//! is attached to. Notifications for a single job are delivered in transition
//! order and never concurrently with each other.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::job::{JobId, JobStatus};

/// A committed status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Job that transitioned
    pub job_id: JobId,
    /// Human-readable job name
    pub job_name: String,
    /// Status before the transition
    pub previous: JobStatus,
    /// Status after the transition
    pub current: JobStatus,
    /// When the transition was committed
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// Whether this transition moved the job into a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }
}

/// Observer of job lifecycle events.
///
/// Callbacks run on the thread that committed the transition, so they must be
/// quick and must not call back into the job's `abort`.
pub trait JobListener: Send + Sync {
    /// Called after `change` was committed.
    fn on_status_change(&self, change: &StatusChange);

    /// Called when the job body reports progress.
    fn on_progress(&self, _job_id: &JobId, _progress: u8) {}
}

impl<F> JobListener for F
where
    F: Fn(&StatusChange) + Send + Sync,
{
    fn on_status_change(&self, change: &StatusChange) {
        self(change)
    }
}

/// Listener that records every transition it sees.
///
/// Handy for tests and for the CLI's transition report.
#[derive(Debug, Default, Clone)]
pub struct StatusHistory {
    changes: Arc<Mutex<Vec<StatusChange>>>,
}

impl StatusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded transitions, oldest first.
    pub fn changes(&self) -> Vec<StatusChange> {
        self.changes.lock().clone()
    }

    /// The statuses `job_id` moved into, in order.
    pub fn statuses_for(&self, job_id: &JobId) -> Vec<JobStatus> {
        self.changes
            .lock()
            .iter()
            .filter(|change| &change.job_id == job_id)
            .map(|change| change.current)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }
}

impl JobListener for StatusHistory {
    fn on_status_change(&self, change: &StatusChange) {
        self.changes.lock().push(change.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(id: &str, previous: JobStatus, current: JobStatus) -> StatusChange {
        StatusChange {
            job_id: JobId::new(id),
            job_name: id.to_string(),
            previous,
            current,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_status_history_filters_by_job() {
        let history = StatusHistory::new();
        history.on_status_change(&change("a", JobStatus::Ready, JobStatus::Pending));
        history.on_status_change(&change("b", JobStatus::Ready, JobStatus::Pending));
        history.on_status_change(&change("a", JobStatus::Pending, JobStatus::Running));

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.statuses_for(&JobId::new("a")),
            vec![JobStatus::Pending, JobStatus::Running]
        );
    }

    #[test]
    fn test_closure_listener() {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let listener = move |_: &StatusChange| *counter.lock() += 1;

        listener.on_status_change(&change("a", JobStatus::Running, JobStatus::Finished));
        assert_eq!(*seen.lock(), 1);
    }
}
