//! In-memory queue bookkeeping for a scheduler.
//!
//! Holds the FIFO of pending jobs, the set of live (pending or running) jobs
//! keyed by id, and a bounded history of finished jobs for lookups after
//! completion. All access goes through the scheduler's queue mutex.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::job::{JobId, JobSnapshot, ScheduledJob};

/// Bounded history of terminated jobs. Oldest entries are evicted first.
pub(crate) struct FinishedJobs {
    jobs: VecDeque<Arc<dyn ScheduledJob>>,
    max_size: usize,
}

impl FinishedJobs {
    pub fn new(max_size: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            max_size,
        }
    }

    pub fn push(&mut self, job: Arc<dyn ScheduledJob>) {
        if self.max_size == 0 {
            return;
        }
        self.jobs.retain(|existing| existing.id() != job.id());
        if self.jobs.len() >= self.max_size {
            self.jobs.pop_front();
        }
        self.jobs.push_back(job);
    }

    pub fn find(&self, id: &JobId) -> Option<Arc<dyn ScheduledJob>> {
        self.jobs.iter().rev().find(|job| job.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ScheduledJob>> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}

/// Queue state guarded by the scheduler.
pub(crate) struct JobQueue {
    pending: VecDeque<Arc<dyn ScheduledJob>>,
    active: HashMap<JobId, Arc<dyn ScheduledJob>>,
    running: HashSet<JobId>,
    finished: FinishedJobs,
    accepting: bool,
}

impl JobQueue {
    pub fn new(history_size: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            active: HashMap::new(),
            running: HashSet::new(),
            finished: FinishedJobs::new(history_size),
            accepting: true,
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn stop_accepting(&mut self) {
        self.accepting = false;
    }

    /// Whether a job with this id is pending or running.
    pub fn is_active(&self, id: &JobId) -> bool {
        self.active.contains_key(id)
    }

    pub fn enqueue(&mut self, job: Arc<dyn ScheduledJob>) {
        self.active.insert(job.id().clone(), job.clone());
        self.pending.push_back(job);
    }

    pub fn pop_front(&mut self) -> Option<Arc<dyn ScheduledJob>> {
        self.pending.pop_front()
    }

    pub fn mark_running(&mut self, id: &JobId) {
        if self.active.contains_key(id) {
            self.running.insert(id.clone());
        }
    }

    /// Move a terminated job out of the live set into history.
    pub fn finish(&mut self, id: &JobId) -> Option<Arc<dyn ScheduledJob>> {
        self.pending.retain(|job| job.id() != id);
        self.running.remove(id);
        let job = self.active.remove(id)?;
        self.finished.push(job.clone());
        Some(job)
    }

    /// Remove every pending job from the queue, leaving them in the live set
    /// until their terminal transition arrives.
    pub fn drain_pending(&mut self) -> Vec<Arc<dyn ScheduledJob>> {
        self.pending.drain(..).collect()
    }

    pub fn running_jobs(&self) -> Vec<Arc<dyn ScheduledJob>> {
        self.running
            .iter()
            .filter_map(|id| self.active.get(id).cloned())
            .collect()
    }

    pub fn find_active(&self, id: &JobId) -> Option<Arc<dyn ScheduledJob>> {
        self.active.get(id).cloned()
    }

    /// Live jobs first, then history.
    pub fn find(&self, id: &JobId) -> Option<Arc<dyn ScheduledJob>> {
        self.find_active(id).or_else(|| self.finished.find(id))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    pub fn history_len(&self) -> usize {
        self.finished.len()
    }

    /// Snapshots of pending jobs in queue order, then running, then history.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let pending = self.pending.iter();
        let running = self
            .running
            .iter()
            .filter_map(|id| self.active.get(id));
        pending
            .chain(running)
            .chain(self.finished.iter())
            .map(|job| job.snapshot())
            .collect()
    }
}
