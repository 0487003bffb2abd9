//! Registry of named schedulers.
//!
//! Creating a scheduler under a name that already exists returns the existing
//! instance, so independent callers sharing a name share one queue. The
//! concurrency argument is only honoured by the call that creates it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use super::scheduler::{Scheduler, SchedulerConfig};
use crate::error::{CadenceError, Result};
use crate::remote::{Executor, RemoteConfig, RemoteScheduler};

static GLOBAL_FACTORY: OnceLock<SchedulerFactory> = OnceLock::new();

/// Creates, looks up and removes named schedulers.
pub struct SchedulerFactory {
    schedulers: DashMap<String, Arc<Scheduler>>,
    defaults: SchedulerConfig,
}

impl Default for SchedulerFactory {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl SchedulerFactory {
    /// Create an independent registry. `defaults` apply to every scheduler it
    /// creates, apart from the concurrency limit given per call.
    pub fn new(defaults: SchedulerConfig) -> Self {
        Self {
            schedulers: DashMap::new(),
            defaults,
        }
    }

    /// The process-wide registry.
    pub fn singleton() -> &'static SchedulerFactory {
        GLOBAL_FACTORY.get_or_init(|| {
            debug!("Initializing global scheduler factory");
            SchedulerFactory::default()
        })
    }

    pub fn defaults(&self) -> &SchedulerConfig {
        &self.defaults
    }

    /// Get the scheduler registered as `name`, creating it with
    /// `max_concurrency` if absent.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `max_concurrency` is 0, `NoRuntime` when
    /// called outside a tokio runtime.
    pub fn create_or_get_scheduler(
        &self,
        name: &str,
        max_concurrency: usize,
    ) -> Result<Arc<Scheduler>> {
        if max_concurrency == 0 {
            return Err(CadenceError::invalid_configuration(format!(
                "Scheduler '{}' needs a concurrency of at least 1",
                name
            )));
        }

        match self.schedulers.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let config = self.defaults.clone().with_max_concurrency(max_concurrency);
                let scheduler = Arc::new(Scheduler::new(name, config)?);
                entry.insert(scheduler.clone());
                info!(scheduler = %name, max_concurrency, "Registered scheduler");
                Ok(scheduler)
            }
        }
    }

    /// Serial scheduler: one job at a time, in submission order.
    pub fn create_or_get_fifo_scheduler(&self, name: &str) -> Result<Arc<Scheduler>> {
        self.create_or_get_scheduler(name, 1)
    }

    /// Parallel scheduler bounded by `max_concurrency`.
    pub fn create_or_get_parallel_scheduler(
        &self,
        name: &str,
        max_concurrency: usize,
    ) -> Result<Arc<Scheduler>> {
        self.create_or_get_scheduler(name, max_concurrency)
    }

    /// Scheduler whose jobs run on `executor`.
    ///
    /// The concurrency limit comes from `config.max_concurrency`.
    pub fn create_or_get_remote_scheduler(
        &self,
        name: &str,
        executor: Arc<dyn Executor>,
        config: RemoteConfig,
    ) -> Result<RemoteScheduler> {
        let scheduler = self.create_or_get_scheduler(name, config.max_concurrency)?;
        Ok(RemoteScheduler::new(scheduler, executor, config))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Scheduler>> {
        self.schedulers.get(name).map(|entry| entry.value().clone())
    }

    /// Names of all registered schedulers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schedulers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.schedulers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedulers.is_empty()
    }

    /// Unregister and shut down `name`. Returns false if it was not registered.
    ///
    /// Jobs that already terminated keep their status and result.
    pub async fn remove_scheduler(&self, name: &str) -> bool {
        let Some((_, scheduler)) = self.schedulers.remove(name) else {
            return false;
        };
        scheduler.shutdown().await;
        info!(scheduler = %name, "Removed scheduler");
        true
    }

    /// Remove and shut down every registered scheduler.
    pub async fn shutdown_all(&self) {
        for name in self.names() {
            self.remove_scheduler(&name).await;
        }
    }
}
