//! Prometheus metrics for job throughput, durations and queue depth.
//!
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed with [`init_metrics`].
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::telemetry::metrics::{init_metrics, JobMetrics, MetricsConfig};
//!
//! let registry = init_metrics(&MetricsConfig::default(), "cadence").unwrap();
//! JobMetrics::record_submitted("interpreter-1");
//! println!("{}", registry.render());
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::jobs::JobStatus;

/// Handle of the installed recorder, if any.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for job durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ]
}

/// Access to the rendered metrics.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// Registry backed by the process-wide recorder, if one was installed.
    pub fn global() -> Self {
        Self {
            prometheus_handle: PROMETHEUS_HANDLE.get().cloned(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Initialize the metrics subsystem.
///
/// Installing a recorder is process-wide; calling this again returns a
/// registry for the recorder installed first.
///
/// # Errors
///
/// Returns an error if the bucket list is invalid or the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry {
            prometheus_handle: None,
        });
    }

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(MetricsRegistry {
            prometheus_handle: Some(handle.clone()),
        });
    }

    let mut builder = PrometheusBuilder::new();

    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder = builder.set_buckets(&config.duration_buckets)?;

    let handle = builder.install_recorder()?;

    register_metric_descriptions();

    let handle = PROMETHEUS_HANDLE.get_or_init(|| handle).clone();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!(
        "cadence_jobs_submitted_total",
        "Total number of jobs accepted by a scheduler"
    );
    describe_counter!(
        "cadence_jobs_completed_total",
        "Total number of jobs that reached a terminal status"
    );
    describe_histogram!(
        "cadence_job_duration_seconds",
        "Time between a job starting and reaching a terminal status"
    );
    describe_gauge!(
        "cadence_scheduler_queue_depth",
        "Number of jobs waiting in a scheduler queue"
    );
    describe_gauge!(
        "cadence_scheduler_running_jobs",
        "Number of jobs currently running in a scheduler"
    );
    describe_counter!("cadence_errors_total", "Total number of errors by code");
}

/// Scheduler and job metrics.
pub struct JobMetrics;

impl JobMetrics {
    pub fn record_submitted(scheduler: &str) {
        counter!(
            "cadence_jobs_submitted_total",
            "scheduler" => scheduler.to_string(),
        )
        .increment(1);
    }

    /// Record a job reaching `status`, with its run time if it ever started.
    pub fn record_completed(scheduler: &str, status: JobStatus, duration: Option<Duration>) {
        counter!(
            "cadence_jobs_completed_total",
            "scheduler" => scheduler.to_string(),
            "status" => status.to_string(),
        )
        .increment(1);

        if let Some(duration) = duration {
            histogram!(
                "cadence_job_duration_seconds",
                "scheduler" => scheduler.to_string(),
                "status" => status.to_string(),
            )
            .record(duration.as_secs_f64());
        }
    }

    pub fn set_queue_depth(scheduler: &str, depth: usize) {
        gauge!(
            "cadence_scheduler_queue_depth",
            "scheduler" => scheduler.to_string(),
        )
        .set(depth as f64);
    }

    pub fn set_running(scheduler: &str, running: usize) {
        gauge!(
            "cadence_scheduler_running_jobs",
            "scheduler" => scheduler.to_string(),
        )
        .set(running as f64);
    }
}

/// Utility for timing an operation and recording it on finish.
pub struct OperationTimer {
    start: Instant,
    operation_name: &'static str,
}

impl OperationTimer {
    pub fn start(operation_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finish and record to `cadence_operation_duration_seconds`.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();

        histogram!(
            "cadence_operation_duration_seconds",
            "operation" => self.operation_name,
        )
        .record(duration.as_secs_f64());

        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(!config.duration_buckets.is_empty());
        assert!(config.global_labels.is_empty());
    }

    #[test]
    fn test_disabled_metrics_render_empty() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        let registry = init_metrics(&config, "test").unwrap();
        assert!(!registry.is_enabled());
        assert!(registry.render().is_empty());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        JobMetrics::record_submitted("unit");
        JobMetrics::record_completed("unit", JobStatus::Finished, Some(Duration::from_millis(5)));
        JobMetrics::set_queue_depth("unit", 3);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::start("test_operation");
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.finish();

        assert!(duration.as_millis() >= 10);
    }
}
