//! Job batch commands.
//!
//! A batch is a list of simulated jobs submitted to one scheduler. Each job
//! sleeps, then returns its output or fails; any job can be aborted after a
//! delay. With `--remote` the jobs run on an in-process loopback worker.

use anyhow::{Context, Result};
use cadence_core::config::Config;
use cadence_core::jobs::{Job, JobContext, JobError, SchedulerFactory, SchedulerStats};
use cadence_core::remote::{LoopbackExecutor, LoopbackTask, RemoteConfig};
use cadence_core::telemetry::{init_logging, init_metrics, LogFormat, LoggingConfig};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;

use crate::output::{self, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Subcommand)]
pub enum JobCommands {
    /// Run a generated batch of identical jobs
    Run {
        /// Number of jobs
        #[arg(short, long, default_value = "5")]
        jobs: usize,

        /// How long each job sleeps, in milliseconds
        #[arg(long, default_value = "100")]
        sleep_ms: u64,

        /// Abort the job at this index shortly after submission (repeatable)
        #[arg(long)]
        abort: Vec<usize>,

        /// Make the job at this index fail (repeatable)
        #[arg(long)]
        fail: Vec<usize>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run a batch described in a YAML file
    Submit {
        /// Path to the batch YAML file
        #[arg(short, long)]
        file: String,

        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Scheduler selection shared by batch commands.
#[derive(Args)]
pub struct TargetArgs {
    /// Scheduler name
    #[arg(long, default_value = "cli")]
    scheduler: String,

    /// Jobs running at once (defaults to the configured value)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Run jobs on the loopback remote worker
    #[arg(long)]
    remote: bool,

    /// Print Prometheus metrics after the batch
    #[arg(long)]
    metrics: bool,
}

// ── Batch types ─────────────────────────────────────────────────────────────

/// Batch YAML format.
#[derive(Deserialize)]
struct BatchFile {
    jobs: Vec<JobSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct JobSpec {
    name: String,
    #[serde(default)]
    sleep_ms: u64,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    fail: Option<String>,
    #[serde(default)]
    abort_after_ms: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Run (ms)")]
    run_ms: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Serialize)]
struct BatchReport {
    scheduler: String,
    remote: bool,
    jobs: Vec<JobRow>,
    stats: SchedulerStats,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(
    cmd: JobCommands,
    cfg: &Config,
    log_level: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(level) = log_level {
        let logging = LoggingConfig {
            level: level.to_string(),
            format: LogFormat::Compact,
            ..cfg.logging.clone()
        };
        init_logging(&logging, "production")?;
    }

    match cmd {
        JobCommands::Run {
            jobs,
            sleep_ms,
            abort,
            fail,
            target,
        } => {
            let specs = (0..jobs)
                .map(|i| JobSpec {
                    name: format!("job-{}", i),
                    sleep_ms,
                    output: Value::from(i),
                    fail: fail.contains(&i).then(|| format!("job-{} failed on request", i)),
                    abort_after_ms: abort.contains(&i).then_some(sleep_ms / 2),
                })
                .collect();
            run_batch(specs, &target, cfg, format).await
        }

        JobCommands::Submit { file, target } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read batch file: {}", file))?;
            let batch: BatchFile =
                serde_yaml::from_str(&content).with_context(|| "Failed to parse batch YAML")?;
            run_batch(batch.jobs, &target, cfg, format).await
        }
    }
}

fn local_job(index: usize, spec: JobSpec) -> Job<Value> {
    let id = format!("{}-{}", spec.name, index);
    let name = spec.name.clone();
    Job::from_fn(id, name, move |ctx: JobContext<Value>| {
        let spec = spec.clone();
        async move {
            tokio::select! {
                _ = ctx.cancelled() => return Err(JobError::cancelled("interrupted by abort")),
                _ = tokio::time::sleep(Duration::from_millis(spec.sleep_ms)) => {}
            }
            match spec.fail {
                Some(message) => Err(JobError::failed(message)),
                None => Ok(spec.output),
            }
        }
    })
}

async fn run_batch(
    specs: Vec<JobSpec>,
    target: &TargetArgs,
    cfg: &Config,
    format: OutputFormat,
) -> Result<()> {
    let metrics = if target.metrics {
        Some(init_metrics(&cfg.metrics, "cadence-cli")?)
    } else {
        None
    };

    let factory = SchedulerFactory::new(cfg.scheduler.clone());
    let mut jobs: Vec<Arc<Job<Value>>> = Vec::with_capacity(specs.len());

    let scheduler = if target.remote {
        let remote_config = RemoteConfig {
            max_concurrency: target.concurrency.unwrap_or(cfg.remote.max_concurrency),
            ..cfg.remote.clone()
        };
        let executor = Arc::new(LoopbackExecutor::new("loopback"));
        let remote = factory.create_or_get_remote_scheduler(
            &target.scheduler,
            executor,
            remote_config,
        )?;
        for (index, spec) in specs.iter().enumerate() {
            let task = LoopbackTask {
                sleep_ms: spec.sleep_ms,
                output: spec.output.clone(),
                fail: spec.fail.clone(),
            };
            let id = format!("{}-{}", spec.name, index);
            jobs.push(remote.submit(id, spec.name.clone(), task.to_payload())?);
        }
        remote.scheduler().clone()
    } else {
        let concurrency = target
            .concurrency
            .unwrap_or(cfg.scheduler.max_concurrency);
        let scheduler = factory.create_or_get_parallel_scheduler(&target.scheduler, concurrency)?;
        for (index, spec) in specs.iter().enumerate() {
            let job = Arc::new(local_job(index, spec.clone()));
            scheduler.submit(job.clone())?;
            jobs.push(job);
        }
        scheduler
    };

    for (job, spec) in jobs.iter().zip(&specs) {
        if let Some(delay) = spec.abort_after_ms {
            let job = job.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                job.abort().await;
            });
        }
    }

    let stats = loop {
        let stats = scheduler.stats();
        let settled = stats.finished + stats.errored + stats.aborted == stats.submitted;
        if settled && jobs.iter().all(|job| job.is_terminated()) {
            break stats;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };
    let report = BatchReport {
        scheduler: target.scheduler.clone(),
        remote: target.remote,
        jobs: jobs.iter().map(|job| job_row(job)).collect(),
        stats: stats.clone(),
    };
    factory.shutdown_all().await;

    match format {
        OutputFormat::Table => {
            output::print_rows(&report.jobs, format)?;
            output::print_summary(
                "Scheduler",
                &[
                    ("Name", report.scheduler.clone()),
                    ("Remote", report.remote.to_string()),
                    ("Submitted", stats.submitted.to_string()),
                    ("Finished", stats.finished.to_string()),
                    ("Errored", stats.errored.to_string()),
                    ("Aborted", stats.aborted.to_string()),
                ],
            );
        }
        _ => output::print_item(&report, format)?,
    }

    if let Some(metrics) = metrics {
        output::print_note(&metrics.render(), format);
    }

    Ok(())
}

fn job_row(job: &Job<Value>) -> JobRow {
    let snapshot = job.snapshot();
    JobRow {
        id: snapshot.id.to_string(),
        name: snapshot.name.clone(),
        status: snapshot.status.to_string(),
        run_ms: snapshot
            .run_duration()
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "-".to_string()),
        result: job
            .result()
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string()),
        error: snapshot
            .error
            .map(|e| format!("{:?}: {}", e.code, e.message))
            .unwrap_or_default(),
    }
}
