//! Structured logging to stderr.
//!
//! Every job body runs inside a `job` span carrying `scheduler`, `job_id` and
//! `job_name`, so events logged from a body (including [`JobContext::log_info`])
//! are attributed to their job. Setting `log_job_spans` additionally emits one
//! event per finished span with its busy and idle time.
//!
//! [`JobContext::log_info`]: crate::jobs::JobContext::log_info

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive applied to every module (e.g. `info`, `warn,cadence_core=debug`)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Extra `module = level` directives
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Include source file and line
    #[serde(default)]
    pub include_location: bool,

    /// Include thread ids and names
    #[serde(default)]
    pub include_thread: bool,

    /// Include the module path of each event
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Log job span timings when a job body returns
    #[serde(default)]
    pub log_job_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: false,
            include_thread: false,
            include_target: true,
            log_job_spans: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_true() -> bool {
    true
}

fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    config
        .module_levels
        .iter()
        .try_fold(EnvFilter::try_new(&config.level)?, |filter, (module, level)| -> anyhow::Result<EnvFilter> {
            Ok(filter.add_directive(format!("{}={}", module, level).parse()?))
        })
}

/// The format actually used: JSON is swapped for pretty output in `development`.
fn effective_format(config: &LoggingConfig, environment: &str) -> LogFormat {
    match (config.format, environment) {
        (LogFormat::Json, "development") => LogFormat::Pretty,
        (format, _) => format,
    }
}

fn fmt_layer(config: &LoggingConfig, format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.log_job_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_target(config.include_target);

    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a filter directive is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig, environment: &str) -> anyhow::Result<()> {
    let filter = build_filter(config)?;
    let format = effective_format(config, environment);

    tracing_subscriber::registry()
        .with(fmt_layer(config, format))
        .with(filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_target);
        assert!(!config.log_job_spans);
        assert!(config.module_levels.is_empty());
    }

    #[test]
    fn test_build_filter_with_module_levels() {
        let mut config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        config
            .module_levels
            .insert("cadence_core::jobs".to_string(), "debug".to_string());

        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_development_prefers_pretty() {
        let config = LoggingConfig::default();
        assert_eq!(effective_format(&config, "development"), LogFormat::Pretty);
        assert_eq!(effective_format(&config, "production"), LogFormat::Json);

        let compact = LoggingConfig {
            format: LogFormat::Compact,
            ..Default::default()
        };
        assert_eq!(effective_format(&compact, "development"), LogFormat::Compact);
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(format, LogFormat::Compact);
    }
}
