//! Configuration management for Cadence Core.
//!
//! Values come from an optional file (TOML, YAML or JSON, detected by
//! extension) overlaid with environment variables prefixed `CADENCE__`, using
//! `__` as the nesting separator:
//!
//! ```text
//! CADENCE__SCHEDULER__MAX_CONCURRENCY=4
//! CADENCE__SCHEDULER__SHUTDOWN_TIMEOUT=10s
//! CADENCE__REMOTE__EXECUTE_TIMEOUT=2m
//! CADENCE__LOGGING__LEVEL=debug
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jobs::SchedulerConfig;
use crate::remote::RemoteConfig;
use crate::telemetry::{LoggingConfig, MetricsConfig, TelemetryConfig};

const ENV_PREFIX: &str = "CADENCE";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Defaults for schedulers created by a factory
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Remote execution timeouts
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load from environment variables only.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides on top.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    /// Reject settings no scheduler could run with.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.remote.validate()?;
        Ok(())
    }

    /// Telemetry settings for [`init_telemetry`](crate::telemetry::init_telemetry).
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.logging.clone(),
            metrics: self.metrics.clone(),
            ..Default::default()
        }
    }
}
