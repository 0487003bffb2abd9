//! Error handling for Cadence Core.
//!
//! This module provides:
//! - A single error type with a stable, machine-readable [`ErrorCode`]
//! - Severity classification that drives log levels
//! - Structured details (entity, free-form context) for observability
//! - A `cadence_errors_total` counter labelled by code, category and severity
//!
//! Only `submit`, scheduler construction and configuration loading return
//! these errors to callers. Failures inside a running job are captured as
//! [`JobError`](crate::jobs::JobError) and turned into a terminal job status
//! instead; their [`ErrorCode`] travels with them.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and are also attached to captured job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Scheduler Errors (1000-1099)
    SchedulerShutdown,
    DuplicateJob,
    InvalidStateTransition,
    NoRuntime,

    // Job Errors (1100-1199)
    JobExecutionFailed,
    JobAbortFailed,
    JobPanicked,
    JobCancelled,

    // Remote Errors (1200-1299)
    RemoteUnreachable,
    RemoteApplicationError,
    RemoteCancelled,
    RemoteTimeout,

    // Serialization Errors (2200-2299)
    SerializationError,
    DeserializationError,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    InvalidConfiguration,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            // Scheduler Errors
            Self::SchedulerShutdown => 1000,
            Self::DuplicateJob => 1001,
            Self::InvalidStateTransition => 1002,
            Self::NoRuntime => 1003,

            // Job Errors
            Self::JobExecutionFailed => 1100,
            Self::JobAbortFailed => 1101,
            Self::JobPanicked => 1102,
            Self::JobCancelled => 1103,

            // Remote Errors
            Self::RemoteUnreachable => 1200,
            Self::RemoteApplicationError => 1201,
            Self::RemoteCancelled => 1202,
            Self::RemoteTimeout => 1203,

            // Serialization Errors
            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,

            // Configuration Errors
            Self::ConfigurationError => 5000,
            Self::InvalidConfiguration => 5001,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "scheduler",
            1100..=1199 => "job",
            1200..=1299 => "remote",
            2200..=2299 => "serialization",
            5000..=5099 => "configuration",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller mistakes (bad state, duplicate ids)
    Low,
    /// Operational issues (timeouts, cancellations, shutdown races)
    Medium,
    /// Failures of the work itself or of its backend
    High,
    /// Bugs or broken environments
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::DuplicateJob
            | ErrorCode::InvalidStateTransition
            | ErrorCode::JobCancelled
            | ErrorCode::RemoteCancelled => Self::Low,

            ErrorCode::SchedulerShutdown
            | ErrorCode::RemoteTimeout
            | ErrorCode::JobAbortFailed
            | ErrorCode::InvalidConfiguration => Self::Medium,

            ErrorCode::JobExecutionFailed
            | ErrorCode::RemoteUnreachable
            | ErrorCode::RemoteApplicationError
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::ConfigurationError => Self::High,

            ErrorCode::JobPanicked | ErrorCode::NoRuntime => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (job, scheduler)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Cadence Core.
#[derive(Error, Debug)]
pub struct CadenceError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Message safe to show to callers
    message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for CadenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl CadenceError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            message: message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both public and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, message);
        error.internal_message = Some(internal_message.into());
        error
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the public message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    fn record_metrics(&self) {
        counter!(
            "cadence_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<serde_json::Error> for CadenceError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() || error.is_eof() {
            ErrorCode::DeserializationError
        } else {
            ErrorCode::SerializationError
        };
        Self::with_internal(code, "Failed to process JSON payload", error.to_string())
            .with_source(error)
    }
}

impl From<config::ConfigError> for CadenceError {
    fn from(error: config::ConfigError) -> Self {
        Self::with_internal(
            ErrorCode::ConfigurationError,
            "Failed to load configuration",
            error.to_string(),
        )
        .with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Domain-Specific Constructors
// ═══════════════════════════════════════════════════════════════════════════════

impl CadenceError {
    // ─────────────────────────────────────────────────────────────────────────
    // Scheduler Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit was called after the scheduler was shut down.
    pub fn scheduler_shutdown(scheduler: impl Into<String>) -> Self {
        let scheduler = scheduler.into();
        Self::new(
            ErrorCode::SchedulerShutdown,
            format!("Scheduler '{}' has been shut down", scheduler),
        )
        .with_details(ErrorDetails::new().with_entity("scheduler", scheduler))
    }

    /// A job with the same id is already queued or running.
    pub fn duplicate_job(job_id: impl fmt::Display) -> Self {
        let job_id = job_id.to_string();
        Self::new(
            ErrorCode::DuplicateJob,
            format!("Job '{}' is already queued or running", job_id),
        )
        .with_details(ErrorDetails::new().with_entity("job", job_id))
    }

    /// A job was asked to make a transition its lifecycle does not allow.
    pub fn invalid_transition(
        job_id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        let job_id = job_id.to_string();
        Self::new(
            ErrorCode::InvalidStateTransition,
            format!("Job '{}' cannot move from {} to {}", job_id, from, to),
        )
        .with_details(
            ErrorDetails::new()
                .with_entity("job", job_id)
                .with_context("from", from.to_string())
                .with_context("to", to.to_string()),
        )
    }

    /// The abort hook of a running job declined, failed or panicked. The job
    /// still ends in ABORT.
    pub fn abort_failed(job_id: impl fmt::Display) -> Self {
        let job_id = job_id.to_string();
        Self::new(
            ErrorCode::JobAbortFailed,
            format!("Abort of job '{}' was not accepted", job_id),
        )
        .with_details(ErrorDetails::new().with_entity("job", job_id))
    }

    /// A scheduler was created outside of a tokio runtime.
    pub fn no_runtime(scheduler: impl Into<String>) -> Self {
        let scheduler = scheduler.into();
        Self::new(
            ErrorCode::NoRuntime,
            format!("Scheduler '{}' must be created inside a tokio runtime", scheduler),
        )
        .with_details(ErrorDetails::new().with_entity("scheduler", scheduler))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// The remote worker could not be reached.
    pub fn remote_unreachable(executor: impl Into<String>, message: impl Into<String>) -> Self {
        let executor = executor.into();
        Self::with_internal(
            ErrorCode::RemoteUnreachable,
            format!("Remote worker '{}' is unreachable", executor),
            message,
        )
        .with_context("executor", &executor)
    }

    /// A blocking remote call exceeded its bound.
    pub fn remote_timeout(operation: &str, timeout: Duration) -> Self {
        Self::new(
            ErrorCode::RemoteTimeout,
            format!("Remote {} timed out after {:?}", operation, timeout),
        )
        .with_context("operation", operation)
        .with_context("timeout_ms", timeout.as_millis() as u64)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
