//! Tracing setup for the Unity crates
//!
//! One global subscriber, filtered per crate, writing to stderr or a file in
//! compact, pretty or JSON form. Credentials and session tokens are never
//! recorded as fields.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{config_error, UnityResult};

/// Crates whose events are enabled by the default directives
const UNITY_CRATES: [&str; 3] = ["unity_core", "unity_api", "unity_client"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Record source file and line
    pub include_location: bool,
    /// Record thread ids and names
    pub include_thread: bool,
    pub log_to_file: bool,
    /// Required when `log_to_file` is set; appended to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// Emit a span-close event with timings for instrumented calls
    pub enable_performance_monitoring: bool,
    /// Extra `EnvFilter` directives such as `unity_client=trace`
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            enable_performance_monitoring: false,
            filter_directives: crate_directives("info"),
        }
    }
}

impl LoggingConfig {
    /// Debug-level configuration used by `--verbose`
    pub fn verbose() -> Self {
        Self {
            level: "debug".to_string(),
            include_location: true,
            enable_performance_monitoring: true,
            filter_directives: crate_directives("debug"),
            ..Default::default()
        }
    }
}

fn crate_directives(level: &str) -> Vec<String> {
    let mut directives: Vec<String> = UNITY_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect();
    // Connection pool chatter drowns the request log at debug
    directives.push("hyper_util=warn".to_string());
    directives.push("reqwest=warn".to_string());
    directives
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed, a directive does not parse or
/// the log file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> UnityResult<()> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.filter_directives {
        let parsed = directive.parse::<Directive>().map_err(|e| {
            config_error!(format!("invalid log directive '{}'", directive), "logging", e)
        })?;
        filter = filter.add_directive(parsed);
    }

    let writer = if config.log_to_file {
        let path = config
            .log_file_path
            .as_deref()
            .ok_or_else(|| config_error!("log_to_file is set but log_file_path is not", "logging"))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| config_error!(format!("cannot open log file {}", path), "logging", e))?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let layer = fmt::layer()
        .with_span_events(if config.enable_performance_monitoring {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_writer(writer);

    let subscriber = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => subscriber.with(layer.json()).try_init(),
        LogFormat::Pretty => subscriber.with(layer.pretty()).try_init(),
        LogFormat::Compact => subscriber.with(layer.compact()).try_init(),
    };
    installed.map_err(|e| config_error!("a global subscriber is already installed", "logging", e))
}

/// Debug event marking the start of a named array operation
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr) => {
        $crate::tracing::debug!(operation = $operation, "Unity operation started");
    };
    ($operation:expr, $($field:tt)*) => {
        $crate::tracing::debug!(operation = $operation, $($field)*, "Unity operation started");
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr) => {
        $crate::tracing::info!(operation = $operation, "Unity operation finished");
    };
    ($operation:expr, $($field:tt)*) => {
        $crate::tracing::info!(operation = $operation, $($field)*, "Unity operation finished");
    };
}

#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr) => {
        $crate::tracing::error!(operation = $operation, error = %$error, "Unity operation failed");
    };
    ($operation:expr, $error:expr, $($field:tt)*) => {
        $crate::tracing::error!(
            operation = $operation,
            error = %$error,
            $($field)*,
            "Unity operation failed"
        );
    };
}
