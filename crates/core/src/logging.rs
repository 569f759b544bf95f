//! Logging for the rulegen CLI.
//!
//! Events go to stderr. Stdout carries only command output (rules, mapping
//! reports), so `rulegen generate ... > rule.json` stays parseable whatever
//! the log level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Filter used when neither config, `RUST_LOG` nor flags set one.
pub const DEFAULT_FILTER: &str = "info";

/// Dependency targets held at `warn` unless the filter names them.
///
/// The vector store and HTTP stack log per-fragment and per-connection
/// detail at `debug`, which would drown `--verbose` output.
const QUIET_TARGETS: [&str; 4] = ["lance", "lancedb", "datafusion", "hyper"];

/// Shape of log lines on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(name: &str) -> AppResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!(
                "Unknown log format '{}'. Supported: text, json",
                other
            ))),
        }
    }
}

/// Install the global subscriber.
///
/// `log_level` is an `EnvFilter` expression such as `debug` or
/// `rulegen_knowledge=trace`; `None` means [`DEFAULT_FILTER`].
///
/// # Example
/// ```no_run
/// use rulegen_core::logging::{init_logging, LogFormat};
///
/// init_logging(Some("debug"), false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let filter = build_filter(log_level.unwrap_or(DEFAULT_FILTER))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!no_color),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

fn build_filter(spec: &str) -> AppResult<EnvFilter> {
    let mut filter = EnvFilter::try_new(spec)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    for target in QUIET_TARGETS {
        if spec.contains(target) {
            continue;
        }
        let directive: Directive = format!("{}=warn", target)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_config_error() {
        let result = init_logging(Some("rulegen=loud"), true, LogFormat::Text);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_dependencies_quiet_by_default() {
        let filter = build_filter("debug").unwrap().to_string();
        assert!(filter.contains("lance=warn"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn test_named_dependency_keeps_its_level() {
        let filter = build_filter("info,datafusion=debug").unwrap().to_string();
        assert!(filter.contains("datafusion=debug"));
        assert!(!filter.contains("datafusion=warn"));
        assert!(filter.contains("lancedb=warn"));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("text").unwrap(), LogFormat::Text);
        assert!(LogFormat::parse("xml").is_err());
    }
}
