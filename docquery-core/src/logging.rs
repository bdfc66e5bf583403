//! Logging setup for docquery.
//!
//! Internally every crate uses plain `tracing` macros. Nothing is printed
//! unless the application installs a subscriber, either its own or the one
//! set up by [`init`] when the `tracing-subscriber` feature is enabled.
//!
//! # Environment Variables
//!
//! - `DOCQUERY_DEBUG=true|1|yes` - Enable debug logging
//! - `DOCQUERY_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `DOCQUERY_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use docquery_core::logging;
//!
//! // Call once at startup.
//! logging::init();
//! ```

use std::env;
use std::fmt;
use std::sync::Once;

static INIT: Once = Once::new();

/// Variable enabling debug logging.
pub const DEBUG_VAR: &str = "DOCQUERY_DEBUG";
/// Variable overriding the log level.
pub const LEVEL_VAR: &str = "DOCQUERY_LOG_LEVEL";
/// Variable selecting the output format.
pub const FORMAT_VAR: &str = "DOCQUERY_LOG_FORMAT";

/// Output format of the built-in subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    /// Parse a format name, falling back to JSON.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Lowercase name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn resolve_level(level: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match level.map(|l| l.trim().to_lowercase()) {
        Some(l) => match l.as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        None => fallback,
    }
}

/// Check whether `DOCQUERY_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).map(|v| parse_flag(&v)).unwrap_or(false)
}

/// Get the level from `DOCQUERY_LOG_LEVEL`.
///
/// Defaults to "debug" when `DOCQUERY_DEBUG` is enabled, otherwise "warn".
pub fn log_level() -> &'static str {
    resolve_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// Get the format from `DOCQUERY_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    env::var(FORMAT_VAR)
        .map(|f| LogFormat::parse(&f))
        .unwrap_or_default()
}

/// Install the built-in subscriber if the environment asks for logging.
///
/// Subsequent calls are no-ops. Without the `tracing-subscriber` feature
/// this does nothing and the application is expected to install its own.
pub fn init() {
    if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
        return;
    }
    init_with(log_level(), log_format());
}

/// Install the built-in subscriber with an explicit level and format.
pub fn init_with(level: &str, format: LogFormat) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "docquery={level},docquery_core={level},docquery_mongodb={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = %format, "docquery logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = (level, format);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_level_resolution() {
        assert_eq!(resolve_level(None, false), "warn");
        assert_eq!(resolve_level(None, true), "debug");
        assert_eq!(resolve_level(Some("TRACE"), false), "trace");
        assert_eq!(resolve_level(Some("loud"), true), "debug");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("Compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
        assert_eq!(LogFormat::default().to_string(), "json");
    }
}
