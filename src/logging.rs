//! Tracing subscriber setup shared by the server and the stdio bridge.
//!
//! The bridge must keep stdout free for JSON-RPC traffic, so it logs to
//! stderr; the server logs to stdout for the container runtime to collect.

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, DEFAULT_LOG_FILTER};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

/// Pick the log filter with priority: CLI > `RUST_LOG` > `LOG_LEVEL` > default.
pub fn resolve_filter<F>(cli: Option<String>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    cli.or_else(|| lookup("RUST_LOG"))
        .or_else(|| lookup("LOG_LEVEL").map(|level| level_directive(&level)))
        .filter(|filter| !filter.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Map conventional level names onto tracing's (`warning` -> `warn`).
fn level_directive(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(filter: &str, format: LogFormat, target: LogTarget) {
    let writer = match target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins() {
        let filter = resolve_filter(Some("fleet_mcp=trace".to_string()), |_| {
            Some("warn".to_string())
        });
        assert_eq!(filter, "fleet_mcp=trace");
    }

    #[test]
    fn test_rust_log_before_log_level() {
        let filter = resolve_filter(None, |key| match key {
            "RUST_LOG" => Some("debug".to_string()),
            "LOG_LEVEL" => Some("ERROR".to_string()),
            _ => None,
        });
        assert_eq!(filter, "debug");
    }

    #[test]
    fn test_log_level_normalized() {
        let filter = resolve_filter(None, |key| (key == "LOG_LEVEL").then(|| "WARNING".to_string()));
        assert_eq!(filter, "warn");

        let filter = resolve_filter(None, |key| (key == "LOG_LEVEL").then(|| "Debug".to_string()));
        assert_eq!(filter, "debug");
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(resolve_filter(None, |_| None), DEFAULT_LOG_FILTER);
    }
}
