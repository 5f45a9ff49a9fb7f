//! Logging setup for the provider process.
//!
//! All logs go to **stderr**. Stdout belongs to the plugin handshake line and
//! anything else printed there breaks the host's connection attempt.
//!
//! The filter is taken from `RUST_LOG` when set. Otherwise the host's `TF_LOG`
//! level is honoured, so `TF_LOG=DEBUG terraform apply` shows provider debug
//! output alongside the host's.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable the host uses to select its own log level.
pub const TF_LOG_ENV: &str = "TF_LOG";

/// Map a `TF_LOG` value onto a tracing filter directive.
///
/// `JSON` is the host's structured-trace mode and maps to `trace`. Unknown
/// values fall back to `None`.
pub fn tf_log_directive(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        _ => None,
    }
}

fn resolve_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var(TF_LOG_ENV)
        .ok()
        .and_then(|v| tf_log_directive(&v))
        .unwrap_or(default_level);
    EnvFilter::new(level)
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the global subscriber with an `info` default.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize the global subscriber, using `default_level` when neither
/// `RUST_LOG` nor `TF_LOG` select a level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(resolve_filter(default_level))
        .with(stderr_layer())
        .init();
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so these
    // tests stick to filter parsing.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("terraform_provider_oci=debug").is_ok());
        assert!(EnvFilter::try_new("warn,terraform_provider_oci::waiter=trace").is_ok());
    }

    #[test]
    fn test_tf_log_directive() {
        assert_eq!(tf_log_directive("TRACE"), Some("trace"));
        assert_eq!(tf_log_directive("json"), Some("trace"));
        assert_eq!(tf_log_directive("Debug"), Some("debug"));
        assert_eq!(tf_log_directive(" WARN "), Some("warn"));
        assert_eq!(tf_log_directive("ERROR"), Some("error"));
        assert_eq!(tf_log_directive("verbose"), None);
        assert_eq!(tf_log_directive(""), None);
    }
}
