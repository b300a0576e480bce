//! Diagnostic logging for the CLI
//!
//! Library code only emits `tracing` events; the binary decides where they go.
//! Output always goes to stderr so JSON reports on stdout stay parseable.

use clap::ValueEnum;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Base level for our own events
pub fn base_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// `RUST_LOG` wins when set; otherwise trendscope logs at `level` and
/// everything else at warn.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(format!("warn,trendscope={}", level))
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_logging(verbose: bool, format: LogFormat) {
    let filter = build_filter(base_level(verbose));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);
            let _ = subscriber.with(fmt_layer).try_init();
        }
    }

    tracing::debug!(verbose, format = ?format, "logging initialized");
}
