//! # parley-logging
//!
//! Global `tracing` subscriber setup.
//!
//! Library crates only emit events and spans; binaries call one of the
//! `init_*` functions once at startup. `RUST_LOG` always takes precedence
//! over the configured level.

#![deny(unsafe_code)]

use parley_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize a compact, human-readable subscriber on stderr.
///
/// Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails only if a global default is already set
    let _ = subscriber.try_init();
}

/// Initialize a JSON-lines subscriber on stderr.
///
/// Span fields (audio reference, pipeline mode) are flattened into each
/// line so log shippers can filter per input. Subsequent calls are no-ops.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .json()
        .with_current_span(true)
        .with_span_list(false);

    let _ = subscriber.try_init();
}

/// Initialize from [`LoggingSettings`].
pub fn init_from_settings(settings: &LoggingSettings) {
    if settings.json {
        init_json_subscriber(&settings.level);
    } else {
        init_subscriber(&settings.level);
    }
}
