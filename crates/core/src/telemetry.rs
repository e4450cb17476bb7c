//! Tracing subscriber setup for embedding binaries and integration tests.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install a global subscriber honoring `RUST_LOG` with the configured level
/// as fallback. Safe to call more than once; later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    // A subscriber installed by the host application wins.
    let _ = result;
}
