//! Logging system setup.
//!
//! Server output is re-logged under the `server` target, so targets stay
//! visible in the human-readable format.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Installs the global subscriber.
///
/// # Arguments
/// * `settings` - Level and output format from the `[logging]` section
///
/// # Returns
/// * `Result<()>` - Fails if a global subscriber is already installed
///
/// # Environment Variables
/// * `RUST_LOG` - Overrides the configured level (e.g. "debug", "server=warn")
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_file(false).with_line_number(false).with_target(true))
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
