//! Tracing subscriber bootstrap.

use soulcycle_core::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SessionError};

/// Build the filter: `RUST_LOG` when set, the configured level otherwise.
///
/// # Errors
/// Returns [`SessionError::Logging`] if neither is a valid directive.
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| SessionError::Logging(e.to_string()))
}

/// Install the global subscriber. Call once, before opening a session.
///
/// # Errors
/// Returns [`SessionError::Logging`] on a bad level or if a subscriber is
/// already installed.
pub fn init_logging(config: &GeneralConfig) -> Result<()> {
    let filter = env_filter(&config.log_level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| SessionError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_configured_levels() {
        for level in ["trace", "info", "soulcycle_core=debug,warn"] {
            assert!(env_filter(level).is_ok());
        }
    }
}
