//! Structured logging setup.
//!
//! JSON output for production, pretty output for development, level
//! control through `RUST_LOG` with a configured fallback.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the global tracing subscriber.
///
/// Call once at startup; a second call returns an error from the
/// underlying registry, which we surface rather than panic on.
pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_not_reentrant() {
        let config = ObservabilityConfig::default();
        let first = init(&config);
        let second = init(&config);
        // Whichever call was first in the test binary wins; the other
        // must fail cleanly instead of panicking.
        assert!(first.is_ok() || second.is_err());
    }
}
