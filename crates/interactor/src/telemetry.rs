//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs a global tracing subscriber with a fmt layer.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.log_level`. Returns an error instead of panicking when a global
/// subscriber is already installed.
pub fn init_tracing(config: &crate::ExecutorConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter_for(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn filter_for(config: &crate::ExecutorConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let config = crate::ExecutorConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let config = crate::ExecutorConfig {
            log_level: "not==valid[".to_string(),
            ..Default::default()
        };
        // Must not panic on a malformed directive.
        let _ = filter_for(&config);
    }
}
