//! Executor configuration loaded from environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The compensation policy name is not recognized.
    #[error("Unknown compensation policy: {0} (expected 'preserve-cause' or 'surface')")]
    UnknownPolicy(String),
}

/// What happens when a compensation itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompensationPolicy {
    /// Keep unwinding, keep the original failure as the cause, and attach
    /// every compensation failure to the returned error.
    #[default]
    PreserveCause,

    /// Stop unwinding the current level at the first compensation failure
    /// and return that failure in place of the original one.
    Surface,
}

impl CompensationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompensationPolicy::PreserveCause => "preserve-cause",
            CompensationPolicy::Surface => "surface",
        }
    }
}

impl std::fmt::Display for CompensationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompensationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" | "preserve-cause" | "preserve_cause" => {
                Ok(CompensationPolicy::PreserveCause)
            }
            "surface" => Ok(CompensationPolicy::Surface),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Executor configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `INTERACTOR_COMPENSATION_POLICY` — `preserve-cause` or `surface` (default: `preserve-cause`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub compensation_policy: CompensationPolicy,
    pub log_level: String,
}

impl ExecutorConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let compensation_policy = match lookup("INTERACTOR_COMPENSATION_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|err: ConfigError| {
                tracing::warn!(error = %err, "falling back to default compensation policy");
                CompensationPolicy::default()
            }),
            None => CompensationPolicy::default(),
        };
        Self {
            compensation_policy,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Returns a copy of this configuration with a different policy.
    pub fn with_policy(mut self, policy: CompensationPolicy) -> Self {
        self.compensation_policy = policy;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compensation_policy: CompensationPolicy::PreserveCause,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = ExecutorConfig::default();
        assert_eq!(config.compensation_policy, CompensationPolicy::PreserveCause);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_lookup_reads_both_variables() {
        let config = ExecutorConfig::from_lookup(lookup_from(&[
            ("INTERACTOR_COMPENSATION_POLICY", "Surface"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.compensation_policy, CompensationPolicy::Surface);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_from_lookup_falls_back_on_unknown_policy() {
        let config = ExecutorConfig::from_lookup(lookup_from(&[(
            "INTERACTOR_COMPENSATION_POLICY",
            "ignore",
        )]));
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "preserve".parse::<CompensationPolicy>(),
            Ok(CompensationPolicy::PreserveCause)
        );
        assert_eq!(
            " PRESERVE-CAUSE ".parse::<CompensationPolicy>(),
            Ok(CompensationPolicy::PreserveCause)
        );
        assert_eq!(
            "surface".parse::<CompensationPolicy>(),
            Ok(CompensationPolicy::Surface)
        );
        assert_eq!(
            "retry".parse::<CompensationPolicy>(),
            Err(ConfigError::UnknownPolicy("retry".to_string()))
        );
    }

    #[test]
    fn test_policy_display_roundtrips() {
        for policy in [CompensationPolicy::PreserveCause, CompensationPolicy::Surface] {
            assert_eq!(policy.to_string().parse::<CompensationPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_policy_serde_uses_kebab_case() {
        let json = serde_json::to_string(&CompensationPolicy::PreserveCause).unwrap();
        assert_eq!(json, "\"preserve-cause\"");
    }
}
