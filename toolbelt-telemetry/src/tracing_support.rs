//! Structured tracing helpers.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,toolbelt_discovery=debug`.
    pub filter: String,
    /// Print event targets.
    pub with_target: bool,
    /// Colour output.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            with_target: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Config using `filter` with the remaining defaults.
    #[must_use]
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }

    /// Parses the filter directive.
    ///
    /// # Errors
    ///
    /// Fails when the directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter)
            .with_context(|| format!("invalid log filter `{}`", self.filter))
    }
}

/// Installs a global `fmt` subscriber.
///
/// # Errors
///
/// Fails on a bad filter or when a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = config.env_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))?;
    tracing::debug!(filter = %config.filter, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_layered_directives() {
        let config = TelemetryConfig::with_filter("info,toolbelt_discovery=debug");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn rejects_bad_directives() {
        let config = TelemetryConfig::with_filter("toolbelt=loud");
        let err = config.env_filter().expect_err("bad level");
        assert!(err.to_string().contains("toolbelt=loud"));
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn with_filter_keeps_remaining_defaults() {
        let config = TelemetryConfig::with_filter("warn");
        assert_eq!(
            config,
            TelemetryConfig {
                filter: "warn".to_owned(),
                ..TelemetryConfig::default()
            }
        );
        assert!(!config.with_target);
        assert!(config.ansi);
    }

    #[test]
    fn second_install_fails() {
        let config = TelemetryConfig {
            ansi: false,
            ..TelemetryConfig::default()
        };
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
