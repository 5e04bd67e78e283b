//! File and environment loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::schema::DiscoveryConfig;

/// Comma-separated module list overriding `modules`.
pub const MODULES_VAR: &str = "TOOLBELT_MODULES";
/// `abort` or `isolate`, overriding `on_resolution_failure`.
pub const POLICY_VAR: &str = "TOOLBELT_ON_RESOLUTION_FAILURE";
/// Filter directive overriding `log_filter`.
pub const LOG_VAR: &str = "TOOLBELT_LOG";

/// Loads the configuration from `path` (if any) and the process environment.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, an override is malformed,
/// or the result does not validate.
pub fn load(path: Option<&Path>) -> Result<DiscoveryConfig> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Like [`load`], reading overrides through `env`.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<DiscoveryConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            from_json(&raw).with_context(|| format!("loading config file {}", path.display()))?
        }
        None => DiscoveryConfig::default(),
    };

    apply_overrides(&mut config, &env)?;
    config.validate().context("invalid discovery config")?;

    debug!(
        modules = config.modules.len(),
        policy = %config.on_resolution_failure,
        log_filter = %config.log_filter,
        "loaded discovery config"
    );
    Ok(config)
}

/// Parses a JSON document. Missing fields take their defaults.
///
/// # Errors
///
/// Fails on malformed JSON or unknown fields.
pub fn from_json(raw: &str) -> Result<DiscoveryConfig> {
    serde_json::from_str(raw).context("parsing discovery config")
}

fn apply_overrides<F>(config: &mut DiscoveryConfig, env: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(modules) = env(MODULES_VAR) {
        config.modules = modules
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
    }
    if let Some(policy) = env(POLICY_VAR) {
        config.on_resolution_failure = policy
            .parse()
            .with_context(|| format!("invalid {POLICY_VAR}"))?;
    }
    if let Some(filter) = env(LOG_VAR) {
        config.log_filter = filter;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::io::Write;

    use toolbelt_primitives::ResolutionFailurePolicy;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config = from_json(r#"{ "modules": ["outfit_planner"] }"#).unwrap();
        assert_eq!(config.modules, ["outfit_planner"]);
        assert_eq!(config.on_resolution_failure, ResolutionFailurePolicy::Abort);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(from_json(r#"{ "modulez": [] }"#).is_err());
    }

    #[test]
    fn loads_file_then_applies_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "modules": ["a"], "on_resolution_failure": "abort", "settings": {{ "key": "v" }} }}"#
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            (MODULES_VAR, "weather, wardrobe,,email"),
            (POLICY_VAR, "Isolate"),
            (LOG_VAR, "toolbelt=debug"),
        ]);
        let config = load_with(Some(file.path()), |key| {
            env.get(key).map(|value| (*value).to_owned())
        })
        .unwrap();

        assert_eq!(config.modules, ["weather", "wardrobe", "email"]);
        assert_eq!(config.on_resolution_failure, ResolutionFailurePolicy::Isolate);
        assert_eq!(config.log_filter, "toolbelt=debug");
        assert_eq!(config.setting("key"), Some("v"));
    }

    #[test]
    fn malformed_policy_override_fails() {
        let err = load_with(None, |key| (key == POLICY_VAR).then(|| "retry".to_owned()))
            .expect_err("unknown policy");
        assert!(err.to_string().contains(POLICY_VAR));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_with(Some(Path::new("/nonexistent/toolbelt.json")), no_env)
            .expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/toolbelt.json"));
    }

    #[test]
    fn validation_failures_surface() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "log_filter": " " }}"#).unwrap();
        assert!(load_with(Some(file.path()), no_env).is_err());
    }
}
