//! Strongly typed configuration schema.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolbelt_primitives::ResolutionFailurePolicy;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Validation failures for [`DiscoveryConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A module entry is empty or whitespace.
    #[error("module entry {index} is blank")]
    BlankModule {
        /// Position in the module list.
        index: usize,
    },
    /// The same module is listed twice.
    #[error("module `{name}` is listed more than once")]
    DuplicateModule {
        /// Repeated module name.
        name: String,
    },
    /// The log filter is empty.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
}

/// Settings for one discovery run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Modules to scan, in order. Empty means every statically registered
    /// module.
    pub modules: Vec<String>,
    /// What to do when an owning type cannot be instantiated.
    pub on_resolution_failure: ResolutionFailurePolicy,
    /// `tracing` filter directive for the host.
    pub log_filter: String,
    /// Free-form settings read by service factories at the composition root.
    pub settings: BTreeMap<String, String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            on_resolution_failure: ResolutionFailurePolicy::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            settings: BTreeMap::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Checks module names and the log filter.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, module) in self.modules.iter().enumerate() {
            let name = module.trim();
            if name.is_empty() {
                return Err(ConfigError::BlankModule { index });
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateModule {
                    name: name.to_owned(),
                });
            }
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }

    /// Looks up a free-form setting.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Whether every registered module should be scanned.
    #[must_use]
    pub fn scans_all_modules(&self) -> bool {
        self.modules.is_empty()
    }
}
