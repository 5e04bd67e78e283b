//! Configuration for discovery runs.
//!
//! A [`DiscoveryConfig`] selects which modules to scan, how instance
//! resolution failures are handled, and the log filter for the host. It is
//! read from an optional JSON file and then overridden from the environment.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{LOG_VAR, MODULES_VAR, POLICY_VAR, from_json, load, load_with};
pub use schema::{ConfigError, DiscoveryConfig};
