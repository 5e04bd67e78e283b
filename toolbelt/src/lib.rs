//! Capability discovery SDK facade.
//!
//! Bundles the toolbelt crates behind feature flags. Toolboxes declared in a
//! crate that only depends on this facade point the macro at the re-export:
//! `#[toolbox(crate = "toolbelt::discovery")]`.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use toolbelt_primitives as primitives;

/// Discovery engine and declaration macros (enabled by `discovery` feature).
#[cfg(feature = "discovery")]
pub use toolbelt_discovery as discovery;

/// `#[toolbox]` and `#[tool]` (enabled by `discovery` feature).
#[cfg(feature = "discovery")]
pub use toolbelt_discovery::{tool, toolbox};

/// Run configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use toolbelt_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use toolbelt_telemetry as telemetry;
