//! Observability utilities for toolbelt hosts.
//!
//! Discovery itself only emits `tracing` events; binaries install a
//! subscriber once at startup with [`tracing_support::init_tracing`].

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support;

pub use tracing_support::{TelemetryConfig, init_tracing};
