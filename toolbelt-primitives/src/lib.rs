//! Core shared types for capability discovery.
//!
//! Everything in this crate is plain data: declarations written by module
//! authors, structural type descriptions, and method signatures. The discovery
//! engine in `toolbelt-discovery` consumes these to build invocation
//! descriptors.

#![warn(missing_docs, clippy::pedantic)]

mod declaration;
mod error;
mod ids;
mod policy;
mod signature;
mod types;

/// Metadata attached to a method to expose it as a capability.
pub use declaration::CapabilityDeclaration;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier for one discovery pass.
pub use ids::ScanId;
/// Behaviour when an owning type cannot be instantiated.
pub use policy::ResolutionFailurePolicy;
/// Method signature descriptions.
pub use signature::{ParamRole, ParamSpec, ReturnKind, ReturnSpec};
/// Structural type descriptions and the pretty printer.
pub use types::TypeDescription;
