//! Capability discovery for function-calling orchestrators.
//!
//! Module authors annotate methods with `#[tool(...)]` inside a `#[toolbox]`
//! impl block. Each block becomes a registration table collected at link
//! time. [`CapabilityRegistry::enumerate`] walks those tables, obtains one
//! instance per owning type from [`Services`], and returns a
//! [`CallableDescriptor`] per capability: a name, a self-describing
//! description string, and an invocation adapter bound to its target.
//!
//! ```ignore
//! use std::sync::Arc;
//! use toolbelt_discovery::{toolbox, CapabilityRegistry, Services};
//!
//! pub struct Clock;
//!
//! #[toolbox]
//! impl Clock {
//!     #[tool(description = "Current UNIX time in seconds")]
//!     pub fn now() -> u64 { 0 }
//! }
//!
//! let registry = CapabilityRegistry::new(Arc::new(Services::new()));
//! for descriptor in registry.enumerate()? {
//!     println!("{}: {}", descriptor.name(), descriptor.description());
//! }
//! ```

#![warn(missing_docs, clippy::pedantic)]

extern crate self as toolbelt_discovery;

pub mod descriptor;
pub mod error;
pub mod invoke;
pub mod module;
pub mod reflect;
pub mod registry;
pub mod scanner;
pub mod schema;
pub mod services;
pub mod toolset;

pub use descriptor::{CallableDescriptor, ToolSpec, build_descriptor, NO_DESCRIPTION};
pub use error::{DiscoveryError, DiscoveryResult, ResolveError, ResolveResult, ToolError, ToolResult};
pub use invoke::{Arguments, Callable, Instance, InvokeFuture, Invoker};
pub use module::{Module, ModuleEnumerator, ModuleLoadError, ModuleOrigin, TypeLoadError, TypeRegistration};
pub use reflect::{MethodInfo, Receiver, TypeInfo, TypeInfoBuilder, TypeKind, Visibility};
pub use registry::{CapabilityRegistry, Diagnostic, Discovery, MemoizedRegistry};
pub use scanner::{MethodCandidate, scan_module};
pub use services::{InstanceResolver, Resolve, Services};
pub use toolset::Toolset;

pub use toolbelt_macros::{tool, toolbox};
pub use toolbelt_primitives::{
    CapabilityDeclaration, ParamRole, ParamSpec, ResolutionFailurePolicy, ReturnKind, ReturnSpec,
    ScanId, TypeDescription,
};
pub use tokio_util::sync::CancellationToken;

/// Support items referenced by `#[toolbox]` expansions. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use serde_json;

    pub use crate::invoke::{downcast_target, execution_error, to_output};
    pub use crate::services::activate;
}
