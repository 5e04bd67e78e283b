//! Errors produced by discovery, instance resolution, and invocation.

use thiserror::Error;

/// Result alias for invocation adapters.
pub type ToolResult<T> = Result<T, ToolError>;

/// Result alias for instance resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Result alias for a discovery pass.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors produced while invoking a descriptor.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required argument was absent.
    #[error("missing required argument `{name}`")]
    MissingArgument {
        /// Parameter name.
        name: String,
    },

    /// An argument could not be deserialised into the parameter type.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Parameter name.
        name: String,
        /// Deserialisation failure.
        reason: String,
    },

    /// Arguments were not supplied as a JSON object.
    #[error("arguments must be a JSON object, got {found}")]
    ArgumentsNotObject {
        /// JSON kind that was received instead.
        found: &'static str,
    },

    /// The bound target was absent or of the wrong type.
    #[error("method `{method}` requires a `{expected}` target")]
    TargetMismatch {
        /// Method identifier.
        method: String,
        /// Expected owning type.
        expected: &'static str,
    },

    /// The callable's result could not be serialised.
    #[error("failed to serialise tool output: {reason}")]
    Serialization {
        /// Serialisation failure.
        reason: String,
    },

    /// Tool name collided with an existing entry in a toolset.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

/// Errors produced while obtaining an instance of an owning type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No instance, factory, or activator is known for the type.
    #[error("no instance, factory, or activator registered for `{type_name}`")]
    Unresolvable {
        /// Owning type name.
        type_name: String,
    },

    /// The type's construction requires itself.
    #[error("dependency cycle while constructing `{type_name}`")]
    Cycle {
        /// Type whose construction was re-entered.
        type_name: String,
    },

    /// A factory or activator reported a failure.
    #[error("failed to construct `{type_name}`: {reason}")]
    Construction {
        /// Type being constructed.
        type_name: String,
        /// Failure reported by the factory.
        reason: String,
    },
}

impl ResolveError {
    /// Convenience helper for factory failures.
    #[must_use]
    pub fn construction(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a discovery pass.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An owning type could not be instantiated under
    /// [`ResolutionFailurePolicy::Abort`](crate::ResolutionFailurePolicy::Abort).
    #[error("capability discovery aborted while resolving `{type_name}`")]
    Resolution {
        /// Owning type name.
        type_name: String,
        /// Underlying resolution failure.
        #[source]
        source: ResolveError,
    },
}
