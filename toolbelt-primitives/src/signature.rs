//! Parameter and return specifications for declared methods.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::TypeDescription;

/// How a parameter participates in an invocation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamRole {
    /// Supplied by the orchestrator as a named argument.
    #[default]
    Value,
    /// Receives the cancellation signal passed to the invocation adapter.
    /// Never documented and never part of the argument schema.
    Cancellation,
}

/// One declared parameter of a method.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    name: Cow<'static, str>,
    ty: TypeDescription,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    role: ParamRole,
}

impl ParamSpec {
    /// Describes a required value parameter.
    #[must_use]
    pub fn value(name: impl Into<Cow<'static, str>>, ty: TypeDescription) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            role: ParamRole::Value,
        }
    }

    /// Describes the cancellation parameter.
    #[must_use]
    pub fn cancellation(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: TypeDescription::named("CancellationToken"),
            optional: true,
            role: ParamRole::Cancellation,
        }
    }

    /// Marks the parameter as optional (it has a default or accepts absence).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Parameter name as seen by the orchestrator.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural type of the parameter.
    #[must_use]
    pub fn ty(&self) -> &TypeDescription {
        &self.ty
    }

    /// Whether the argument may be omitted.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Role of the parameter.
    #[must_use]
    pub const fn role(&self) -> ParamRole {
        self.role
    }
}

/// Shape of a declared return type.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "lowercase")]
pub enum ReturnKind {
    /// Nothing is returned.
    #[default]
    Void,
    /// An immediate value.
    Value(TypeDescription),
    /// A deferred result. `None` is a non-generic wrapper that resolves to
    /// nothing; `Some(T)` resolves to `T`.
    Async(Option<TypeDescription>),
}

/// Declared return type of a method.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReturnSpec {
    kind: ReturnKind,
    #[serde(default)]
    fallible: bool,
}

impl ReturnSpec {
    /// A method returning nothing.
    #[must_use]
    pub fn void() -> Self {
        Self::default()
    }

    /// A method returning an immediate value.
    #[must_use]
    pub fn value(ty: TypeDescription) -> Self {
        Self {
            kind: ReturnKind::Value(ty),
            fallible: false,
        }
    }

    /// A method returning an asynchronous wrapper around `inner`.
    #[must_use]
    pub fn asynchronous(inner: Option<TypeDescription>) -> Self {
        Self {
            kind: ReturnKind::Async(inner),
            fallible: false,
        }
    }

    /// Marks the return as fallible: the declared type is the success type of
    /// a `Result`.
    #[must_use]
    pub fn fallible(mut self) -> Self {
        self.fallible = true;
        self
    }

    /// Returns the declared shape.
    #[must_use]
    pub fn kind(&self) -> &ReturnKind {
        &self.kind
    }

    /// Whether the method reports failures through its return value.
    #[must_use]
    pub const fn is_fallible(&self) -> bool {
        self.fallible
    }

    /// Whether the method returns an asynchronous wrapper.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self.kind, ReturnKind::Async(_))
    }

    /// Effective type after unwrapping the asynchronous wrapper; `None` means
    /// `void`.
    #[must_use]
    pub fn effective(&self) -> Option<&TypeDescription> {
        match &self.kind {
            ReturnKind::Void => None,
            ReturnKind::Value(ty) => Some(ty),
            ReturnKind::Async(inner) => inner.as_ref(),
        }
    }
}
