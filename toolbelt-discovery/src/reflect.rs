//! Registration tables describing owning types and their methods.
//!
//! `#[toolbox]` generates these tables; hand-written modules can build them
//! directly with [`TypeInfo::builder`] and [`MethodInfo::new`].

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toolbelt_primitives::{CapabilityDeclaration, ParamSpec, ReturnSpec};

use crate::error::ResolveResult;
use crate::invoke::{Arguments, Instance, InvokeFuture, Invoker};
use crate::module::TypeLoadError;
use crate::services::Services;

/// Constructs an instance of an owning type from the service container.
pub type Activator = Arc<dyn Fn(&Services) -> ResolveResult<Instance> + Send + Sync>;

/// Whether a type can be scanned.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum TypeKind {
    /// A concrete type; its methods are scanned.
    #[default]
    Concrete,
    /// An abstract type (a trait surface); skipped.
    Abstract,
    /// A generic definition not applied to arguments; skipped.
    GenericDefinition,
}

/// How a method is called.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Receiver {
    /// Associated function; needs no instance.
    Static,
    /// Takes `&self`; needs the owning type's instance.
    Instance,
}

/// Method visibility as declared in source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Visibility {
    /// `pub`.
    #[default]
    Public,
    /// Anything narrower than `pub`.
    Private,
}

/// One method of an owning type.
#[derive(Clone)]
pub struct MethodInfo {
    ident: Cow<'static, str>,
    receiver: Receiver,
    visibility: Visibility,
    params: Vec<ParamSpec>,
    returns: ReturnSpec,
    declaration: Option<CapabilityDeclaration>,
    invoker: Invoker,
}

impl MethodInfo {
    /// Describes a public method returning nothing, with no parameters and
    /// no declaration.
    pub fn new<F>(ident: impl Into<Cow<'static, str>>, receiver: Receiver, invoker: F) -> Self
    where
        F: Fn(Option<Instance>, Arguments, CancellationToken) -> InvokeFuture
            + Send
            + Sync
            + 'static,
    {
        Self {
            ident: ident.into(),
            receiver,
            visibility: Visibility::Public,
            params: Vec::new(),
            returns: ReturnSpec::void(),
            declaration: None,
            invoker: Arc::new(invoker),
        }
    }

    /// Sets the visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the return specification.
    #[must_use]
    pub fn with_returns(mut self, returns: ReturnSpec) -> Self {
        self.returns = returns;
        self
    }

    /// Attaches the capability declaration.
    #[must_use]
    pub fn with_declaration(mut self, declaration: CapabilityDeclaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    /// Raw method identifier.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// How the method is called.
    #[must_use]
    pub const fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Whether the method is an associated function.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(self.receiver, Receiver::Static)
    }

    /// Declared visibility.
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Return specification.
    #[must_use]
    pub fn returns(&self) -> &ReturnSpec {
        &self.returns
    }

    /// Capability declaration, if the method carries one.
    #[must_use]
    pub fn declaration(&self) -> Option<&CapabilityDeclaration> {
        self.declaration.as_ref()
    }

    /// Invocation adapter.
    #[must_use]
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("ident", &self.ident)
            .field("receiver", &self.receiver)
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

/// Registration table of one owning type.
#[derive(Clone)]
pub struct TypeInfo {
    id: TypeId,
    name: Cow<'static, str>,
    path: Cow<'static, str>,
    kind: TypeKind,
    methods: Vec<MethodInfo>,
    activator: Option<Activator>,
}

impl TypeInfo {
    /// Starts a table for `T` under the display name `name`.
    #[must_use]
    pub fn builder<T: 'static>(name: impl Into<Cow<'static, str>>) -> TypeInfoBuilder {
        TypeInfoBuilder {
            id: TypeId::of::<T>(),
            name: name.into(),
            path: Cow::Borrowed(""),
            kind: TypeKind::Concrete,
            methods: Vec::new(),
            activator: None,
        }
    }

    /// Identity of the owning type.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Display name of the owning type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module path the type was declared in; empty when unknown.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scan eligibility.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Whether methods of this type are scanned.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self.kind, TypeKind::Concrete)
    }

    /// Methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// The type's own activator, if it declared one.
    #[must_use]
    pub fn activator(&self) -> Option<&Activator> {
        self.activator.as_ref()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("methods", &self.methods)
            .field("activator", &self.activator.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TypeInfo`].
pub struct TypeInfoBuilder {
    id: TypeId,
    name: Cow<'static, str>,
    path: Cow<'static, str>,
    kind: TypeKind,
    methods: Vec<MethodInfo>,
    activator: Option<Activator>,
}

impl TypeInfoBuilder {
    /// Records the declaring module path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<Cow<'static, str>>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the scan eligibility.
    #[must_use]
    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Appends a method.
    #[must_use]
    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Sets the activator used when the service container has neither an
    /// instance nor a factory for the type.
    #[must_use]
    pub fn with_activator<F>(mut self, activator: F) -> Self
    where
        F: Fn(&Services) -> ResolveResult<Instance> + Send + Sync + 'static,
    {
        self.activator = Some(Arc::new(activator));
        self
    }

    /// Finalises the table.
    ///
    /// # Errors
    ///
    /// Returns [`TypeLoadError::Invalid`] when the type name is blank or two
    /// methods share an identifier.
    pub fn build(self) -> Result<TypeInfo, TypeLoadError> {
        if self.name.trim().is_empty() {
            return Err(TypeLoadError::Invalid {
                type_name: self.name.into_owned(),
                reason: "type name cannot be empty".into(),
            });
        }

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !seen.insert(method.ident()) {
                return Err(TypeLoadError::Invalid {
                    type_name: self.name.into_owned(),
                    reason: format!("method `{}` is declared twice", method.ident()),
                });
            }
        }

        Ok(TypeInfo {
            id: self.id,
            name: self.name,
            path: self.path,
            kind: self.kind,
            methods: self.methods,
            activator: self.activator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn noop(_: Option<Instance>, _: Arguments, _: CancellationToken) -> InvokeFuture {
        Box::pin(async { Ok::<_, crate::ToolError>(Value::Null) })
    }

    struct Sample;

    #[test]
    fn builds_type_table() {
        let info = TypeInfo::builder::<Sample>("Sample")
            .with_path("crate::sample")
            .with_method(
                MethodInfo::new("ping", Receiver::Static, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .build()
            .unwrap();

        assert_eq!(info.id(), TypeId::of::<Sample>());
        assert_eq!(info.path(), "crate::sample");
        assert!(info.is_concrete());
        assert!(info.methods()[0].is_static());
        assert!(info.activator().is_none());
    }

    #[test]
    fn rejects_duplicate_methods() {
        let err = TypeInfo::builder::<Sample>("Sample")
            .with_method(MethodInfo::new("ping", Receiver::Static, noop))
            .with_method(MethodInfo::new("ping", Receiver::Instance, noop))
            .build()
            .expect_err("duplicate");
        assert!(matches!(err, TypeLoadError::Invalid { type_name, .. } if type_name == "Sample"));
    }

    #[test]
    fn rejects_blank_names() {
        let err = TypeInfo::builder::<Sample>("  ").build().expect_err("blank");
        assert!(matches!(err, TypeLoadError::Invalid { .. }));
    }
}
