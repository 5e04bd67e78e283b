//! Modules and the module enumerator.
//!
//! A module is the unit scanned for capabilities. Static modules come from
//! `#[toolbox]` registrations collected at link time, one module per crate.
//! Dynamic modules are assembled at runtime and are only scanned when passed
//! explicitly.

use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::reflect::TypeInfo;

/// Produces the registration table of one type.
pub type TypeLoader = Arc<dyn Fn() -> Result<TypeInfo, TypeLoadError> + Send + Sync>;

/// Link-time registration submitted by `#[toolbox]`.
pub struct TypeRegistration {
    module: &'static str,
    load: fn() -> Result<TypeInfo, TypeLoadError>,
}

impl TypeRegistration {
    /// Creates a registration for a type declared in crate `module`.
    #[must_use]
    pub const fn new(module: &'static str, load: fn() -> Result<TypeInfo, TypeLoadError>) -> Self {
        Self { module, load }
    }

    /// Name of the module the type belongs to.
    #[must_use]
    pub const fn module(&self) -> &'static str {
        self.module
    }
}

inventory::collect!(TypeRegistration);

/// Failure to load one type's registration table.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TypeLoadError {
    /// The table failed validation.
    #[error("invalid type `{type_name}`: {reason}")]
    Invalid {
        /// Type display name.
        type_name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The loader panicked.
    #[error("type loader panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// Failure to load every type of a module.
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    /// Some types loaded, some did not.
    #[error("module `{module}` loaded partially: {} type(s) failed", failures.len())]
    Partial {
        /// Module name.
        module: String,
        /// Types that loaded successfully, in encounter order.
        loaded: Vec<TypeInfo>,
        /// Failures, in encounter order.
        failures: Vec<TypeLoadError>,
    },
}

/// Where a module comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ModuleOrigin {
    /// Collected from link-time registrations.
    Static,
    /// Assembled at runtime.
    Dynamic,
}

/// A named set of type loaders.
#[derive(Clone)]
pub struct Module {
    name: Cow<'static, str>,
    origin: ModuleOrigin,
    loaders: Vec<TypeLoader>,
}

impl Module {
    /// Starts a runtime-assembled module.
    #[must_use]
    pub fn dynamic(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            origin: ModuleOrigin::Dynamic,
            loaders: Vec::new(),
        }
    }

    /// Appends a type loader.
    #[must_use]
    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<TypeInfo, TypeLoadError> + Send + Sync + 'static,
    {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Appends an already-built type table.
    #[must_use]
    pub fn with_type(self, info: TypeInfo) -> Self {
        self.with_loader(move || Ok(info.clone()))
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module origin.
    #[must_use]
    pub const fn origin(&self) -> ModuleOrigin {
        self.origin
    }

    /// Loads every type of the module in encounter order.
    ///
    /// A panicking loader is reported as [`TypeLoadError::Panicked`].
    ///
    /// # Errors
    ///
    /// Returns [`ModuleLoadError::Partial`] when at least one loader failed;
    /// the error still carries every type that did load.
    pub fn load_types(&self) -> Result<Vec<TypeInfo>, ModuleLoadError> {
        let mut loaded = Vec::with_capacity(self.loaders.len());
        let mut failures = Vec::new();

        for loader in &self.loaders {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| loader()))
                .unwrap_or_else(|payload| {
                    Err(TypeLoadError::Panicked {
                        message: panic_message(payload.as_ref()),
                    })
                });
            match outcome {
                Ok(info) => loaded.push(info),
                Err(err) => failures.push(err),
            }
        }

        if failures.is_empty() {
            Ok(loaded)
        } else {
            Err(ModuleLoadError::Partial {
                module: self.name.to_string(),
                loaded,
                failures,
            })
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("types", &self.loaders.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Every static module with a non-empty name, grouped from link-time
/// registrations in first-encounter order.
///
/// The order is stable within a process run but not across builds.
#[must_use]
pub fn static_modules() -> Vec<Module> {
    let mut modules: Vec<Module> = Vec::new();
    for registration in inventory::iter::<TypeRegistration> {
        if registration.module.is_empty() {
            continue;
        }
        let loader: TypeLoader = Arc::new(registration.load);
        match modules.iter_mut().find(|m| m.name == registration.module) {
            Some(module) => module.loaders.push(loader),
            None => modules.push(Module {
                name: Cow::Borrowed(registration.module),
                origin: ModuleOrigin::Static,
                loaders: vec![loader],
            }),
        }
    }
    modules
}

/// Returns `explicit` verbatim when it is non-empty, otherwise every static
/// module.
#[must_use]
pub fn enumerate_modules(explicit: &[Module]) -> Vec<Module> {
    if explicit.is_empty() {
        static_modules()
    } else {
        explicit.to_vec()
    }
}

/// Yields the ordered set of modules a discovery pass scans.
#[derive(Clone, Debug, Default)]
pub struct ModuleEnumerator {
    explicit: Vec<Module>,
}

impl ModuleEnumerator {
    /// Enumerates every static module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerates exactly `modules`, in the caller's order. An empty list
    /// falls back to every static module.
    #[must_use]
    pub fn explicit(modules: Vec<Module>) -> Self {
        Self { explicit: modules }
    }

    /// Selects static modules by name, in the order given. Unknown names are
    /// logged and skipped; an empty selection falls back to every static
    /// module.
    #[must_use]
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let available = static_modules();
        let mut explicit = Vec::new();
        for name in names {
            let name = name.as_ref();
            match available.iter().find(|module| module.name() == name) {
                Some(module) => explicit.push(module.clone()),
                None => warn!(module = name, "requested module has no registered capabilities"),
            }
        }
        Self { explicit }
    }

    /// Returns the modules to scan.
    #[must_use]
    pub fn enumerate(&self) -> Vec<Module> {
        enumerate_modules(&self.explicit)
    }
}
