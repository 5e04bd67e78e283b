//! Method scanner: module → types → annotated methods.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::module::{Module, ModuleLoadError};
use crate::reflect::{MethodInfo, TypeInfo, Visibility};

/// A discovered method together with its owning type.
#[derive(Clone, Debug)]
pub struct MethodCandidate {
    owner: Arc<TypeInfo>,
    method: MethodInfo,
}

impl MethodCandidate {
    /// Pairs `method` with `owner`.
    #[must_use]
    pub fn new(owner: Arc<TypeInfo>, method: MethodInfo) -> Self {
        Self { owner, method }
    }

    /// Owning type.
    #[must_use]
    pub fn owner(&self) -> &TypeInfo {
        &self.owner
    }

    /// The method.
    #[must_use]
    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    /// Whether the method needs no instance.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.method.is_static()
    }
}

/// Lists the public, declared methods of every concrete type in `module`,
/// in type then method encounter order.
///
/// Types that fail to load are logged and skipped; the rest of the module is
/// still scanned.
#[must_use]
pub fn scan_module(module: &Module) -> Vec<MethodCandidate> {
    let types = match module.load_types() {
        Ok(types) => types,
        Err(ModuleLoadError::Partial {
            module: name,
            loaded,
            failures,
        }) => {
            for failure in &failures {
                warn!(module = %name, error = %failure, "skipping type that failed to load");
            }
            warn!(
                module = %name,
                loaded = loaded.len(),
                failed = failures.len(),
                "module loaded partially"
            );
            loaded
        }
    };

    let mut candidates = Vec::new();
    for ty in types {
        if !ty.is_concrete() {
            debug!(module = module.name(), owner = ty.name(), kind = ?ty.kind(), "skipping non-concrete type");
            continue;
        }

        let owner = Arc::new(ty);
        candidates.extend(
            owner
                .methods()
                .iter()
                .filter(|m| m.visibility() == Visibility::Public && m.declaration().is_some())
                .map(|m| MethodCandidate::new(Arc::clone(&owner), m.clone())),
        );
    }
    candidates
}
