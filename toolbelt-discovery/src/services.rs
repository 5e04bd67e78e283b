//! Service container and the per-pass instance resolver.
//!
//! [`Services`] is populated at the composition root with pre-built instances
//! and factories. Factories receive the container and resolve their own
//! dependencies through it. The discovery engine only reads the container
//! and asks it to construct.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::invoke::Instance;
use crate::reflect::TypeInfo;

type Factory = Arc<dyn Fn(&Services) -> ResolveResult<Instance> + Send + Sync>;

/// Types that know how to build themselves from the container.
///
/// Opted into with `#[toolbox(resolve)]`; used when the container has neither
/// an instance nor a factory for the type.
pub trait Resolve: Sized + Send + Sync + 'static {
    /// Builds an instance, resolving dependencies through `services`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when a dependency is missing or construction
    /// fails.
    fn resolve(services: &Services) -> ResolveResult<Self>;
}

/// Activator adapter for [`Resolve`] implementors.
///
/// # Errors
///
/// Propagates the error returned by [`Resolve::resolve`].
pub fn activate<T: Resolve>(services: &Services) -> ResolveResult<Instance> {
    T::resolve(services).map(|value| Arc::new(value) as Instance)
}

/// Dependency-lookup facility keyed by type.
#[derive(Default)]
pub struct Services {
    instances: RwLock<HashMap<TypeId, Instance>>,
    factories: RwLock<HashMap<TypeId, Factory>>,
    constructing: Mutex<Vec<(ThreadId, TypeId)>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instances = self.instances.read().map(|m| m.len()).unwrap_or_default();
        let factories = self.factories.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("Services")
            .field("instances", &instances)
            .field("factories", &factories)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-built instance of `T`, replacing any previous one.
    ///
    /// # Panics
    ///
    /// Panics if the internal instance lock is poisoned.
    pub fn register_instance<T: Send + Sync + 'static>(&self, value: T) {
        self.register_shared(Arc::new(value));
    }

    /// Registers a shared pre-built instance of `T`.
    ///
    /// # Panics
    ///
    /// Panics if the internal instance lock is poisoned.
    pub fn register_shared<T: Send + Sync + 'static>(&self, value: Arc<T>) {
        let mut instances = self.instances.write().expect("service instances poisoned");
        instances.insert(TypeId::of::<T>(), value as Instance);
    }

    /// Registers a factory constructing a fresh `T` on every resolution.
    ///
    /// # Panics
    ///
    /// Panics if the internal factory lock is poisoned.
    pub fn register_factory<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Services) -> ResolveResult<T> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |services: &Services| factory(services).map(|v| Arc::new(v) as Instance));
        let mut factories = self.factories.write().expect("service factories poisoned");
        factories.insert(TypeId::of::<T>(), factory);
    }

    /// Returns the pre-registered instance of `T`, if any.
    #[must_use]
    pub fn lookup<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.lookup_erased(TypeId::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Returns the pre-registered instance of `T`, or constructs one through
    /// its registered factory.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unresolvable`] when neither exists,
    /// [`ResolveError::Cycle`] when `T`'s construction requires `T`, or the
    /// factory's own error.
    pub fn resolve_or_create<T: Send + Sync + 'static>(&self) -> ResolveResult<Arc<T>> {
        let name = type_name::<T>();
        let instance = match self.lookup_erased(TypeId::of::<T>()) {
            Some(instance) => instance,
            None => self
                .construct_with_factory(TypeId::of::<T>(), name)
                .unwrap_or_else(|| {
                    Err(ResolveError::Unresolvable {
                        type_name: name.to_owned(),
                    })
                })?,
        };
        downcast(instance, name)
    }

    /// Like [`resolve_or_create`](Self::resolve_or_create), falling back to
    /// [`Resolve::resolve`] when no factory is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cycle`] on re-entrant construction, or any
    /// error reported by the factory or `T::resolve`.
    pub fn activate<T: Resolve>(&self) -> ResolveResult<Arc<T>> {
        let name = type_name::<T>();
        let instance = match self.lookup_erased(TypeId::of::<T>()) {
            Some(instance) => instance,
            None => match self.construct_with_factory(TypeId::of::<T>(), name) {
                Some(result) => result?,
                None => self.guarded(TypeId::of::<T>(), name, || activate::<T>(self))?,
            },
        };
        downcast(instance, name)
    }

    pub(crate) fn lookup_erased(&self, id: TypeId) -> Option<Instance> {
        let instances = self.instances.read().ok()?;
        instances.get(&id).cloned()
    }

    /// Runs the registered factory for `id`; `None` when there is none.
    pub(crate) fn construct_with_factory(
        &self,
        id: TypeId,
        type_name: &str,
    ) -> Option<ResolveResult<Instance>> {
        let factory = {
            let factories = self.factories.read().ok()?;
            factories.get(&id).cloned()
        }?;
        Some(self.guarded(id, type_name, || factory(self)))
    }

    pub(crate) fn guarded<F>(&self, id: TypeId, type_name: &str, construct: F) -> ResolveResult<Instance>
    where
        F: FnOnce() -> ResolveResult<Instance>,
    {
        let key = (thread::current().id(), id);
        {
            let mut constructing = self
                .constructing
                .lock()
                .expect("service construction stack poisoned");
            if constructing.contains(&key) {
                return Err(ResolveError::Cycle {
                    type_name: type_name.to_owned(),
                });
            }
            constructing.push(key);
        }

        let _guard = ConstructionGuard {
            services: self,
            key,
        };
        construct()
    }
}

struct ConstructionGuard<'a> {
    services: &'a Services,
    key: (ThreadId, TypeId),
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut constructing) = self.services.constructing.lock() {
            if let Some(pos) = constructing.iter().rposition(|entry| *entry == self.key) {
                constructing.remove(pos);
            }
        }
    }
}

fn downcast<T: Any + Send + Sync>(instance: Instance, name: &str) -> ResolveResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ResolveError::construction(name, "registered value has a different type"))
}

/// Obtains at most one instance per owning type for one discovery pass.
///
/// The resolver remembers every outcome, success or failure, so a type is
/// resolved once no matter how many of its methods are scanned.
pub struct InstanceResolver<'a> {
    services: &'a Services,
    resolved: HashMap<TypeId, ResolveResult<Instance>>,
    constructions: usize,
}

impl<'a> InstanceResolver<'a> {
    /// Starts a fresh pass over `services`.
    #[must_use]
    pub fn new(services: &'a Services) -> Self {
        Self {
            services,
            resolved: HashMap::new(),
            constructions: 0,
        }
    }

    /// Returns the instance for `ty`: the pre-registered one, else one built
    /// by its factory, else one built by its activator.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unresolvable`] when none of the three exist, or
    /// the failure reported while constructing.
    pub fn resolve(&mut self, ty: &TypeInfo) -> ResolveResult<Instance> {
        if let Some(outcome) = self.resolved.get(&ty.id()) {
            return outcome.clone();
        }

        let outcome = self.resolve_uncached(ty);
        self.resolved.insert(ty.id(), outcome.clone());
        outcome
    }

    /// Number of types resolved so far in this pass.
    #[must_use]
    pub fn resolutions(&self) -> usize {
        self.resolved.len()
    }

    /// Number of instances constructed (as opposed to looked up) so far.
    #[must_use]
    pub const fn constructions(&self) -> usize {
        self.constructions
    }

    fn resolve_uncached(&mut self, ty: &TypeInfo) -> ResolveResult<Instance> {
        if let Some(instance) = self.services.lookup_erased(ty.id()) {
            debug!(owner = ty.name(), "using pre-registered instance");
            return Ok(instance);
        }

        if let Some(outcome) = self.services.construct_with_factory(ty.id(), ty.name()) {
            self.constructions += 1;
            debug!(owner = ty.name(), ok = outcome.is_ok(), "constructed instance via factory");
            return outcome;
        }

        if let Some(activator) = ty.activator() {
            self.constructions += 1;
            let outcome = self
                .services
                .guarded(ty.id(), ty.name(), || activator(self.services));
            debug!(owner = ty.name(), ok = outcome.is_ok(), "constructed instance via activator");
            return outcome;
        }

        Err(ResolveError::Unresolvable {
            type_name: ty.name().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Config {
        endpoint: String,
    }

    struct Client {
        endpoint: String,
    }

    struct Loop;

    impl Resolve for Client {
        fn resolve(services: &Services) -> ResolveResult<Self> {
            let config = services.resolve_or_create::<Config>()?;
            Ok(Self {
                endpoint: config.endpoint.clone(),
            })
        }
    }

    impl Resolve for Loop {
        fn resolve(services: &Services) -> ResolveResult<Self> {
            services.activate::<Loop>().map(|_| Loop)
        }
    }

    fn config() -> Config {
        Config {
            endpoint: "https://weather.test".into(),
        }
    }

    #[test]
    fn factory_resolves_dependencies_recursively() {
        let services = Services::new();
        services.register_instance(config());
        services.register_factory(|s: &Services| {
            let config = s.resolve_or_create::<Config>()?;
            Ok(Client {
                endpoint: format!("{}/v1", config.endpoint),
            })
        });

        let client = services.resolve_or_create::<Client>().unwrap();
        assert_eq!(client.endpoint, "https://weather.test/v1");
    }

    #[test]
    fn pre_registered_instance_wins_over_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let services = Services::new();
        let counter = Arc::clone(&calls);
        services.register_factory(move |_: &Services| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(config())
        });
        services.register_instance(Config {
            endpoint: "registered".into(),
        });

        assert_eq!(services.resolve_or_create::<Config>().unwrap().endpoint, "registered");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn activate_falls_back_to_resolve_impl() {
        let services = Services::new();
        services.register_instance(config());
        let client = services.activate::<Client>().unwrap();
        assert_eq!(client.endpoint, "https://weather.test");
    }

    #[test]
    fn missing_registration_is_unresolvable() {
        let services = Services::new();
        let err = services.resolve_or_create::<Config>().err().expect("unresolvable");
        assert!(matches!(err, ResolveError::Unresolvable { .. }));
        assert!(services.lookup::<Config>().is_none());
    }

    #[test]
    fn self_dependency_reports_cycle() {
        let services = Services::new();
        let err = services.activate::<Loop>().err().expect("cycle");
        assert!(matches!(err, ResolveError::Cycle { .. }));
        // The construction stack unwinds, so a later attempt reports the same error.
        assert!(matches!(services.activate::<Loop>(), Err(ResolveError::Cycle { .. })));
    }

    #[test]
    fn resolver_memoises_outcomes_per_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let services = Services::new();
        let counter = Arc::clone(&calls);
        services.register_factory(move |_: &Services| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(config())
        });
        let ty = TypeInfo::builder::<Config>("Config").build().unwrap();
        let missing = TypeInfo::builder::<Client>("Client").build().unwrap();

        let mut resolver = InstanceResolver::new(&services);
        let first = resolver.resolve(&ty).unwrap();
        let second = resolver.resolve(&ty).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(resolver.resolve(&missing).is_err());
        assert!(resolver.resolve(&missing).is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.resolutions(), 2);
        assert_eq!(resolver.constructions(), 1);
    }
}
