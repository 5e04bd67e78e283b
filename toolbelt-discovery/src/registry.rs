//! Capability registry: the public discovery entry point.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use toolbelt_primitives::{ResolutionFailurePolicy, ScanId};
use tracing::{debug, info, info_span, warn};

use crate::descriptor::{CallableDescriptor, build_descriptor};
use crate::error::{DiscoveryError, DiscoveryResult, ResolveError};
use crate::module::{Module, ModuleEnumerator};
use crate::scanner::scan_module;
use crate::services::{InstanceResolver, Services};

/// A type whose instance methods were skipped because it could not be
/// instantiated. Its static methods are still described.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Module the type was found in.
    pub module: String,
    /// Owning type name.
    pub type_name: String,
    /// Resolution failure.
    pub error: ResolveError,
}

/// Outcome of one discovery pass.
#[derive(Clone, Debug)]
pub struct Discovery {
    /// Identifier of the pass, also recorded on its tracing span.
    pub scan_id: ScanId,
    /// Descriptors in module, type, method encounter order.
    pub descriptors: Vec<CallableDescriptor>,
    /// Types whose instance methods were skipped under
    /// [`ResolutionFailurePolicy::Isolate`].
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the ordered descriptor list handed to an orchestrator.
///
/// Names are not deduplicated: two owning types may expose the same name.
/// Use [`Toolset`](crate::Toolset) to reject collisions.
#[derive(Debug)]
pub struct CapabilityRegistry {
    services: Arc<Services>,
    modules: ModuleEnumerator,
    policy: ResolutionFailurePolicy,
}

impl CapabilityRegistry {
    /// Scans every static module, resolving instances through `services`.
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            modules: ModuleEnumerator::new(),
            policy: ResolutionFailurePolicy::default(),
        }
    }

    /// Scans exactly `modules` instead of every static module.
    #[must_use]
    pub fn with_modules(mut self, modules: Vec<Module>) -> Self {
        self.modules = ModuleEnumerator::explicit(modules);
        self
    }

    /// Replaces the module enumerator.
    #[must_use]
    pub fn with_enumerator(mut self, modules: ModuleEnumerator) -> Self {
        self.modules = modules;
        self
    }

    /// Sets the behaviour for owning types that cannot be instantiated.
    #[must_use]
    pub fn with_policy(mut self, policy: ResolutionFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the service container.
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Returns the configured failure policy.
    #[must_use]
    pub const fn policy(&self) -> ResolutionFailurePolicy {
        self.policy
    }

    /// Runs one discovery pass and returns the descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Resolution`] when an owning type cannot be
    /// instantiated and the policy is [`ResolutionFailurePolicy::Abort`].
    pub fn enumerate(&self) -> DiscoveryResult<Vec<CallableDescriptor>> {
        self.enumerate_with_report().map(|discovery| discovery.descriptors)
    }

    /// Runs one discovery pass, returning descriptors and diagnostics.
    ///
    /// Each owning type with at least one annotated instance method is
    /// resolved exactly once, when its first such method is reached. Static
    /// methods never touch the resolver.
    ///
    /// # Errors
    ///
    /// As [`enumerate`](Self::enumerate).
    pub fn enumerate_with_report(&self) -> DiscoveryResult<Discovery> {
        let scan_id = ScanId::random();
        let span = info_span!("scan", scan = %scan_id.short(), policy = %self.policy);
        let _entered = span.enter();

        let mut resolver = InstanceResolver::new(&self.services);
        let mut isolated: HashSet<TypeId> = HashSet::new();
        let mut descriptors = Vec::new();
        let mut diagnostics = Vec::new();

        let modules = self.modules.enumerate();
        for module in &modules {
            let candidates = scan_module(module);
            debug!(module = module.name(), candidates = candidates.len(), "scanned module");

            for candidate in &candidates {
                let owner = candidate.owner();
                let instance = if candidate.is_static() {
                    None
                } else if isolated.contains(&owner.id()) {
                    continue;
                } else {
                    match resolver.resolve(owner) {
                        Ok(instance) => Some(instance),
                        Err(error) => match self.policy {
                            ResolutionFailurePolicy::Abort => {
                                return Err(DiscoveryError::Resolution {
                                    type_name: owner.name().to_owned(),
                                    source: error,
                                });
                            }
                            ResolutionFailurePolicy::Isolate => {
                                warn!(
                                    module = module.name(),
                                    owner = owner.name(),
                                    %error,
                                    "skipping capabilities of unresolvable type"
                                );
                                isolated.insert(owner.id());
                                diagnostics.push(Diagnostic {
                                    module: module.name().to_owned(),
                                    type_name: owner.name().to_owned(),
                                    error,
                                });
                                continue;
                            }
                        },
                    }
                };

                let descriptor = build_descriptor(candidate, instance);
                debug!(
                    name = descriptor.name(),
                    owner = owner.name(),
                    method = descriptor.method(),
                    "discovered capability"
                );
                descriptors.push(descriptor);
            }
        }

        info!(
            modules = modules.len(),
            capabilities = descriptors.len(),
            resolved_types = resolver.resolutions(),
            constructed = resolver.constructions(),
            skipped_types = diagnostics.len(),
            "capability scan complete"
        );

        Ok(Discovery {
            scan_id,
            descriptors,
            diagnostics,
        })
    }
}

/// Wraps a registry so the descriptor list is built once.
///
/// Repeated [`CapabilityRegistry::enumerate`] calls re-run instance
/// resolution and any construction side effects; this layer keeps the first
/// successful result until [`refresh`](Self::refresh) is called.
#[derive(Debug)]
pub struct MemoizedRegistry {
    inner: CapabilityRegistry,
    cached: Mutex<Option<Vec<CallableDescriptor>>>,
}

impl MemoizedRegistry {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: CapabilityRegistry) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached descriptors, running a pass on first use. Failed
    /// passes are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying pass.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    pub fn enumerate(&self) -> DiscoveryResult<Vec<CallableDescriptor>> {
        let mut cached = self.cached.lock().expect("descriptor cache poisoned");
        if let Some(descriptors) = cached.as_ref() {
            return Ok(descriptors.clone());
        }
        let descriptors = self.inner.enumerate()?;
        *cached = Some(descriptors.clone());
        Ok(descriptors)
    }

    /// Discards the cached descriptors.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    pub fn refresh(&self) {
        self.cached.lock().expect("descriptor cache poisoned").take();
    }

    /// Returns the wrapped registry.
    #[must_use]
    pub fn inner(&self) -> &CapabilityRegistry {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;
    use toolbelt_primitives::{CapabilityDeclaration, ParamSpec, ReturnSpec, TypeDescription};

    use crate::invoke::{Arguments, Instance, InvokeFuture, downcast_target};
    use crate::reflect::{MethodInfo, Receiver, TypeInfo};
    use crate::{ResolveResult, ToolError};

    struct Mailer {
        sender: String,
    }

    struct Broken;

    fn send(target: Option<Instance>, args: Arguments, _: CancellationToken) -> InvokeFuture {
        Box::pin(async move {
            let mailer = downcast_target::<Mailer>(target, "send")?;
            let to = args.required::<String>("to")?;
            Ok::<_, ToolError>(json!(format!("{} -> {to}", mailer.sender)))
        })
    }

    fn noop(_: Option<Instance>, _: Arguments, _: CancellationToken) -> InvokeFuture {
        Box::pin(async { Ok::<_, ToolError>(Value::Null) })
    }

    fn mailer_type() -> TypeInfo {
        TypeInfo::builder::<Mailer>("Mailer")
            .with_method(
                MethodInfo::new("send", Receiver::Instance, send)
                    .with_declaration(CapabilityDeclaration::new().with_name("SendMail"))
                    .with_param(ParamSpec::value("to", TypeDescription::named("String")))
                    .with_returns(ReturnSpec::value(TypeDescription::named("String"))),
            )
            .with_method(
                MethodInfo::new("draft", Receiver::Instance, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .with_method(
                MethodInfo::new("ping", Receiver::Static, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .build()
            .unwrap()
    }

    fn broken_type() -> TypeInfo {
        TypeInfo::builder::<Broken>("Broken")
            .with_method(
                MethodInfo::new("explode", Receiver::Instance, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .with_method(
                MethodInfo::new("static_ok", Receiver::Static, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .build()
            .unwrap()
    }

    fn counting_services(calls: &Arc<AtomicUsize>) -> Arc<Services> {
        let services = Services::new();
        let counter = Arc::clone(calls);
        services.register_factory(move |_: &Services| -> ResolveResult<Mailer> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Mailer {
                sender: "ops@example.com".into(),
            })
        });
        Arc::new(services)
    }

    fn names(descriptors: &[CallableDescriptor]) -> Vec<&str> {
        descriptors.iter().map(CallableDescriptor::name).collect()
    }

    #[tokio::test]
    async fn resolves_each_owning_type_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new(counting_services(&calls))
            .with_modules(vec![Module::dynamic("mail").with_type(mailer_type())]);

        let descriptors = registry.enumerate().unwrap();
        assert_eq!(names(&descriptors), ["SendMail", "draft", "ping"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(descriptors[2].bound_target().is_none());

        let output = descriptors[0]
            .invoke_value(json!({ "to": "ana" }), None)
            .await
            .unwrap();
        assert_eq!(output, json!("ops@example.com -> ana"));
    }

    #[test]
    fn abort_policy_propagates_resolution_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new(counting_services(&calls)).with_modules(vec![
            Module::dynamic("mail").with_type(mailer_type()),
            Module::dynamic("broken").with_type(broken_type()),
        ]);

        let err = registry.enumerate().expect_err("abort");
        assert!(matches!(
            err,
            DiscoveryError::Resolution { type_name, source: ResolveError::Unresolvable { .. } }
                if type_name == "Broken"
        ));
    }

    #[test]
    fn isolate_policy_skips_only_the_failing_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new(counting_services(&calls))
            .with_policy(ResolutionFailurePolicy::Isolate)
            .with_modules(vec![
                Module::dynamic("broken").with_type(broken_type()),
                Module::dynamic("mail").with_type(mailer_type()),
            ]);

        let discovery = registry.enumerate_with_report().unwrap();
        assert_eq!(
            names(&discovery.descriptors),
            ["static_ok", "SendMail", "draft", "ping"]
        );
        assert_eq!(discovery.diagnostics.len(), 1);
        assert_eq!(discovery.diagnostics[0].type_name, "Broken");
        assert_eq!(discovery.diagnostics[0].module, "broken");
    }

    #[test]
    fn static_methods_never_resolve() {
        let services = Arc::new(Services::new());
        let statics = TypeInfo::builder::<Broken>("Broken")
            .with_method(
                MethodInfo::new("static_ok", Receiver::Static, noop)
                    .with_declaration(CapabilityDeclaration::new()),
            )
            .build()
            .unwrap();
        let registry = CapabilityRegistry::new(services)
            .with_modules(vec![Module::dynamic("statics").with_type(statics)]);

        let descriptors = registry.enumerate().unwrap();
        assert_eq!(names(&descriptors), ["static_ok"]);
    }

    #[test]
    fn repeated_passes_are_idempotent_but_reconstruct() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CapabilityRegistry::new(counting_services(&calls))
            .with_modules(vec![Module::dynamic("mail").with_type(mailer_type())]);

        let pairs = |descriptors: Vec<CallableDescriptor>| -> Vec<(String, String)> {
            descriptors
                .into_iter()
                .map(|d| (d.name().to_owned(), d.description().to_owned()))
                .collect()
        };
        let first = pairs(registry.enumerate().unwrap());
        let second = pairs(registry.enumerate().unwrap());
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn each_pass_gets_its_own_scan_id() {
        let registry = CapabilityRegistry::new(Arc::new(Services::new()))
            .with_modules(vec![Module::dynamic("empty")]);
        let first = registry.enumerate_with_report().unwrap();
        let second = registry.enumerate_with_report().unwrap();
        assert_ne!(first.scan_id, second.scan_id);
        assert_ne!(first.scan_id.short(), second.scan_id.short());
    }

    #[test]
    fn memoized_registry_constructs_once_until_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = MemoizedRegistry::new(
            CapabilityRegistry::new(counting_services(&calls))
                .with_modules(vec![Module::dynamic("mail").with_type(mailer_type())]),
        );

        assert_eq!(registry.enumerate().unwrap().len(), 3);
        assert_eq!(registry.enumerate().unwrap().len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.refresh();
        registry.enumerate().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
