//! Descriptor building: names, contract strings, and bound invokers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use toolbelt_primitives::{CapabilityDeclaration, ParamRole, ParamSpec, ReturnSpec};

use crate::error::ToolResult;
use crate::invoke::{Arguments, Callable, Instance, Invoker};
use crate::scanner::MethodCandidate;
use crate::schema;

/// Placeholder used when a declaration carries no description.
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Self-describing invocation record handed to the orchestrator.
#[derive(Clone)]
pub struct CallableDescriptor {
    name: String,
    description: String,
    parameter_doc: String,
    return_doc: String,
    on_failure: Option<String>,
    owner: String,
    method: String,
    params: Vec<ParamSpec>,
    bound_target: Option<Instance>,
    invoker: Invoker,
}

impl CallableDescriptor {
    /// Name advertised to the orchestrator.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Combined description: summary, parameters, and return contract.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameter documentation embedded in the description.
    #[must_use]
    pub fn parameter_doc(&self) -> &str {
        &self.parameter_doc
    }

    /// Return documentation embedded in the description.
    #[must_use]
    pub fn return_doc(&self) -> &str {
        &self.return_doc
    }

    /// Failure hint from the declaration. Not enforced.
    #[must_use]
    pub fn on_failure(&self) -> Option<&str> {
        self.on_failure.as_deref()
    }

    /// Display name of the owning type.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Raw method identifier.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Instance the adapter is bound to; `None` for static methods.
    #[must_use]
    pub fn bound_target(&self) -> Option<&Instance> {
        self.bound_target.as_ref()
    }

    /// JSON-schema object describing the arguments.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        schema::parameters_schema(&self.params)
    }

    /// Serialisable summary for function-calling runtimes.
    #[must_use]
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }

    /// Invokes the wrapped method with arguments keyed by parameter name.
    /// Without a cancellation signal the method receives a token that is
    /// never cancelled.
    ///
    /// # Errors
    ///
    /// Returns argument errors, a target mismatch, or the callable's own
    /// failure as [`ToolError::Execution`](crate::ToolError::Execution).
    pub async fn invoke(
        &self,
        arguments: Map<String, Value>,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value> {
        let cancel = cancel.unwrap_or_default();
        (self.invoker)(self.bound_target.clone(), Arguments::new(arguments), cancel).await
    }

    /// Like [`invoke`](Self::invoke) for arguments supplied as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ArgumentsNotObject`](crate::ToolError::ArgumentsNotObject)
    /// when `arguments` is neither an object nor `null`, otherwise as
    /// [`invoke`](Self::invoke).
    pub async fn invoke_value(
        &self,
        arguments: Value,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value> {
        let arguments = Arguments::from_value(arguments)?;
        let cancel = cancel.unwrap_or_default();
        (self.invoker)(self.bound_target.clone(), arguments, cancel).await
    }
}

impl fmt::Debug for CallableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("owner", &self.owner)
            .field("method", &self.method)
            .field("bound", &self.bound_target.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Callable for CallableDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        CallableDescriptor::parameters_schema(self)
    }

    async fn call(
        &self,
        arguments: Map<String, Value>,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value> {
        self.invoke(arguments, cancel).await
    }
}

/// Serialisable view of a descriptor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// Combined description.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

/// Builds the descriptor for one candidate. `instance` is ignored for static
/// methods.
#[must_use]
pub fn build_descriptor(candidate: &MethodCandidate, instance: Option<Instance>) -> CallableDescriptor {
    let method = candidate.method();
    let declaration = method.declaration().cloned().unwrap_or_default();

    let name = descriptor_name(&declaration, method.ident());
    let parameter_doc = declaration
        .input_params()
        .map_or_else(|| parameter_doc(method.params()), str::to_owned);
    let return_doc = declaration
        .output_params()
        .map_or_else(|| return_doc(method.returns()), str::to_owned);
    let description = compose_description(declaration.description(), &parameter_doc, &return_doc);

    CallableDescriptor {
        name,
        description,
        parameter_doc,
        return_doc,
        on_failure: declaration.on_failure().map(str::to_owned),
        owner: candidate.owner().name().to_owned(),
        method: method.ident().to_owned(),
        params: method.params().to_vec(),
        bound_target: if method.is_static() { None } else { instance },
        invoker: method.invoker().clone(),
    }
}

/// Trimmed declared name, or the raw identifier when the declaration has no
/// name or only whitespace.
#[must_use]
pub fn descriptor_name(declaration: &CapabilityDeclaration, ident: &str) -> String {
    match declaration.name().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => ident.to_owned(),
    }
}

/// Renders `"<type> <name>"` per value parameter, with an `" (optional)"`
/// suffix where applicable, joined by `", "`.
#[must_use]
pub fn parameter_doc(params: &[ParamSpec]) -> String {
    params
        .iter()
        .filter(|param| param.role() != ParamRole::Cancellation)
        .map(|param| {
            let optional = if param.is_optional() { " (optional)" } else { "" };
            format!("{} {}{optional}", param.ty().pretty(), param.name())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the effective return type, or `"void"`.
#[must_use]
pub fn return_doc(returns: &ReturnSpec) -> String {
    returns
        .effective()
        .map_or_else(|| "void".to_owned(), |ty| ty.pretty())
}

/// Combines the summary with the parameter and return documentation.
#[must_use]
pub fn compose_description(description: Option<&str>, parameter_doc: &str, return_doc: &str) -> String {
    let summary = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);
    format!("{summary} Parameters: {parameter_doc}. Returns: {return_doc}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;
    use toolbelt_primitives::TypeDescription;

    use crate::invoke::InvokeFuture;
    use crate::reflect::{MethodInfo, Receiver, TypeInfo};
    use crate::ToolError;

    struct Counter {
        start: i64,
    }

    fn echo_invoker(target: Option<Instance>, args: Arguments, _: CancellationToken) -> InvokeFuture {
        Box::pin(async move {
            let bound = target.is_some();
            let value = args.optional::<i64>("value")?;
            Ok::<_, ToolError>(json!({ "bound": bound, "value": value }))
        })
    }

    fn candidate(method: MethodInfo) -> MethodCandidate {
        let owner = TypeInfo::builder::<Counter>("Counter").build().unwrap();
        MethodCandidate::new(Arc::new(owner), method)
    }

    fn weather_method(declaration: CapabilityDeclaration) -> MethodInfo {
        MethodInfo::new("get_weather", Receiver::Instance, echo_invoker)
            .with_declaration(declaration)
            .with_param(ParamSpec::value("city", TypeDescription::named("string")))
            .with_param(ParamSpec::cancellation("cancel"))
            .with_returns(ReturnSpec::asynchronous(Some(TypeDescription::array(
                TypeDescription::named("string"),
            ))))
    }

    #[test]
    fn composes_description_literal() {
        let method = weather_method(CapabilityDeclaration::new().with_description("Get weather"));
        let descriptor = build_descriptor(&candidate(method), None);
        assert_eq!(descriptor.parameter_doc(), "string city");
        assert_eq!(descriptor.return_doc(), "string[]");
        assert_eq!(
            descriptor.description(),
            "Get weather Parameters: string city. Returns: string[]."
        );
    }

    #[test]
    fn absent_description_uses_placeholder() {
        let descriptor = build_descriptor(&candidate(weather_method(CapabilityDeclaration::new())), None);
        assert_eq!(
            descriptor.description(),
            "No description provided. Parameters: string city. Returns: string[]."
        );

        let blank = CapabilityDeclaration::new().with_description("   ");
        let descriptor = build_descriptor(&candidate(weather_method(blank)), None);
        assert!(descriptor.description().starts_with(NO_DESCRIPTION));
    }

    #[test]
    fn name_falls_back_to_identifier() {
        for name in ["", "   "] {
            let declaration = CapabilityDeclaration::new().with_name(name);
            assert_eq!(descriptor_name(&declaration, "get_weather"), "get_weather");
        }
        let declaration = CapabilityDeclaration::new().with_name("  Foo ");
        assert_eq!(descriptor_name(&declaration, "get_weather"), "Foo");
        assert_eq!(descriptor_name(&CapabilityDeclaration::new(), "get_weather"), "get_weather");
    }

    #[test]
    fn overrides_are_used_verbatim() {
        let declaration = CapabilityDeclaration::new()
            .with_input_params("")
            .with_output_params("string outfitSuggestion")
            .with_on_failure("Return an error message.");
        let descriptor = build_descriptor(&candidate(weather_method(declaration)), None);
        assert_eq!(
            descriptor.description(),
            "No description provided. Parameters: . Returns: string outfitSuggestion."
        );
        assert_eq!(descriptor.on_failure(), Some("Return an error message."));
    }

    #[test]
    fn optional_params_are_marked() {
        let params = [
            ParamSpec::value("person", TypeDescription::named("String")),
            ParamSpec::value("clothes", TypeDescription::named("String")).optional(),
        ];
        assert_eq!(parameter_doc(&params), "String person, String clothes (optional)");
        assert_eq!(parameter_doc(&[]), "");
    }

    #[test]
    fn return_doc_unwraps_async() {
        assert_eq!(return_doc(&ReturnSpec::asynchronous(None)), "void");
        assert_eq!(return_doc(&ReturnSpec::void()), "void");
        let mapping = TypeDescription::generic(
            "HashMap",
            vec![TypeDescription::named("String"), TypeDescription::named("i32")],
        );
        assert_eq!(return_doc(&ReturnSpec::value(mapping).fallible()), "HashMap<String, i32>");
    }

    #[tokio::test]
    async fn static_methods_drop_the_instance() {
        let method = MethodInfo::new("reset", Receiver::Static, echo_invoker)
            .with_declaration(CapabilityDeclaration::new());
        let instance: Instance = Arc::new(Counter { start: 1 });
        let descriptor = build_descriptor(&candidate(method), Some(instance));
        assert!(descriptor.bound_target().is_none());

        let output = descriptor.invoke(Map::new(), None).await.unwrap();
        assert_eq!(output, json!({ "bound": false, "value": null }));
    }

    #[tokio::test]
    async fn instance_methods_bind_the_target() {
        let instance: Instance = Arc::new(Counter { start: 5 });
        let descriptor = build_descriptor(
            &candidate(weather_method(CapabilityDeclaration::new())),
            Some(Arc::clone(&instance)),
        );
        let bound = descriptor.bound_target().expect("bound");
        assert!(Arc::ptr_eq(bound, &instance));
        assert_eq!(bound.downcast_ref::<Counter>().map(|c| c.start), Some(5));

        let output = descriptor
            .invoke_value(json!({ "value": 3 }), None)
            .await
            .unwrap();
        assert_eq!(output, json!({ "bound": true, "value": 3 }));
    }
}
