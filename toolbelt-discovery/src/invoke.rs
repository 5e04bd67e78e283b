//! Invocation adapter plumbing shared by descriptors and generated bindings.

use std::any::{Any, type_name};
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{ToolError, ToolResult};

/// Type-erased instance of an owning type.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Future returned by invocation adapters.
pub type InvokeFuture = BoxFuture<'static, ToolResult<Value>>;

/// Adapter wrapping one method: receives the bound target (absent for static
/// methods), the named arguments, and the cancellation signal.
pub type Invoker =
    Arc<dyn Fn(Option<Instance>, Arguments, CancellationToken) -> InvokeFuture + Send + Sync>;

/// Anything an orchestrator can call by name.
///
/// Discovered descriptors implement it, and so can hand-written tools that
/// should sit in the same [`Toolset`](crate::Toolset).
#[async_trait]
pub trait Callable: Send + Sync {
    /// Name advertised to the orchestrator.
    fn name(&self) -> &str;

    /// Description advertised to the orchestrator.
    fn description(&self) -> &str;

    /// JSON-schema object describing the arguments.
    fn parameters_schema(&self) -> Value;

    /// Invokes the callable with arguments keyed by parameter name.
    async fn call(
        &self,
        arguments: Map<String, Value>,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value>;

    /// Like [`call`](Self::call) for arguments supplied as a JSON value.
    /// `null` stands for no arguments.
    async fn call_value(
        &self,
        arguments: Value,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value> {
        let arguments = Arguments::from_value(arguments)?;
        self.call(arguments.into_map(), cancel).await
    }
}

/// Named arguments supplied to an invocation.
#[derive(Clone, Debug, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Wraps a JSON object.
    #[must_use]
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Accepts any JSON value that is an object; `null` counts as no
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ArgumentsNotObject`] for other JSON kinds.
    pub fn from_value(value: Value) -> ToolResult<Self> {
        match value {
            Value::Object(values) => Ok(Self(values)),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::ArgumentsNotObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Deserialises a required argument.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingArgument`] when the argument is absent or
    /// `null`, and [`ToolError::InvalidArgument`] when it does not fit `T`.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> ToolResult<T> {
        self.optional(name)?.ok_or_else(|| ToolError::MissingArgument {
            name: name.to_owned(),
        })
    }

    /// Deserialises an optional argument. Absence and `null` both yield
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] when a present value does not
    /// fit `T`.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> ToolResult<Option<T>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| ToolError::InvalidArgument {
                    name: name.to_owned(),
                    reason: err.to_string(),
                }),
        }
    }

    /// Returns the raw argument map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the arguments, returning the raw map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self(values)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Recovers the concrete target of an instance method.
///
/// # Errors
///
/// Returns [`ToolError::TargetMismatch`] when the target is absent or of
/// another type.
pub fn downcast_target<T: Any + Send + Sync>(
    target: Option<Instance>,
    method: &str,
) -> ToolResult<Arc<T>> {
    target
        .and_then(|instance| instance.downcast::<T>().ok())
        .ok_or_else(|| ToolError::TargetMismatch {
            method: method.to_owned(),
            expected: type_name::<T>(),
        })
}

/// Serialises a callable's return value.
///
/// # Errors
///
/// Returns [`ToolError::Serialization`] when `serde_json` rejects the value.
pub fn to_output<T: Serialize>(value: T) -> ToolResult<Value> {
    serde_json::to_value(value).map_err(|err| ToolError::Serialization {
        reason: err.to_string(),
    })
}

/// Maps the error half of a fallible callable's result.
pub fn execution_error<E: Display>(err: E) -> ToolError {
    ToolError::execution(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn arguments(value: Value) -> Arguments {
        Arguments::from_value(value).unwrap()
    }

    #[test]
    fn required_and_optional_arguments() {
        let args = arguments(json!({ "city": "Oslo", "days": 3, "unit": null }));

        assert_eq!(args.required::<String>("city").unwrap(), "Oslo");
        assert_eq!(args.optional::<u32>("days").unwrap(), Some(3));
        assert_eq!(args.optional::<String>("unit").unwrap(), None);
        assert_eq!(args.optional::<String>("absent").unwrap(), None);

        let err = args.required::<String>("absent").expect_err("missing");
        assert!(matches!(err, ToolError::MissingArgument { name } if name == "absent"));

        let err = args.required::<u32>("city").expect_err("wrong type");
        assert!(matches!(err, ToolError::InvalidArgument { name, .. } if name == "city"));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = Arguments::from_value(json!([1, 2])).expect_err("array");
        assert!(matches!(err, ToolError::ArgumentsNotObject { found: "an array" }));
        assert!(Arguments::from_value(Value::Null).unwrap().as_map().is_empty());
    }

    #[test]
    fn downcast_checks_target_type() {
        let target: Instance = Arc::new(7_u8);
        assert_eq!(*downcast_target::<u8>(Some(Arc::clone(&target)), "m").unwrap(), 7);

        let err = downcast_target::<String>(Some(target), "m").expect_err("mismatch");
        assert!(matches!(err, ToolError::TargetMismatch { .. }));
        assert!(downcast_target::<u8>(None, "m").is_err());
    }

    #[test]
    fn unit_output_is_null() {
        assert_eq!(to_output(()).unwrap(), Value::Null);
        assert_eq!(to_output(vec!["a"]).unwrap(), json!(["a"]));
    }
}
