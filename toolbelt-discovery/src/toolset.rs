//! Name-keyed dispatch over discovered descriptors and hand-written tools.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::descriptor::{CallableDescriptor, ToolSpec};
use crate::error::{ToolError, ToolResult};
use crate::invoke::Callable;

/// Callables indexed by name, for orchestrators that dispatch by the name
/// the model selected.
///
/// Unlike the registry, a toolset refuses duplicate names.
#[derive(Clone, Default)]
pub struct Toolset {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Callable>>,
}

impl Toolset {
    /// Creates an empty toolset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `descriptors`, keeping their order for listing.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] for the first name reported twice.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = CallableDescriptor>,
    ) -> ToolResult<Self> {
        let mut toolset = Self::new();
        for descriptor in descriptors {
            toolset.insert(descriptor)?;
        }
        Ok(toolset)
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn insert(&mut self, descriptor: CallableDescriptor) -> ToolResult<()> {
        self.insert_callable(Arc::new(descriptor))
    }

    /// Adds any callable, discovered or not.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn insert_callable(&mut self, tool: Arc<dyn Callable>) -> ToolResult<()> {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Returns the callable matching `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Callable> {
        self.tools.get(name).map(|tool| &**tool)
    }

    /// Invokes the callable matching `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found, or
    /// whatever the invocation reports.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        cancel: Option<CancellationToken>,
    ) -> ToolResult<Value> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;
        tool.call(arguments, cancel).await
    }

    /// Lists the callables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Callable> {
        self.order.iter().filter_map(|name| self.get(name))
    }

    /// Serialisable specs in insertion order.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.iter()
            .map(|tool| ToolSpec {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the toolset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolset").field("tools", &self.order).finish()
    }
}
