//! Capability declarations attached to methods.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Metadata identifying a method as a capability.
///
/// Every field is optional. Overrides are taken verbatim: no validation is
/// performed on their contents, so an empty override produces an empty
/// section in the final description.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<Cow<'static, str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<Cow<'static, str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_params: Option<Cow<'static, str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_params: Option<Cow<'static, str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_failure: Option<Cow<'static, str>>,
}

impl CapabilityDeclaration {
    /// Creates an empty declaration; every field falls back to what the
    /// method signature provides.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            description: None,
            input_params: None,
            output_params: None,
            on_failure: None,
        }
    }

    /// Overrides the capability name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the short description shown to the orchestrator.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the synthesized parameter documentation.
    #[must_use]
    pub fn with_input_params(mut self, input_params: impl Into<Cow<'static, str>>) -> Self {
        self.input_params = Some(input_params.into());
        self
    }

    /// Replaces the synthesized return documentation.
    #[must_use]
    pub fn with_output_params(mut self, output_params: impl Into<Cow<'static, str>>) -> Self {
        self.output_params = Some(output_params.into());
        self
    }

    /// Attaches a failure hint. Informational only.
    #[must_use]
    pub fn with_on_failure(mut self, on_failure: impl Into<Cow<'static, str>>) -> Self {
        self.on_failure = Some(on_failure.into());
        self
    }

    /// Declared name override, untrimmed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared description, untrimmed.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Parameter documentation override.
    #[must_use]
    pub fn input_params(&self) -> Option<&str> {
        self.input_params.as_deref()
    }

    /// Return documentation override.
    #[must_use]
    pub fn output_params(&self) -> Option<&str> {
        self.output_params.as_deref()
    }

    /// Failure hint.
    #[must_use]
    pub fn on_failure(&self) -> Option<&str> {
        self.on_failure.as_deref()
    }
}
