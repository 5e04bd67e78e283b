//! Structural type descriptions and the pretty printer used in capability
//! contracts.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Structural description of a parameter or return type.
///
/// Built once per declared type, either by the `#[toolbox]` macro from the
/// Rust signature or by hand for runtime registration tables. Rendering is a
/// pure function of this value.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDescription {
    /// A named type without structure worth rendering.
    Primitive {
        /// Type name, possibly path-qualified.
        name: Cow<'static, str>,
    },
    /// A homogeneous sequence.
    Array {
        /// Element type.
        element: Box<TypeDescription>,
    },
    /// A generic type applied to type arguments.
    Generic {
        /// Generic type name, possibly carrying an arity suffix such as
        /// `` Dictionary`2 ``.
        name: Cow<'static, str>,
        /// Type arguments in declaration order.
        args: Vec<TypeDescription>,
    },
}

impl TypeDescription {
    /// Describes a plain named type.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Primitive { name: name.into() }
    }

    /// Describes an array of `element`.
    #[must_use]
    pub fn array(element: TypeDescription) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Describes a generic type applied to `args`.
    #[must_use]
    pub fn generic(name: impl Into<Cow<'static, str>>, args: Vec<TypeDescription>) -> Self {
        Self::Generic {
            name: name.into(),
            args,
        }
    }

    /// Returns the unqualified name of the outermost type, or `None` for
    /// arrays.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Primitive { name } | Self::Generic { name, .. } => Some(bare_name(name)),
            Self::Array { .. } => None,
        }
    }

    /// Renders the type the way it appears in capability descriptions.
    ///
    /// Arrays render as `element[]`, generics as `Name<A, B>` with any arity
    /// suffix removed, everything else as its bare name. A generic with no
    /// arguments degrades to its bare name.
    #[must_use]
    pub fn pretty(&self) -> String {
        match self {
            Self::Primitive { name } => bare_name(name).to_owned(),
            Self::Array { element } => format!("{}[]", element.pretty()),
            Self::Generic { name, args } => {
                let name = strip_arity(bare_name(name));
                if args.is_empty() {
                    return name.to_owned();
                }
                let args = args
                    .iter()
                    .map(TypeDescription::pretty)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}<{args}>")
            }
        }
    }
}

impl Display for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

fn bare_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn strip_arity(name: &str) -> &str {
    name.split('`').next().unwrap_or(name)
}
