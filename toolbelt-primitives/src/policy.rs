//! Resolution failure policy.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Decides what a discovery pass does when an owning type cannot be
/// instantiated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionFailurePolicy {
    /// Abort the whole pass and return the resolution error to the caller.
    #[default]
    Abort,
    /// Skip the failing type's methods, record a diagnostic, keep going.
    Isolate,
}

impl ResolutionFailurePolicy {
    /// Returns the lowercase configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Isolate => "isolate",
        }
    }
}

impl Display for ResolutionFailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "isolate" => Ok(Self::Isolate),
            _ => Err(Error::UnknownPolicy { value: s.into() }),
        }
    }
}
