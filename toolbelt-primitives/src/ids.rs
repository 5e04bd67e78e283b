//! Scan pass identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Unique identifier for one discovery pass over the module set.
///
/// Carried on the tracing span of every `enumerate()` call so log lines from
/// repeated passes can be told apart.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generates the identifier for a new pass.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell the passes of one process
    /// apart in log lines.
    #[must_use]
    pub fn short(&self) -> String {
        let mut buf = Uuid::encode_buffer();
        self.0.simple().encode_lower(&mut buf)[..8].to_owned()
    }
}

impl Display for ScanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ScanId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s).map_err(Error::from)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_output() {
        let id = ScanId::random();
        let parsed = id.to_string().parse::<ScanId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn short_form_prefixes_the_full_id() {
        let id = ScanId::random();
        let short = id.short();
        assert_eq!(short.len(), 8);
        assert!(id.to_string().starts_with(&short));
        assert_ne!(ScanId::random(), id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "not-a-uuid".parse::<ScanId>().expect_err("should fail");
        assert!(matches!(err, Error::InvalidScanId { .. }));
    }
}
