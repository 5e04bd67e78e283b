//! Shared error definitions for toolbelt primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided scan identifier could not be parsed.
    #[error("invalid scan id: {source}")]
    InvalidScanId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A resolution failure policy name was not recognised.
    #[error("unknown resolution failure policy `{value}` (expected `abort` or `isolate`)")]
    UnknownPolicy {
        /// The offending value.
        value: String,
    },
}
