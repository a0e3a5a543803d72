//! Error types for the coedit engine.

use crate::{OperationKind, Position, Span};
use thiserror::Error;

/// All possible errors from the coedit engine.
///
/// Every variant describes a structural invariant violation on a submitted
/// operation. Malformed operations are rejected atomically: the log and
/// version are left unchanged. Recoverable situations (resolving an unknown
/// conflict id) are signalled by return values, not errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("negative position: {0}")]
    NegativePosition(Position),

    #[error("negative length: {0}")]
    NegativeLength(Span),

    #[error("{kind} operation requires content")]
    MissingContent { kind: OperationKind },

    #[error("{kind} operation requires a length")]
    MissingLength { kind: OperationKind },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::NegativePosition(-5);
        assert_eq!(err.to_string(), "negative position: -5");

        let err = Error::MissingContent {
            kind: OperationKind::Insert,
        };
        assert_eq!(err.to_string(), "insert operation requires content");

        let err = Error::MissingLength {
            kind: OperationKind::Replace,
        };
        assert_eq!(err.to_string(), "replace operation requires a length");
    }
}
