//! Structured error types for the orfeval workspace.

use thiserror::Error;

/// Unified error type for all orfeval operations.
#[derive(Debug, Error)]
pub enum OrfevalError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed table row, bad model file)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values, mismatched lengths)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation was called on data in the wrong state, e.g. an unscaled
    /// dataset passed to a classifier.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A result violated a structural invariant (e.g. a gene carrying more
    /// than one label category).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the orfeval workspace.
pub type Result<T> = std::result::Result<T, OrfevalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = OrfevalError::Precondition("dataset has not been scaled".into());
        assert_eq!(err.to_string(), "precondition failed: dataset has not been scaled");

        let err = OrfevalError::Invariant("2 labels".into());
        assert_eq!(err.to_string(), "invariant violated: 2 labels");
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/nonexistent/orfeval/file")?)
        }
        assert!(matches!(open(), Err(OrfevalError::Io(_))));
    }
}
