use thiserror::Error;

/// The common error type used by this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactError {
    /// A field held a value that cannot be canonicalized (e.g. a non-finite
    /// number), so the fact's hash cannot be computed.
    #[error("fact is not serializable: {0}")]
    InvalidFact(String),

    /// Raw bytes could not be interpreted as a [`crate::Hash`].
    #[error("could not convert bytes into a hash (expected {expected} bytes, got {got})")]
    InvalidHash {
        /// Expected byte length of a hash.
        expected: usize,
        /// Byte length actually supplied.
        got: usize,
    },

    /// A base64-encoded hash string could not be decoded.
    #[error("could not decode hash text: {0}")]
    InvalidHashText(String),
}
