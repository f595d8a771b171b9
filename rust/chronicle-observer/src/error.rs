use chronicle_inverse::InverseError;
use thiserror::Error;

/// Failures that can keep an [`crate::Observer`] from staying current
/// (spec §4.6, failure model).
#[derive(Error, Debug, Clone)]
pub enum ObserverError {
    /// Compiling the watched specification's inverses failed. Reported
    /// once, up front, by `watch`; this only happens for a malformed
    /// specification.
    #[error("failed to compile inverses for the watched specification: {0}")]
    InverseCompilation(#[from] InverseError),
    /// The store reported an error the observer could not recover from.
    /// Evaluator-level errors are logged and treated as non-fatal instead;
    /// only this variant marks the observer failed.
    #[error("store error while evaluating the watched specification: {0}")]
    Store(String),
    /// The background dispatch task was dropped or panicked before a
    /// `processed` barrier could be answered.
    #[error("observer's dispatch task is no longer running")]
    Stopped,
}
