use chronicle_spec::Invalid;
use thiserror::Error;

/// Compiling an inverse failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InverseError {
    /// A synthesized inner specification violated a scoping invariant.
    /// This would indicate a bug in the compiler itself, since the inputs
    /// it patches are drawn from an already-validated specification.
    #[error("synthesized inverse specification is invalid: {0}")]
    InvalidInnerSpecification(#[from] Invalid),
}
