use chronicle_facts::FactReference;
use thiserror::Error;

/// Why a caller's given tuple does not match a specification's declared
/// inputs (spec §7, `GivenMismatch`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GivenMismatchKind {
    /// Wrong number of given references.
    #[error("expected {expected} given(s), got {actual}")]
    Count { expected: usize, actual: usize },
    /// A given reference's type does not match its label's declared type.
    #[error("given {label:?} expects type {expected_type:?}, got {actual_type:?}")]
    Type {
        label: String,
        expected_type: String,
        actual_type: String,
    },
}

/// Failures the evaluator can surface while running a specification against
/// a store (spec §4.3, §7).
#[derive(Error, Debug)]
pub enum QueryError<E> {
    /// A path condition walked a predecessor role not declared on the fact
    /// type at that end of the chain.
    #[error("fact type {fact_type:?} has no predecessor role {role:?}")]
    SchemaError { fact_type: String, role: String },

    /// The given tuple passed to `read`/`watch` does not match the
    /// specification's declared givens.
    #[error("given mismatch: {0}")]
    GivenMismatch(GivenMismatchKind),

    /// A nested specification's given label could not be resolved against
    /// the enclosing row's bindings.
    #[error("nested specification given {0:?} is not bound in the enclosing row")]
    UnresolvedNestedGiven(String),

    /// A binding referenced a fact that the store claims not to have,
    /// despite having produced the reference itself.
    #[error("fact {0} vanished from the store mid-evaluation")]
    MissingFact(FactReference),

    /// Evaluation exceeded the configured time budget.
    #[error("evaluation exceeded the configured time budget of {budget_ms}ms")]
    EvaluationTimeout { budget_ms: u64 },

    /// Existential or nested-specification recursion exceeded the
    /// configured depth limit.
    #[error("specification nesting exceeded the configured depth limit of {max_depth}")]
    SpecificationTooDeep { max_depth: usize },

    /// The underlying store failed.
    #[error("store failed: {0}")]
    StoreError(#[source] E),
}
