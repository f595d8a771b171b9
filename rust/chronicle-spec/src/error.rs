use thiserror::Error;

/// A position in the source text of a parsed specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    /// Zero-based byte offset.
    pub offset: usize,
}

/// The textual specification could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at byte {position:?}: expected {expected}")]
pub struct ParseError {
    /// Where in the input the parser gave up.
    pub position: Position,
    /// What the parser expected to find there.
    pub expected: String,
}

/// The kind of AST invariant an [`Invalid`] violation breaks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidKind {
    /// A label was referenced that is not declared as a given, an earlier
    /// match's unknown, or an enclosing match's unknown.
    #[error("label {0:?} is not in scope")]
    UnknownLabel(String),
    /// Two distinct labels were declared with the same name, or an alpha
    /// transform mapped two distinct source labels onto the same target.
    #[error("label {0:?} is declared more than once")]
    DuplicateLabel(String),
}

/// A [`crate::Specification`] violates a structural invariant (spec §4.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid specification: {0}")]
pub struct Invalid(pub InvalidKind);
