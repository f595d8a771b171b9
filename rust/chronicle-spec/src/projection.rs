use crate::Specification;

/// How a bound match tuple is shaped into the row emitted to the caller
/// (spec §3).
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// Emit the referenced fact.
    Fact(String),
    /// Emit a scalar field of the referenced fact.
    Field(String, String),
    /// Emit the referenced fact's hash.
    Hash(String),
    /// Emit a record. Field order is the declaration order, preserved for
    /// faithful text round-tripping.
    Composite(Vec<(String, Projection)>),
    /// Emit a lazy child collection, evaluated against this row's bindings.
    Specification(Box<Specification>),
}

impl Projection {
    /// The labels this projection reads directly (not recursing into a
    /// nested [`Projection::Specification`], whose own given-labels are
    /// bound separately at evaluation time).
    pub fn referenced_labels(&self) -> Vec<&str> {
        match self {
            Projection::Fact(label) | Projection::Hash(label) | Projection::Field(label, _) => {
                vec![label.as_str()]
            }
            Projection::Composite(fields) => fields
                .iter()
                .flat_map(|(_, projection)| projection.referenced_labels())
                .collect(),
            Projection::Specification(_) => Vec::new(),
        }
    }
}
