/// A named slot bound to a fact of a declared type: either a [`Given`](crate::Given)
/// input or a [`Match`](crate::Match) unknown (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    /// The label's name, unique within its specification's scope.
    pub name: String,
    /// The declared fact type.
    pub fact_type: String,
}

impl Label {
    /// Construct a label.
    pub fn new(name: impl Into<String>, fact_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fact_type: fact_type.into(),
        }
    }
}

/// One segment of a path: walk the predecessor edge named `name`, which is
/// declared to point at facts of type `predecessor_type`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    /// The predecessor role name.
    pub name: String,
    /// The fact type at the far end of the edge.
    pub predecessor_type: String,
}

impl Role {
    /// Construct a role step.
    pub fn new(name: impl Into<String>, predecessor_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predecessor_type: predecessor_type.into(),
        }
    }
}
