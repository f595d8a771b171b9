use crate::{Label, Role};

/// A constraint attached to a [`crate::Given`] or a [`crate::Match`] (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Walking `roles_left` from the owning match's unknown must arrive at
    /// the same fact as walking `roles_right` from `label_right`.
    Path {
        /// Predecessor chain walked from the owning unknown.
        roles_left: Vec<Role>,
        /// The label the comparison is made against.
        label_right: String,
        /// Predecessor chain walked from `label_right`.
        roles_right: Vec<Role>,
    },
    /// A nested existential pattern.
    Existential(ExistentialCondition),
}

/// A positive (`E`) or negative (`!E`) nested pattern controlling inclusion
/// of the enclosing row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistentialCondition {
    /// `true` for `E`, `false` for `!E`.
    pub exists: bool,
    /// The nested pattern that must (or must not) have at least one result.
    pub matches: Vec<Match>,
}

/// A declared unknown fact together with its path and existential
/// constraints (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// The fact this match introduces.
    pub unknown: Label,
    /// Constraints the bound fact must satisfy.
    pub conditions: Vec<Condition>,
}

impl Match {
    /// Construct a match with no conditions.
    pub fn new(unknown: Label) -> Self {
        Self {
            unknown,
            conditions: Vec::new(),
        }
    }

    /// Attach a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// An input fact-reference slot, with optional existential filters on the
/// given fact itself (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Given {
    /// The given's label.
    pub label: Label,
    /// Existential constraints the given fact must satisfy to survive.
    pub conditions: Vec<ExistentialCondition>,
}

impl Given {
    /// Construct a given with no conditions.
    pub fn new(label: Label) -> Self {
        Self {
            label,
            conditions: Vec::new(),
        }
    }

    /// Attach an existential condition.
    pub fn with_condition(mut self, condition: ExistentialCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}
