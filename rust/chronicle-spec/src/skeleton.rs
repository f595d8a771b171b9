use std::collections::HashMap;

use crate::{Condition, ExistentialCondition, Match, Role, Specification};

/// A fact slot in label-free form: its position in declaration order is its
/// identity (spec §4.2, "plan equality").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonFact {
    pub fact_type: String,
}

/// A path condition with `label_right` resolved to a skeleton-global index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonEdge {
    pub roles_left: Vec<Role>,
    pub successor_index: usize,
    pub roles_right: Vec<Role>,
}

/// A positive or negative nested pattern, label-free.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonExistential {
    pub exists: bool,
    pub matches: Vec<SkeletonMatch>,
}

/// A match, label-free: its own global fact index plus its conditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonMatch {
    pub fact_index: usize,
    pub edges: Vec<SkeletonEdge>,
    pub existentials: Vec<SkeletonExistential>,
}

/// The label-free normalization of a [`Specification`] (spec §4.2). Two
/// specifications that differ only in label names produce structurally
/// equal skeletons, which is what the inverse compiler and the observer's
/// plan cache key on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skeleton {
    pub facts: Vec<SkeletonFact>,
    pub given_existentials: Vec<SkeletonExistential>,
    pub matches: Vec<SkeletonMatch>,
}

struct Builder {
    facts: Vec<SkeletonFact>,
    index_of: HashMap<String, usize>,
}

impl Builder {
    fn declare(&mut self, name: &str, fact_type: &str) -> usize {
        let index = self.facts.len();
        self.facts.push(SkeletonFact {
            fact_type: fact_type.to_string(),
        });
        self.index_of.insert(name.to_string(), index);
        index
    }

    fn index_of(&self, name: &str) -> usize {
        *self
            .index_of
            .get(name)
            .expect("label should be in scope; Specification::validate was not called first")
    }

    fn build_match(&mut self, m: &Match) -> SkeletonMatch {
        let fact_index = self.declare(&m.unknown.name, &m.unknown.fact_type);
        let mut edges = Vec::new();
        let mut existentials = Vec::new();
        for condition in &m.conditions {
            match condition {
                Condition::Path {
                    roles_left,
                    label_right,
                    roles_right,
                } => edges.push(SkeletonEdge {
                    roles_left: roles_left.clone(),
                    successor_index: self.index_of(label_right),
                    roles_right: roles_right.clone(),
                }),
                Condition::Existential(existential) => {
                    existentials.push(self.build_existential(existential))
                }
            }
        }
        SkeletonMatch {
            fact_index,
            edges,
            existentials,
        }
    }

    fn build_existential(&mut self, existential: &ExistentialCondition) -> SkeletonExistential {
        SkeletonExistential {
            exists: existential.exists,
            matches: existential.matches.iter().map(|m| self.build_match(m)).collect(),
        }
    }
}

impl Specification {
    /// Reduce this specification to its label-free [`Skeleton`]. Call
    /// [`Specification::validate`] first; an out-of-scope label reference
    /// panics here instead of producing an [`crate::Invalid`] error.
    pub fn skeleton(&self) -> Skeleton {
        let mut builder = Builder {
            facts: Vec::new(),
            index_of: HashMap::new(),
        };
        for given in &self.given {
            builder.declare(&given.label.name, &given.label.fact_type);
        }
        let given_existentials = self
            .given
            .iter()
            .flat_map(|g| &g.conditions)
            .map(|c| builder.build_existential(c))
            .collect();
        let matches = self.matches.iter().map(|m| builder.build_match(m)).collect();

        Skeleton {
            facts: builder.facts,
            given_existentials,
            matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Given, Label, Match, Projection, Role, Specification};

    use super::Condition;

    fn spec_with_label(label_name: &str) -> Specification {
        Specification::new(
            vec![Given::new(Label::new(label_name, "Company"))],
            vec![Match::new(Label::new("o", "Office")).with_condition(Condition::Path {
                roles_left: vec![Role::new("company", "Company")],
                label_right: label_name.into(),
                roles_right: vec![],
            })],
            Projection::Fact("o".into()),
        )
        .unwrap()
    }

    #[test]
    fn renaming_a_label_does_not_change_the_skeleton() {
        let a = spec_with_label("c");
        let b = spec_with_label("company");
        assert_eq!(a.skeleton(), b.skeleton());
    }

    #[test]
    fn skeleton_edge_resolves_label_right_to_an_index() {
        let spec = spec_with_label("c");
        let skeleton = spec.skeleton();
        assert_eq!(skeleton.facts.len(), 2);
        assert_eq!(skeleton.matches.len(), 1);
        assert_eq!(skeleton.matches[0].edges[0].successor_index, 0);
        assert_eq!(skeleton.matches[0].fact_index, 1);
    }
}
