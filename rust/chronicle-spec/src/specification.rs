use std::collections::{BTreeMap, HashSet};

use crate::error::{Invalid, InvalidKind};
use crate::{Condition, ExistentialCondition, Given, Match, Projection};

/// The declarative query form: givens, matches, and a projection (spec §3).
#[derive(Clone, Debug, PartialEq)]
pub struct Specification {
    /// The inputs the caller binds.
    pub given: Vec<Given>,
    /// The unknowns the evaluator resolves.
    pub matches: Vec<Match>,
    /// How a surviving binding is shaped into an output row.
    pub projection: Projection,
}

impl Specification {
    /// Construct a specification and validate its label scoping.
    pub fn new(
        given: Vec<Given>,
        matches: Vec<Match>,
        projection: Projection,
    ) -> Result<Self, Invalid> {
        let spec = Self {
            given,
            matches,
            projection,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// A specification is self-inverse-eligible iff it has exactly one given
    /// (spec §3, §4.4 rule 5).
    pub fn is_self_inverse_eligible(&self) -> bool {
        self.given.len() == 1
    }

    /// Check that every label referenced by a path condition or a projection
    /// is in scope, and that no label is declared twice within the same
    /// scope (spec §3, "Invariants").
    pub fn validate(&self) -> Result<(), Invalid> {
        let mut scope: HashSet<String> = HashSet::new();

        for given in &self.given {
            declare(&mut scope, &given.label.name)?;
        }
        for given in &self.given {
            for condition in &given.conditions {
                check_existential(condition, &scope)?;
            }
        }

        for m in &self.matches {
            check_match(m, &mut scope)?;
        }

        check_projection(&self.projection, &scope)
    }

    /// Rename every label by an injective mapping (spec §4.2,
    /// "alpha transformation"). Fails if the mapping omits a label that is
    /// actually referenced ([`InvalidKind::UnknownLabel`]) or maps two
    /// distinct labels onto the same name ([`InvalidKind::DuplicateLabel`]).
    pub fn alpha_transform(&self, mapping: &BTreeMap<String, String>) -> Result<Self, Invalid> {
        check_injective(mapping)?;

        let given = self
            .given
            .iter()
            .map(|g| rename_given(g, mapping))
            .collect::<Result<Vec<_>, _>>()?;
        let matches = self
            .matches
            .iter()
            .map(|m| rename_match(m, mapping))
            .collect::<Result<Vec<_>, _>>()?;
        let projection = rename_projection(&self.projection, mapping)?;

        Ok(Self {
            given,
            matches,
            projection,
        })
    }
}

fn declare(scope: &mut HashSet<String>, name: &str) -> Result<(), Invalid> {
    if !scope.insert(name.to_string()) {
        return Err(Invalid(InvalidKind::DuplicateLabel(name.to_string())));
    }
    Ok(())
}

fn require_in_scope(scope: &HashSet<String>, name: &str) -> Result<(), Invalid> {
    if scope.contains(name) {
        Ok(())
    } else {
        Err(Invalid(InvalidKind::UnknownLabel(name.to_string())))
    }
}

fn check_match(m: &Match, scope: &mut HashSet<String>) -> Result<(), Invalid> {
    // The unknown's own label must be resolvable when its path conditions
    // reference it, so it is declared before its conditions are checked.
    declare(scope, &m.unknown.name)?;
    for condition in &m.conditions {
        match condition {
            Condition::Path { label_right, .. } => require_in_scope(scope, label_right)?,
            Condition::Existential(existential) => check_existential(existential, scope)?,
        }
    }
    Ok(())
}

fn check_existential(
    existential: &ExistentialCondition,
    outer_scope: &HashSet<String>,
) -> Result<(), Invalid> {
    // Nested matches see the outer scope plus whatever they declare
    // themselves, but don't leak their own declarations back out.
    let mut inner_scope = outer_scope.clone();
    for m in &existential.matches {
        check_match(m, &mut inner_scope)?;
    }
    Ok(())
}

fn check_projection(projection: &Projection, scope: &HashSet<String>) -> Result<(), Invalid> {
    match projection {
        Projection::Fact(label) | Projection::Hash(label) | Projection::Field(label, _) => {
            require_in_scope(scope, label)
        }
        Projection::Composite(fields) => {
            for (_, nested) in fields {
                check_projection(nested, scope)?;
            }
            Ok(())
        }
        // A nested specification is self-contained: its own given labels
        // establish its own scope independently of the outer one.
        Projection::Specification(nested) => nested.validate(),
    }
}

fn check_injective(mapping: &BTreeMap<String, String>) -> Result<(), Invalid> {
    let mut seen = HashSet::new();
    for target in mapping.values() {
        if !seen.insert(target.clone()) {
            return Err(Invalid(InvalidKind::DuplicateLabel(target.clone())));
        }
    }
    Ok(())
}

fn rename(mapping: &BTreeMap<String, String>, name: &str) -> Result<String, Invalid> {
    mapping
        .get(name)
        .cloned()
        .ok_or_else(|| Invalid(InvalidKind::UnknownLabel(name.to_string())))
}

fn rename_given(given: &Given, mapping: &BTreeMap<String, String>) -> Result<Given, Invalid> {
    Ok(Given {
        label: crate::Label::new(rename(mapping, &given.label.name)?, &given.label.fact_type),
        conditions: given
            .conditions
            .iter()
            .map(|c| rename_existential(c, mapping))
            .collect::<Result<_, _>>()?,
    })
}

fn rename_match(m: &Match, mapping: &BTreeMap<String, String>) -> Result<Match, Invalid> {
    Ok(Match {
        unknown: crate::Label::new(rename(mapping, &m.unknown.name)?, &m.unknown.fact_type),
        conditions: m
            .conditions
            .iter()
            .map(|c| rename_condition(c, mapping))
            .collect::<Result<_, _>>()?,
    })
}

fn rename_condition(
    condition: &Condition,
    mapping: &BTreeMap<String, String>,
) -> Result<Condition, Invalid> {
    Ok(match condition {
        Condition::Path {
            roles_left,
            label_right,
            roles_right,
        } => Condition::Path {
            roles_left: roles_left.clone(),
            label_right: rename(mapping, label_right)?,
            roles_right: roles_right.clone(),
        },
        Condition::Existential(existential) => {
            Condition::Existential(rename_existential(existential, mapping)?)
        }
    })
}

fn rename_existential(
    existential: &ExistentialCondition,
    mapping: &BTreeMap<String, String>,
) -> Result<ExistentialCondition, Invalid> {
    Ok(ExistentialCondition {
        exists: existential.exists,
        matches: existential
            .matches
            .iter()
            .map(|m| rename_match(m, mapping))
            .collect::<Result<_, _>>()?,
    })
}

fn rename_projection(
    projection: &Projection,
    mapping: &BTreeMap<String, String>,
) -> Result<Projection, Invalid> {
    Ok(match projection {
        Projection::Fact(label) => Projection::Fact(rename(mapping, label)?),
        Projection::Hash(label) => Projection::Hash(rename(mapping, label)?),
        Projection::Field(label, field) => Projection::Field(rename(mapping, label)?, field.clone()),
        Projection::Composite(fields) => Projection::Composite(
            fields
                .iter()
                .map(|(name, nested)| Ok((name.clone(), rename_projection(nested, mapping)?)))
                .collect::<Result<_, Invalid>>()?,
        ),
        // Nested specifications keep their own, independent label scope.
        Projection::Specification(nested) => Projection::Specification(nested.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Label, Role};

    fn company_office_spec() -> Specification {
        Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![Match::new(Label::new("o", "Office")).with_condition(Condition::Path {
                roles_left: vec![Role::new("company", "Company")],
                label_right: "c".into(),
                roles_right: vec![],
            })],
            Projection::Fact("o".into()),
        )
        .unwrap()
    }

    #[test]
    fn it_accepts_a_well_scoped_specification() {
        company_office_spec();
    }

    #[test]
    fn it_rejects_an_unknown_label_in_a_path_condition() {
        let result = Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![Match::new(Label::new("o", "Office")).with_condition(Condition::Path {
                roles_left: vec![Role::new("company", "Company")],
                label_right: "missing".into(),
                roles_right: vec![],
            })],
            Projection::Fact("o".into()),
        );
        assert!(matches!(
            result,
            Err(Invalid(InvalidKind::UnknownLabel(name))) if name == "missing"
        ));
    }

    #[test]
    fn it_rejects_a_duplicate_label() {
        let result = Specification::new(
            vec![
                Given::new(Label::new("c", "Company")),
                Given::new(Label::new("c", "Company")),
            ],
            vec![],
            Projection::Fact("c".into()),
        );
        assert!(matches!(
            result,
            Err(Invalid(InvalidKind::DuplicateLabel(name))) if name == "c"
        ));
    }

    #[test]
    fn alpha_transform_is_self_inverse_under_a_bijection() {
        let spec = company_office_spec();
        let mapping = BTreeMap::from([("c".to_string(), "x".to_string()), ("o".to_string(), "y".to_string())]);
        let inverse_mapping = BTreeMap::from([("x".to_string(), "c".to_string()), ("y".to_string(), "o".to_string())]);

        let transformed = spec.alpha_transform(&mapping).unwrap();
        let restored = transformed.alpha_transform(&inverse_mapping).unwrap();

        assert_eq!(spec, restored);
    }

    #[test]
    fn alpha_transform_rejects_non_injective_mappings() {
        let spec = company_office_spec();
        let mapping = BTreeMap::from([("c".to_string(), "z".to_string()), ("o".to_string(), "z".to_string())]);
        assert!(matches!(
            spec.alpha_transform(&mapping),
            Err(Invalid(InvalidKind::DuplicateLabel(_)))
        ));
    }

    #[test]
    fn alpha_transform_rejects_an_incomplete_mapping() {
        let spec = company_office_spec();
        let mapping = BTreeMap::from([("c".to_string(), "x".to_string())]);
        assert!(matches!(
            spec.alpha_transform(&mapping),
            Err(Invalid(InvalidKind::UnknownLabel(name))) if name == "o"
        ));
    }

    #[test]
    fn self_inverse_eligible_iff_single_given() {
        let one_given = company_office_spec();
        assert!(one_given.is_self_inverse_eligible());

        let two_givens = Specification::new(
            vec![
                Given::new(Label::new("a", "Company")),
                Given::new(Label::new("b", "Company")),
            ],
            vec![],
            Projection::Fact("a".into()),
        )
        .unwrap();
        assert!(!two_givens.is_self_inverse_eligible());
    }
}
