use std::collections::HashSet;

use chronicle_spec::{Condition, ExistentialCondition, Given, Label, Match, Projection, Specification};

use crate::error::InverseError;
use crate::types::{Inverse, Operation};

/// Derive the set of inverse specifications that, taken together, re-evaluate
/// every row of `spec` affected by the arrival of a single new fact
/// (spec §4.4).
pub fn inverses_of(spec: &Specification) -> Result<Vec<Inverse>, InverseError> {
    let mut inverses = compile_level(spec, Vec::new(), 0)?;
    dedup_inverses(&mut inverses);
    Ok(inverses)
}

fn compile_level(spec: &Specification, path: Vec<String>, depth: usize) -> Result<Vec<Inverse>, InverseError> {
    let parent_path = parent_of(&path);
    let given_subset: Vec<usize> = (0..spec.given.len()).collect();
    let mut inverses = Vec::new();

    for i in 0..spec.matches.len() {
        inverses.push(plain_pivot_inverse(spec, i, &path, &parent_path, &given_subset)?);
    }

    let mut sites = Vec::new();
    collect_existential_sites(&spec.matches, &[], &[], &mut sites);
    for site in &sites {
        inverses.push(existential_pivot_inverse(spec, site, &path, &parent_path, &given_subset)?);
    }

    if depth == 0 && spec.given.len() == 1 {
        inverses.push(Inverse {
            pivot_type: spec.given[0].label.fact_type.clone(),
            skeleton: spec.skeleton(),
            inner_specification: spec.clone(),
            operation: Operation::Add,
            result_path: Vec::new(),
            parent_path: Vec::new(),
            // Unlike the other inverse kinds, the self-inverse's inner
            // specification IS the original spec: its one given is filled
            // directly by the arriving pivot fact, not by an appended given.
            given_subset: Vec::new(),
        });
    }

    for (child_path, nested) in nested_specifications(&spec.projection, &path) {
        inverses.extend(compile_level(nested, child_path, depth + 1)?);
    }

    Ok(inverses)
}

/// A condition that forces a match's candidate set down to exactly the fact
/// bound to `label`: walking zero roles from either side means "these are
/// the same fact."
fn identity_condition(label: &str) -> Condition {
    Condition::Path {
        roles_left: Vec::new(),
        label_right: label.to_string(),
        roles_right: Vec::new(),
    }
}

/// A label name not already used by any given or match in `spec`.
fn fresh_label_name(spec: &Specification) -> String {
    let used: HashSet<&str> = spec
        .given
        .iter()
        .map(|g| g.label.name.as_str())
        .chain(spec.matches.iter().map(|m| m.unknown.name.as_str()))
        .collect();
    let mut candidate = "__pivot".to_string();
    let mut suffix = 0;
    while used.contains(candidate.as_str()) {
        suffix += 1;
        candidate = format!("__pivot_{suffix}");
    }
    candidate
}

/// The arrival of any fact satisfying one of `spec`'s own matches can add
/// rows: bind that match's type as an extra given and require the match's
/// unknown to equal it (spec §4.4 rules 1-2).
fn plain_pivot_inverse(
    spec: &Specification,
    match_index: usize,
    path: &[String],
    parent_path: &[String],
    given_subset: &[usize],
) -> Result<Inverse, InverseError> {
    let pivot_type = spec.matches[match_index].unknown.fact_type.clone();
    let pivot_name = fresh_label_name(spec);

    let mut given = spec.given.clone();
    given.push(Given::new(Label::new(pivot_name.clone(), pivot_type.clone())));

    let matches: Vec<Match> = spec
        .matches
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            if idx == match_index {
                m.clone().with_condition(identity_condition(&pivot_name))
            } else {
                m.clone()
            }
        })
        .collect();

    let inner_specification = Specification::new(given, matches, spec.projection.clone())?;
    let skeleton = inner_specification.skeleton();
    Ok(Inverse {
        pivot_type,
        inner_specification,
        skeleton,
        operation: Operation::Add,
        result_path: path.to_vec(),
        parent_path: parent_path.to_vec(),
        given_subset: given_subset.to_vec(),
    })
}

/// One `Existential` condition found anywhere in `spec`'s match tree,
/// located well enough to patch it back in: `owner_path` walks down through
/// ancestor existentials to the list holding the owning match, and
/// `owner_index` picks that match out of the list. `ancestor_chain` carries
/// the `exists` flag of every existential strictly enclosing the owning
/// match, outermost first — everything needed to work out whether this
/// existential's own arrival ultimately adds or removes the root row
/// (spec §4.4 rule 1: "at every nesting depth, including inside
/// existentials").
struct ExistentialSite {
    owner_path: Vec<(usize, usize)>,
    owner_index: usize,
    condition_index: usize,
    existential: ExistentialCondition,
    ancestor_chain: Vec<bool>,
}

/// Find every existential condition in `matches`, at any nesting depth,
/// descending into an existential's own matches as just another level of
/// the same tree.
fn collect_existential_sites(matches: &[Match], path: &[(usize, usize)], chain: &[bool], out: &mut Vec<ExistentialSite>) {
    for (owner_index, m) in matches.iter().enumerate() {
        for (condition_index, condition) in m.conditions.iter().enumerate() {
            let Condition::Existential(ec) = condition else {
                continue;
            };
            if ec.matches.is_empty() {
                // Vacuously always true; no fact type whose arrival could affect it.
                continue;
            }
            out.push(ExistentialSite {
                owner_path: path.to_vec(),
                owner_index,
                condition_index,
                existential: ec.clone(),
                ancestor_chain: chain.to_vec(),
            });

            let mut deeper_path = path.to_vec();
            deeper_path.push((owner_index, condition_index));
            let mut deeper_chain = chain.to_vec();
            deeper_chain.push(ec.exists);
            collect_existential_sites(&ec.matches, &deeper_path, &deeper_chain, out);
        }
    }
}

/// The arrival of a fact satisfying an existential's first match flips
/// whether that existential holds, which flips whether the match that owns
/// it still counts toward whatever it is nested in, and so on up the chain
/// to the root. Each level flips unconditionally, so the net direction is
/// decided by how many `!E` (negative) existentials sit between the pivot
/// and the root: an even number of flips lands back on "add", an odd number
/// lands on "remove" (spec §4.4 rules 1, 3).
fn existential_pivot_inverse(
    spec: &Specification,
    site: &ExistentialSite,
    path: &[String],
    parent_path: &[String],
    given_subset: &[usize],
) -> Result<Inverse, InverseError> {
    let pivot_type = site.existential.matches[0].unknown.fact_type.clone();
    let pivot_name = fresh_label_name(spec);

    let mut given = spec.given.clone();
    given.push(Given::new(Label::new(pivot_name.clone(), pivot_type.clone())));

    let matches = patch_match_at(&spec.matches, &site.owner_path, site.owner_index, &|m| Match {
        unknown: m.unknown.clone(),
        conditions: patch_existential(&m.conditions, site.condition_index, &pivot_name),
    });

    let inner_specification = Specification::new(given, matches, spec.projection.clone())?;
    let skeleton = inner_specification.skeleton();
    let negatives = site.ancestor_chain.iter().chain(std::iter::once(&site.existential.exists)).filter(|exists| !**exists).count();
    let operation = if negatives % 2 == 0 { Operation::Add } else { Operation::Remove };
    Ok(Inverse {
        pivot_type,
        inner_specification,
        skeleton,
        operation,
        result_path: path.to_vec(),
        parent_path: parent_path.to_vec(),
        given_subset: given_subset.to_vec(),
    })
}

/// Rewrite the one match addressed by `path`/`target_index` (descending
/// through a chain of owning-existential steps the same way
/// [`collect_existential_sites`] discovered it) with `patch`, cloning
/// everything else unchanged.
fn patch_match_at(matches: &[Match], path: &[(usize, usize)], target_index: usize, patch: &dyn Fn(&Match) -> Match) -> Vec<Match> {
    let Some(&(match_index, condition_index)) = path.first() else {
        return matches.iter().enumerate().map(|(idx, m)| if idx == target_index { patch(m) } else { m.clone() }).collect();
    };
    matches
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            if idx != match_index {
                return m.clone();
            }
            let mut conditions = m.conditions.clone();
            let Condition::Existential(ec) = &conditions[condition_index] else {
                unreachable!("owner_path was built by scanning for Existential conditions")
            };
            let patched = patch_match_at(&ec.matches, &path[1..], target_index, patch);
            conditions[condition_index] = Condition::Existential(ExistentialCondition { exists: ec.exists, matches: patched });
            Match { unknown: m.unknown.clone(), conditions }
        })
        .collect()
}

fn patch_existential(conditions: &[Condition], condition_index: usize, pivot_name: &str) -> Vec<Condition> {
    conditions
        .iter()
        .enumerate()
        .map(|(idx, condition)| {
            if idx != condition_index {
                return condition.clone();
            }
            let Condition::Existential(existential) = condition else {
                unreachable!("condition_index was located by scanning for Existential conditions")
            };
            let mut matches = existential.matches.clone();
            matches[0] = matches[0].clone().with_condition(identity_condition(pivot_name));
            Condition::Existential(ExistentialCondition {
                exists: existential.exists,
                matches,
            })
        })
        .collect()
}

fn parent_of(path: &[String]) -> Vec<String> {
    if path.is_empty() {
        Vec::new()
    } else {
        path[..path.len() - 1].to_vec()
    }
}

/// Every nested specification reachable through `projection`, paired with
/// the chain of composite output names leading to it.
fn nested_specifications<'a>(projection: &'a Projection, path: &[String]) -> Vec<(Vec<String>, &'a Specification)> {
    match projection {
        Projection::Specification(nested) => vec![(path.to_vec(), nested.as_ref())],
        Projection::Composite(fields) => fields
            .iter()
            .flat_map(|(name, inner)| {
                let mut child_path = path.to_vec();
                child_path.push(name.clone());
                nested_specifications(inner, &child_path)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Coalesce inverses whose pivot, operation, routing, and inner skeleton all
/// agree (spec §4.4 rule 6). Label names inside `inner_specification` can
/// differ without the inverses being meaningfully distinct, so the skeleton
/// (not the AST) is the comparison key.
fn dedup_inverses(inverses: &mut Vec<Inverse>) {
    let mut kept: Vec<Inverse> = Vec::new();
    'candidates: for inverse in inverses.drain(..) {
        for existing in &kept {
            if existing.pivot_type == inverse.pivot_type
                && existing.operation == inverse.operation
                && existing.result_path == inverse.result_path
                && existing.parent_path == inverse.parent_path
                && existing.skeleton == inverse.skeleton
            {
                continue 'candidates;
            }
        }
        kept.push(inverse);
    }
    *inverses = kept;
}

#[cfg(test)]
mod tests {
    use chronicle_spec::Role;

    use super::*;

    fn office_by_company() -> Specification {
        Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![Match::new(Label::new("o", "Office")).with_condition(Condition::Path {
                roles_left: vec![Role::new("company", "Company")],
                label_right: "c".to_string(),
                roles_right: vec![],
            })],
            Projection::Fact("o".to_string()),
        )
        .unwrap()
    }

    fn open_offices_by_company() -> Specification {
        let closed = ExistentialCondition {
            exists: false,
            matches: vec![Match::new(Label::new("x", "Office.Closed")).with_condition(Condition::Path {
                roles_left: vec![Role::new("office", "Office")],
                label_right: "o".to_string(),
                roles_right: vec![],
            })],
        };
        Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![Match::new(Label::new("o", "Office"))
                .with_condition(Condition::Path {
                    roles_left: vec![Role::new("company", "Company")],
                    label_right: "c".to_string(),
                    roles_right: vec![],
                })
                .with_condition(Condition::Existential(closed))],
            Projection::Fact("o".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn a_plain_match_yields_one_add_inverse_with_an_extra_given() {
        let spec = office_by_company();
        let inverses = inverses_of(&spec).unwrap();
        let plain: Vec<&Inverse> = inverses
            .iter()
            .filter(|inv| inv.pivot_type == "Office" && inv.operation == Operation::Add)
            .collect();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].inner_specification.given.len(), 2);
        assert_eq!(plain[0].result_path, Vec::<String>::new());
    }

    #[test]
    fn a_single_given_spec_also_emits_a_self_inverse() {
        let spec = office_by_company();
        let inverses = inverses_of(&spec).unwrap();
        assert!(inverses
            .iter()
            .any(|inv| inv.pivot_type == "Company" && inv.inner_specification == spec));
    }

    #[test]
    fn two_givens_suppress_the_self_inverse() {
        let spec = Specification::new(
            vec![Given::new(Label::new("a", "A")), Given::new(Label::new("b", "B"))],
            vec![],
            Projection::Fact("a".to_string()),
        )
        .unwrap();
        let inverses = inverses_of(&spec).unwrap();
        assert!(!inverses.iter().any(|inv| inv.inner_specification == spec));
    }

    #[test]
    fn a_negative_existential_pivot_yields_a_remove_inverse() {
        let spec = open_offices_by_company();
        let inverses = inverses_of(&spec).unwrap();
        let closed_pivot = inverses
            .iter()
            .find(|inv| inv.pivot_type == "Office.Closed")
            .expect("the negative existential's first match is a pivot");
        assert_eq!(closed_pivot.operation, Operation::Remove);
        assert_eq!(closed_pivot.result_path, Vec::<String>::new());
    }

    /// `o: Office !E{k: Office.Closed !E{r: Office.Reopened}}` — "effectively
    /// open" offices. Reopened is nested two existentials deep, with no
    /// existential hanging directly off `o` itself.
    fn effectively_open_offices_by_company() -> Specification {
        let reopened = ExistentialCondition {
            exists: false,
            matches: vec![Match::new(Label::new("r", "Office.Reopened")).with_condition(Condition::Path {
                roles_left: vec![Role::new("closure", "Office.Closed")],
                label_right: "k".to_string(),
                roles_right: vec![],
            })],
        };
        let closed = ExistentialCondition {
            exists: false,
            matches: vec![Match::new(Label::new("k", "Office.Closed"))
                .with_condition(Condition::Path {
                    roles_left: vec![Role::new("office", "Office")],
                    label_right: "o".to_string(),
                    roles_right: vec![],
                })
                .with_condition(Condition::Existential(reopened))],
        };
        Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![Match::new(Label::new("o", "Office"))
                .with_condition(Condition::Path {
                    roles_left: vec![Role::new("company", "Company")],
                    label_right: "c".to_string(),
                    roles_right: vec![],
                })
                .with_condition(Condition::Existential(closed))],
            Projection::Fact("o".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn an_existential_nested_inside_another_existential_is_still_a_pivot() {
        let spec = effectively_open_offices_by_company();
        let inverses = inverses_of(&spec).unwrap();

        let closed_pivot = inverses
            .iter()
            .find(|inv| inv.pivot_type == "Office.Closed")
            .expect("the outer existential's first match is a pivot");
        assert_eq!(closed_pivot.operation, Operation::Remove, "one enclosing negative existential: office drops out");

        let reopened_pivot = inverses
            .iter()
            .find(|inv| inv.pivot_type == "Office.Reopened")
            .expect("the existential nested inside Closed's own conditions is still found");
        assert_eq!(reopened_pivot.operation, Operation::Add, "two enclosing negative existentials cancel out: office reappears");
        assert_eq!(reopened_pivot.result_path, Vec::<String>::new());
    }

    #[test]
    fn a_nested_specification_pivot_carries_its_composite_field_name() {
        let nested = office_by_company();
        let spec = Specification::new(
            vec![Given::new(Label::new("c", "Company"))],
            vec![],
            Projection::Composite(vec![
                ("id".to_string(), Projection::Field("c".to_string(), "id".to_string())),
                ("offices".to_string(), Projection::Specification(Box::new(nested))),
            ]),
        )
        .unwrap();

        let inverses = inverses_of(&spec).unwrap();
        let nested_pivot = inverses
            .iter()
            .find(|inv| inv.pivot_type == "Office" && inv.operation == Operation::Add)
            .unwrap();
        assert_eq!(nested_pivot.result_path, vec!["offices".to_string()]);
        assert_eq!(nested_pivot.parent_path, Vec::<String>::new());
    }

    #[test]
    fn dedup_collapses_inverses_whose_inner_specifications_differ_only_by_label_name() {
        let by_c = office_by_company();
        let mapping: std::collections::BTreeMap<String, String> = [("c".to_string(), "d".to_string()), ("o".to_string(), "p".to_string())]
            .into_iter()
            .collect();
        let by_d = by_c.alpha_transform(&mapping).unwrap();

        let mut inverses = vec![
            Inverse {
                pivot_type: "Office".to_string(),
                skeleton: by_c.skeleton(),
                inner_specification: by_c,
                operation: Operation::Add,
                result_path: Vec::new(),
                parent_path: Vec::new(),
                given_subset: vec![0],
            },
            Inverse {
                pivot_type: "Office".to_string(),
                skeleton: by_d.skeleton(),
                inner_specification: by_d,
                operation: Operation::Add,
                result_path: Vec::new(),
                parent_path: Vec::new(),
                given_subset: vec![0],
            },
        ];
        dedup_inverses(&mut inverses);
        assert_eq!(inverses.len(), 1);
    }
}
