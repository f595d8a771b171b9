use std::collections::{BTreeMap, HashSet};

use chronicle_facts::FactReference;
use chronicle_spec::{Condition, ExistentialCondition, Match, Projection, Role, Specification};
use futures_util::future::{BoxFuture, FutureExt};

use crate::error::{GivenMismatchKind, QueryError};
use crate::limits::Limits;
use crate::projected::{LazyCollection, ProjectedRow, ProjectedValue};
use crate::store::Store;

type Binding = BTreeMap<String, FactReference>;

/// Runs a [`Specification`] against a [`Store`] and produces projected rows
/// (spec §4.3).
#[derive(Clone)]
pub struct Evaluator<S: Store + Clone> {
    store: S,
    limits: Limits,
}

impl<S: Store + Clone> Evaluator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(store: S, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bind `given` to `spec`'s declared inputs by position and evaluate.
    pub async fn read(
        &self,
        given: &[FactReference],
        spec: &Specification,
    ) -> Result<Vec<ProjectedRow<S>>, QueryError<S::Error>> {
        let budget_ms = self.limits.time_budget.as_millis() as u64;
        match tokio::time::timeout(self.limits.time_budget, self.read_inner(given, spec)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(QueryError::EvaluationTimeout { budget_ms }),
        }
    }

    async fn read_inner(
        &self,
        given: &[FactReference],
        spec: &Specification,
    ) -> Result<Vec<ProjectedRow<S>>, QueryError<S::Error>> {
        if given.len() != spec.given.len() {
            return Err(QueryError::GivenMismatch(GivenMismatchKind::Count {
                expected: spec.given.len(),
                actual: given.len(),
            }));
        }

        let mut binding = Binding::new();
        for (declared, reference) in spec.given.iter().zip(given) {
            if declared.label.fact_type != reference.fact_type {
                return Err(QueryError::GivenMismatch(GivenMismatchKind::Type {
                    label: declared.label.name.clone(),
                    expected_type: declared.label.fact_type.clone(),
                    actual_type: reference.fact_type.clone(),
                }));
            }
            binding.insert(declared.label.name.clone(), reference.clone());
        }

        for declared in &spec.given {
            for existential in &declared.conditions {
                let satisfied = self.evaluate_existential(existential, &binding, 0).await?;
                if satisfied != existential.exists {
                    return Ok(Vec::new());
                }
            }
        }

        let mut bindings = vec![binding];
        for m in &spec.matches {
            let mut next = Vec::new();
            for b in &bindings {
                next.extend(self.candidates_for_match(m, b, 0).await?);
            }
            bindings = next;
        }

        let mut rows = Vec::with_capacity(bindings.len());
        for b in &bindings {
            let identity = spec
                .matches
                .iter()
                .map(|m| b[&m.unknown.name].hash)
                .collect();
            let value = self.realize_projection(&spec.projection, b).await?;
            rows.push(ProjectedRow { identity, value });
        }
        Ok(rows)
    }

    /// Extend `binding` with every way `m` can be satisfied, applying its
    /// path and existential conditions.
    fn candidates_for_match<'a>(
        &'a self,
        m: &'a Match,
        binding: &'a Binding,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<Binding>, QueryError<S::Error>>> {
        async move {
            if depth > self.limits.max_depth {
                return Err(QueryError::SpecificationTooDeep {
                    max_depth: self.limits.max_depth,
                });
            }

            let path_conditions: Vec<&Condition> = m
                .conditions
                .iter()
                .filter(|c| matches!(c, Condition::Path { .. }))
                .collect();

            let mut candidates: Option<HashSet<FactReference>> = None;
            for condition in &path_conditions {
                let Condition::Path {
                    roles_left,
                    label_right,
                    roles_right,
                } = condition
                else {
                    unreachable!("filtered to path conditions above")
                };
                let anchor = binding
                    .get(label_right)
                    .cloned()
                    .ok_or_else(|| QueryError::UnresolvedNestedGiven(label_right.clone()))?;
                let pivots = self.walk_predecessors(&anchor, roles_right).await?;
                let found = self
                    .walk_successors_reverse(&m.unknown.fact_type, roles_left, pivots)
                    .await?;
                let found: HashSet<FactReference> = found.into_iter().collect();
                candidates = Some(match candidates {
                    Some(existing) => existing.intersection(&found).cloned().collect(),
                    None => found,
                });
            }

            let candidates: Vec<FactReference> = match candidates {
                Some(set) => set.into_iter().collect(),
                None => {
                    tracing::warn!(
                        fact_type = %m.unknown.fact_type,
                        "match has no path condition; the store exposes no way to enumerate all facts of a type, so it yields no candidates"
                    );
                    Vec::new()
                }
            };

            let mut survivors = Vec::new();
            'candidate: for candidate in candidates {
                let mut extended = binding.clone();
                extended.insert(m.unknown.name.clone(), candidate);
                for condition in &m.conditions {
                    if let Condition::Existential(existential) = condition {
                        let satisfied = self.evaluate_existential(existential, &extended, depth + 1).await?;
                        if satisfied != existential.exists {
                            continue 'candidate;
                        }
                    }
                }
                survivors.push(extended);
            }
            Ok(survivors)
        }
        .boxed()
    }

    fn evaluate_existential<'a>(
        &'a self,
        existential: &'a ExistentialCondition,
        binding: &'a Binding,
        depth: usize,
    ) -> BoxFuture<'a, Result<bool, QueryError<S::Error>>> {
        async move {
            if depth > self.limits.max_depth {
                return Err(QueryError::SpecificationTooDeep {
                    max_depth: self.limits.max_depth,
                });
            }
            let mut bindings = vec![binding.clone()];
            for m in &existential.matches {
                let mut next = Vec::new();
                for b in &bindings {
                    next.extend(self.candidates_for_match(m, b, depth + 1).await?);
                }
                bindings = next;
                if bindings.is_empty() {
                    break;
                }
            }
            Ok(!bindings.is_empty())
        }
        .boxed()
    }

    /// Walk a chain of predecessor roles forward from `start`, fanning out
    /// at multi-valued roles.
    async fn walk_predecessors(
        &self,
        start: &FactReference,
        roles: &[Role],
    ) -> Result<Vec<FactReference>, QueryError<S::Error>> {
        let mut current = vec![start.clone()];
        for role in roles {
            let mut next = Vec::new();
            for reference in &current {
                next.extend(
                    self.store
                        .predecessors(reference, &role.name)
                        .await
                        .map_err(QueryError::StoreError)?,
                );
            }
            current = next;
        }
        Ok(current)
    }

    /// Walk a chain of predecessor roles in reverse, as successor lookups,
    /// arriving at candidates of `unknown_type`.
    async fn walk_successors_reverse(
        &self,
        unknown_type: &str,
        roles_left: &[Role],
        pivots: Vec<FactReference>,
    ) -> Result<Vec<FactReference>, QueryError<S::Error>> {
        let mut originating_type = unknown_type.to_string();
        let mut hops = Vec::with_capacity(roles_left.len());
        for role in roles_left {
            hops.push((role.clone(), originating_type.clone()));
            originating_type = role.predecessor_type.clone();
        }

        let mut candidates = pivots;
        for (role, origin_type) in hops.into_iter().rev() {
            let mut next = Vec::new();
            for pivot in &candidates {
                next.extend(
                    self.store
                        .successors(pivot, &role.name, &origin_type)
                        .await
                        .map_err(QueryError::StoreError)?,
                );
            }
            candidates = next;
        }
        Ok(candidates)
    }

    fn realize_projection<'a>(
        &'a self,
        projection: &'a Projection,
        binding: &'a Binding,
    ) -> BoxFuture<'a, Result<ProjectedValue<S>, QueryError<S::Error>>> {
        async move {
            match projection {
                Projection::Fact(label) => {
                    let reference = self.bound(binding, label)?;
                    let fact = self
                        .store
                        .load(reference)
                        .await
                        .map_err(QueryError::StoreError)?
                        .ok_or_else(|| QueryError::MissingFact(reference.clone()))?;
                    Ok(ProjectedValue::Fact(fact))
                }
                Projection::Hash(label) => {
                    let reference = self.bound(binding, label)?;
                    Ok(ProjectedValue::Hash(reference.hash))
                }
                Projection::Field(label, field) => {
                    let reference = self.bound(binding, label)?;
                    let fact = self
                        .store
                        .load(reference)
                        .await
                        .map_err(QueryError::StoreError)?
                        .ok_or_else(|| QueryError::MissingFact(reference.clone()))?;
                    let value = fact.fields.get(field).cloned().ok_or_else(|| QueryError::SchemaError {
                        fact_type: fact.fact_type.clone(),
                        role: field.clone(),
                    })?;
                    Ok(ProjectedValue::Field(value))
                }
                Projection::Composite(fields) => {
                    let mut realized = Vec::with_capacity(fields.len());
                    for (name, nested) in fields {
                        realized.push((name.clone(), self.realize_projection(nested, binding).await?));
                    }
                    Ok(ProjectedValue::Composite(realized))
                }
                Projection::Specification(nested) => {
                    let mut child_given = Vec::with_capacity(nested.given.len());
                    for declared in &nested.given {
                        child_given.push(self.bound(binding, &declared.label.name)?.clone());
                    }
                    Ok(ProjectedValue::Collection(LazyCollection {
                        specification: (**nested).clone(),
                        given: child_given,
                        evaluator: self.clone(),
                    }))
                }
            }
        }
        .boxed()
    }

    fn bound<'a>(&self, binding: &'a Binding, label: &str) -> Result<&'a FactReference, QueryError<S::Error>> {
        binding
            .get(label)
            .ok_or_else(|| QueryError::UnresolvedNestedGiven(label.to_string()))
    }
}
