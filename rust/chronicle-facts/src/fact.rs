use std::collections::BTreeMap;

use crate::canonical::canonical_bytes;
use crate::{FactError, FactHash, FactReference, Scalar};

/// The predecessor edges stored under a single role name.
///
/// `Single` and `Set` both describe unordered relationships — `Set`'s
/// members are sorted by `(type, hash)` before hashing, regardless of the
/// order they were inserted in. `List` is for roles the data model marks as
/// ordered (e.g. the `prior` role of an update chain, spec §4.1 rule 2);
/// declaration order is part of its canonical form.
#[derive(Clone, Debug, PartialEq)]
pub enum Predecessors {
    /// Exactly one predecessor.
    Single(FactReference),
    /// An unordered collection of predecessors.
    Set(Vec<FactReference>),
    /// An ordered sequence of predecessors.
    List(Vec<FactReference>),
}

impl Predecessors {
    /// All references in this role, regardless of arity.
    pub fn references(&self) -> &[FactReference] {
        match self {
            Predecessors::Single(reference) => std::slice::from_ref(reference),
            Predecessors::Set(references) | Predecessors::List(references) => references,
        }
    }
}

/// An immutable, content-addressed fact (spec §3).
///
/// A `Fact` is a pure value: two facts with equal `(type, predecessors,
/// fields)` canonicalizations are the same fact and hash identically
/// (spec §8, "Hash determinism").
#[derive(Clone, Debug, PartialEq)]
pub struct Fact {
    /// The fact's declared type.
    pub fact_type: String,
    /// Named predecessor edges to other facts.
    pub predecessors: BTreeMap<String, Predecessors>,
    /// Named scalar fields.
    pub fields: BTreeMap<String, Scalar>,
}

impl Fact {
    /// Construct a fact with no predecessors or fields.
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            predecessors: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Attach a single-valued predecessor role.
    pub fn with_predecessor(mut self, role: impl Into<String>, reference: FactReference) -> Self {
        self.predecessors
            .insert(role.into(), Predecessors::Single(reference));
        self
    }

    /// Attach an unordered multi-valued predecessor role.
    pub fn with_predecessor_set(
        mut self,
        role: impl Into<String>,
        references: Vec<FactReference>,
    ) -> Self {
        self.predecessors
            .insert(role.into(), Predecessors::Set(references));
        self
    }

    /// Attach an ordered multi-valued predecessor role (e.g. `prior`).
    pub fn with_predecessor_list(
        mut self,
        role: impl Into<String>,
        references: Vec<FactReference>,
    ) -> Self {
        self.predecessors
            .insert(role.into(), Predecessors::List(references));
        self
    }

    /// Attach a scalar field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// All predecessor references reachable by walking `role` from this
    /// fact, in the role's declared arity and (for ordered roles) order.
    pub fn predecessors_by_role(&self, role: &str) -> &[FactReference] {
        self.predecessors
            .get(role)
            .map(Predecessors::references)
            .unwrap_or(&[])
    }

    /// Compute this fact's canonical hash (spec §4.1).
    ///
    /// Fails with [`FactError::InvalidFact`] if any field holds a
    /// non-serializable value (currently: a non-finite number).
    pub fn hash(&self) -> Result<FactHash, FactError> {
        let bytes = canonical_bytes(self)?;
        Ok(FactHash::digest(bytes))
    }

    /// Compute this fact's [`FactReference`] (its type plus its hash).
    pub fn reference(&self) -> Result<FactReference, FactError> {
        Ok(FactReference::new(self.fact_type.clone(), self.hash()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office_closed(office: FactReference) -> Fact {
        Fact::new("Office.Closed").with_predecessor("office", office)
    }

    #[test]
    fn identical_facts_hash_identically() {
        let a = Fact::new("Company").with_field("id", "TestCo");
        let b = Fact::new("Company").with_field("id", "TestCo");
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn different_fields_hash_differently() {
        let a = Fact::new("Company").with_field("id", "TestCo");
        let b = Fact::new("Company").with_field("id", "OtherCo");
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn predecessor_order_is_irrelevant_for_sets() {
        let company = Fact::new("Company").with_field("id", "C").reference().unwrap();
        let other = Fact::new("Company").with_field("id", "D").reference().unwrap();

        let a = Fact::new("Merger")
            .with_predecessor_set("parties", vec![company.clone(), other.clone()]);
        let b = Fact::new("Merger").with_predecessor_set("parties", vec![other, company]);

        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn list_predecessor_order_is_significant() {
        let a_ref = Fact::new("Step").with_field("n", 1.0).reference().unwrap();
        let b_ref = Fact::new("Step").with_field("n", 2.0).reference().unwrap();

        let forward =
            Fact::new("Chain").with_predecessor_list("prior", vec![a_ref.clone(), b_ref.clone()]);
        let backward = Fact::new("Chain").with_predecessor_list("prior", vec![b_ref, a_ref]);

        assert_ne!(forward.hash().unwrap(), backward.hash().unwrap());
    }

    #[test]
    fn field_insertion_order_does_not_affect_hash() {
        let a = Fact::new("Office")
            .with_field("id", "TestOffice")
            .with_field("city", "Springfield");
        let b = Fact::new("Office")
            .with_field("city", "Springfield")
            .with_field("id", "TestOffice");
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let fact = Fact::new("Measurement").with_field("value", f64::NAN);
        assert!(matches!(fact.hash(), Err(FactError::InvalidFact(_))));
    }

    #[test]
    fn duplicate_insertion_is_idempotent_by_hash() {
        let office = Fact::new("Office").with_field("id", "TestOffice");
        let a = office_closed(office.reference().unwrap());
        let b = office_closed(office.reference().unwrap());
        assert_eq!(a.reference().unwrap(), b.reference().unwrap());
    }
}
