use std::cmp::Ordering;
use std::fmt;

use crate::FactHash;

/// A canonical identifier for a fact: its type plus its content hash.
///
/// All graph navigation in this crate goes through [`FactReference`] values;
/// the fact bodies themselves are loaded from the store on demand
/// (spec §3, "FactReference").
#[derive(Clone, Eq)]
pub struct FactReference {
    /// The fact's declared type.
    pub fact_type: String,
    /// The fact's content hash.
    pub hash: FactHash,
}

impl FactReference {
    /// Construct a reference from its parts.
    pub fn new(fact_type: impl Into<String>, hash: FactHash) -> Self {
        Self {
            fact_type: fact_type.into(),
            hash,
        }
    }
}

impl PartialEq for FactReference {
    fn eq(&self, other: &Self) -> bool {
        self.fact_type == other.fact_type && self.hash == other.hash
    }
}

impl std::hash::Hash for FactReference {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fact_type.hash(state);
        self.hash.hash(state);
    }
}

/// References order first by type, then by hash, matching the canonical
/// predecessor-sorting rule in spec §4.1.
impl Ord for FactReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fact_type
            .cmp(&other.fact_type)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for FactReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for FactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fact_type, self.hash)
    }
}

impl fmt::Display for FactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fact_type, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_orders_by_type_then_hash() {
        let a = FactReference::new("A", FactHash::digest(b"1"));
        let b = FactReference::new("B", FactHash::digest(b"0"));
        assert!(a < b);
    }

    #[test]
    fn equal_type_and_hash_are_equal() {
        let hash = FactHash::digest(b"x");
        let a = FactReference::new("Office", hash);
        let b = FactReference::new("Office", hash);
        assert_eq!(a, b);
    }
}
