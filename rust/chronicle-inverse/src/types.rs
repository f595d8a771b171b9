use chronicle_spec::{Skeleton, Specification};

/// Whether an [`Inverse`]'s evaluation adds rows to the original result or
/// removes them (spec §4.4 rule 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
}

/// A derived specification whose evaluation against one pivot fact (plus
/// whatever the original givens supply) yields exactly the delta that
/// fact's arrival causes in the original specification's result.
///
/// `resultPath`/`parentPath` name the chain of composite-projection output
/// fields leading to the affected collection, empty at the root
/// specification (spec §4.4 rule 4).
#[derive(Clone, Debug, PartialEq)]
pub struct Inverse {
    /// The fact type whose arrival this inverse reacts to.
    pub pivot_type: String,
    /// Evaluate this, seeded with the pivot fact plus `given_subset`'s
    /// facts, to compute the delta.
    pub inner_specification: Specification,
    /// `inner_specification.skeleton()`, cached so `dedup_inverses` can
    /// compare two inverses for alpha-equivalence without re-deriving each
    /// one's skeleton at comparison time.
    pub skeleton: Skeleton,
    pub operation: Operation,
    pub result_path: Vec<String>,
    pub parent_path: Vec<String>,
    /// Indices into the given list of the specification at this inverse's
    /// own nesting level (root or a projected child) that `inner_specification`
    /// still needs besides the pivot.
    pub given_subset: Vec<usize>,
}
