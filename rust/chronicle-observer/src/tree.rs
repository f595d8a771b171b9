use std::collections::HashMap;

use chronicle_facts::{FactHash, FactReference};
use chronicle_inverse::Inverse;
use chronicle_query::{ProjectedRow, ProjectedValue, Store};

use crate::ids::SubscriptionId;
use crate::observer::RowHandler;

pub(crate) type NodeId = u64;

/// Addresses a row's whole projection when it is itself a bare `Collection`
/// rather than a named field of a `Composite`. Specifications normally
/// project composites, so most callers never see this name.
pub(crate) const BARE_FIELD: &str = "";

/// A delta that arrived for a collection before it had anywhere to go:
/// either the collection hasn't been evaluated yet (no handler registered),
/// or (at the root) the baseline evaluation hasn't finished. Replayed, in
/// order, once that stops being true.
pub(crate) enum BufferedDelta<S: Store + Clone> {
    Add(ProjectedRow<S>),
    Remove(Vec<FactHash>),
}

/// Bookkeeping for one named child-collection field of a materialized row.
pub(crate) struct ChildCollection<S: Store + Clone> {
    pub(crate) handler: Option<RowHandler<S>>,
    pub(crate) buffering: bool,
    pub(crate) buffered: Vec<BufferedDelta<S>>,
    pub(crate) rows: HashMap<Vec<FactHash>, NodeId>,
    /// Set once an eager evaluation has been kicked off for this field, so a
    /// second handler registration doesn't evaluate the collection twice.
    pub(crate) evaluation_started: bool,
    /// The nested specification's own given, captured from the
    /// `LazyCollection` the first time it evaluates; reused to evaluate this
    /// field's inverses against whichever pivot fact arrives next.
    pub(crate) base_given: Vec<FactReference>,
    pub(crate) inverses: Vec<Inverse>,
    pub(crate) subscriptions: Vec<SubscriptionId>,
}

impl<S: Store + Clone> Default for ChildCollection<S> {
    fn default() -> Self {
        Self {
            handler: None,
            buffering: true,
            buffered: Vec::new(),
            rows: HashMap::new(),
            evaluation_started: false,
            base_given: Vec::new(),
            inverses: Vec::new(),
            subscriptions: Vec::new(),
        }
    }
}

pub(crate) struct Node<S: Store + Clone> {
    #[allow(dead_code)]
    pub(crate) identity: Vec<FactHash>,
    pub(crate) value: ProjectedValue<S>,
    pub(crate) children: HashMap<String, ChildCollection<S>>,
}

/// The materialized, reactive mirror of one `Observer`'s result (spec §4.6,
/// "result tree"). Keyed by node id rather than by reference so a
/// `SharedCell<Tree<S>>` can hand out stable identities across awaits.
pub(crate) struct Tree<S: Store + Clone> {
    pub(crate) nodes: HashMap<NodeId, Node<S>>,
    pub(crate) root: HashMap<Vec<FactHash>, NodeId>,
    pub(crate) root_handler: Option<RowHandler<S>>,
    pub(crate) root_buffering: bool,
    pub(crate) root_buffered: Vec<BufferedDelta<S>>,
    next_id: NodeId,
}

impl<S: Store + Clone> Default for Tree<S> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            root: HashMap::new(),
            root_handler: None,
            root_buffering: true,
            root_buffered: Vec::new(),
            next_id: 0,
        }
    }
}

impl<S: Store + Clone> Tree<S> {
    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Every named `Collection` projection directly reachable from `value`
/// without passing through another `Collection` (those belong to whichever
/// row realizes them, not to this one).
pub(crate) fn collection_fields<S: Store + Clone>(value: &ProjectedValue<S>) -> Vec<String> {
    match value {
        ProjectedValue::Collection(_) => vec![BARE_FIELD.to_string()],
        ProjectedValue::Composite(fields) => fields
            .iter()
            .filter(|(_, v)| matches!(v, ProjectedValue::Collection(_)))
            .map(|(name, _)| name.clone())
            .collect(),
        _ => Vec::new(),
    }
}

/// Find the `Collection` projection named `field` within `value`.
pub(crate) fn find_collection<'a, S: Store + Clone>(value: &'a ProjectedValue<S>, field: &str) -> Option<&'a chronicle_query::LazyCollection<S>> {
    match value {
        ProjectedValue::Collection(lazy) if field == BARE_FIELD => Some(lazy),
        ProjectedValue::Composite(fields) => fields.iter().find_map(|(name, v)| match v {
            ProjectedValue::Collection(lazy) if name == field => Some(lazy),
            _ => None,
        }),
        _ => None,
    }
}
