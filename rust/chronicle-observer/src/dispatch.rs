use std::sync::Arc;

use chronicle_facts::{FactHash, FactReference};
use chronicle_inverse::{Inverse, Operation};
use chronicle_query::{ProjectedRow, Store};
use chronicle_common::TaskError;
use futures_util::future::{BoxFuture, FutureExt};

use crate::observer::{ObservedRow, ObserverShared, RowEvent, RowHandler};
use crate::tree::{collection_fields, find_collection, BufferedDelta, Node, NodeId, Tree};

/// Where a delivered row (or removal) belongs in the result tree: the
/// observer's own top-level result, or a named child-collection field of
/// an already-materialized row.
#[derive(Clone)]
pub(crate) enum Target {
    Root,
    Child(NodeId, String),
}

impl Target {
    fn is_buffering<S: Store + Clone>(&self, tree: &Tree<S>) -> bool {
        match self {
            Target::Root => tree.root_buffering,
            Target::Child(parent, field) => tree
                .nodes
                .get(parent)
                .and_then(|n| n.children.get(field))
                .map(|c| c.buffering)
                .unwrap_or(true),
        }
    }

    fn push_buffered<S: Store + Clone>(&self, tree: &mut Tree<S>, delta: BufferedDelta<S>) {
        match self {
            Target::Root => tree.root_buffered.push(delta),
            Target::Child(parent, field) => {
                if let Some(c) = tree.nodes.get_mut(parent).and_then(|n| n.children.get_mut(field)) {
                    c.buffered.push(delta);
                }
            }
        }
    }

    fn contains<S: Store + Clone>(&self, tree: &Tree<S>, identity: &[FactHash]) -> bool {
        match self {
            Target::Root => tree.root.contains_key(identity),
            Target::Child(parent, field) => tree
                .nodes
                .get(parent)
                .and_then(|n| n.children.get(field))
                .map(|c| c.rows.contains_key(identity))
                .unwrap_or(false),
        }
    }

    fn register<S: Store + Clone>(&self, tree: &mut Tree<S>, identity: Vec<FactHash>, node_id: NodeId) {
        match self {
            Target::Root => {
                tree.root.insert(identity, node_id);
            }
            Target::Child(parent, field) => {
                if let Some(c) = tree.nodes.get_mut(parent).and_then(|n| n.children.get_mut(field)) {
                    c.rows.insert(identity, node_id);
                }
            }
        }
    }

    fn unregister<S: Store + Clone>(&self, tree: &mut Tree<S>, identity: &[FactHash]) -> Option<NodeId> {
        match self {
            Target::Root => tree.root.remove(identity),
            Target::Child(parent, field) => tree.nodes.get_mut(parent).and_then(|n| n.children.get_mut(field)).and_then(|c| c.rows.remove(identity)),
        }
    }

    fn take_handler<S: Store + Clone>(&self, tree: &mut Tree<S>) -> Option<RowHandler<S>> {
        match self {
            Target::Root => tree.root_handler.take(),
            Target::Child(parent, field) => tree.nodes.get_mut(parent).and_then(|n| n.children.get_mut(field)).and_then(|c| c.handler.take()),
        }
    }

    fn put_handler<S: Store + Clone>(&self, tree: &mut Tree<S>, handler: RowHandler<S>) {
        match self {
            Target::Root => tree.root_handler = Some(handler),
            Target::Child(parent, field) => {
                if let Some(c) = tree.nodes.get_mut(parent).and_then(|n| n.children.get_mut(field)) {
                    c.handler = Some(handler);
                }
            }
        }
    }
}

/// Deliver one `Add`: insert a node for `row` (unless one already exists for
/// its identity, making this a no-op per spec §4.4 rule on idempotent add)
/// and hand it to whichever handler is currently registered for `target`.
///
/// If `target` is still buffering (its collection hasn't been evaluated, or
/// the root's baseline hasn't finished), the row is queued instead and
/// delivered later by the code that flips buffering off.
pub(crate) fn deliver_added<S: Store + Clone + 'static>(shared: Arc<ObserverShared<S>>, target: Target, row: ProjectedRow<S>) -> BoxFuture<'static, ()> {
    async move {
        let identity = row.identity.clone();
        let value_for_row = row.value.clone();

        let (node_id, handler) = {
            let mut tree = shared.tree.write();
            if target.is_buffering(&tree) {
                target.push_buffered(&mut tree, BufferedDelta::Add(row));
                return;
            }
            if target.contains(&tree, &identity) {
                return;
            }

            let fields = collection_fields(&row.value);
            let id = tree.fresh_id();
            let node = Node {
                identity: identity.clone(),
                value: row.value,
                children: fields.into_iter().map(|f| (f, Default::default())).collect(),
            };
            tree.nodes.insert(id, node);
            target.register(&mut tree, identity.clone(), id);
            let handler = target.take_handler(&mut tree);
            (id, handler)
        };

        if let Some(mut handler) = handler {
            let observed = ObservedRow {
                identity: identity.clone(),
                value: value_for_row,
                node: node_id,
                shared: shared.clone(),
            };
            handler(RowEvent::Added(observed));
            let mut tree = shared.tree.write();
            target.put_handler(&mut tree, handler);
        }
    }
    .boxed()
}

/// Deliver one `Remove`: drop the node for `identity` (a no-op if it isn't
/// present), recursively tearing down and unsubscribing any of its own
/// child collections, and notify whichever handler is registered.
pub(crate) fn deliver_removed<S: Store + Clone + 'static>(shared: Arc<ObserverShared<S>>, target: Target, identity: Vec<FactHash>) -> BoxFuture<'static, ()> {
    async move {
        let handler = {
            let mut tree = shared.tree.write();
            if target.is_buffering(&tree) {
                target.push_buffered(&mut tree, BufferedDelta::Remove(identity));
                return;
            }
            let Some(node_id) = target.unregister(&mut tree, &identity) else {
                return;
            };
            teardown(&mut tree, node_id, &shared.router);
            tree.nodes.remove(&node_id);
            target.take_handler(&mut tree)
        };

        if let Some(mut handler) = handler {
            handler(RowEvent::Removed(identity));
            let mut tree = shared.tree.write();
            target.put_handler(&mut tree, handler);
        }
    }
    .boxed()
}

/// Recursively unsubscribe every descendant collection's router
/// subscriptions before the node itself is dropped. The spec doesn't ask
/// observers to notify grandchildren's own removal handlers when an
/// ancestor disappears (only the direct parent's `Removed` event fires);
/// dropped subtrees are simply silently released.
fn teardown<S: Store + Clone + 'static>(tree: &mut Tree<S>, node_id: NodeId, router: &crate::router::NotificationRouter<S>) {
    let Some(node) = tree.nodes.get(&node_id) else {
        return;
    };
    let mut subscription_ids = Vec::new();
    let mut grandchildren = Vec::new();
    for collection in node.children.values() {
        subscription_ids.extend(collection.subscriptions.iter().copied());
        grandchildren.extend(collection.rows.values().copied());
    }
    for id in subscription_ids {
        router.unsubscribe(id);
    }
    for child in grandchildren {
        teardown(tree, child, router);
        tree.nodes.remove(&child);
    }
}

/// Evaluate a child collection for the first time: run it, compile its own
/// inverses, subscribe to the router for each, then deliver its rows and
/// replay whatever raced in while the evaluation was in flight.
pub(crate) async fn eager_evaluate<S: Store + Clone + 'static>(shared: Arc<ObserverShared<S>>, parent: NodeId, field: String) -> Result<(), TaskError> {
    if *shared.stopped.read() {
        return Ok(());
    }

    let lazy = {
        let tree = shared.tree.read();
        let Some(node) = tree.nodes.get(&parent) else {
            return Ok(());
        };
        match find_collection(&node.value, &field) {
            Some(lazy) => lazy.clone(),
            None => return Ok(()),
        }
    };

    let rows = match lazy.evaluate().await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, field = %field, "initial evaluation of a child collection failed; it will appear empty");
            Vec::new()
        }
    };

    let inverses = match chronicle_inverse::inverses_of(&lazy.specification) {
        Ok(inverses) => inverses,
        Err(err) => {
            tracing::warn!(error = %err, field = %field, "failed to compile inverses for a child collection; it will not update incrementally");
            Vec::new()
        }
    };

    let base_given = lazy.given.clone();
    let mut subscriptions = Vec::new();
    for inverse in &inverses {
        let sink_shared = shared.clone();
        let sink_target = Target::Child(parent, field.clone());
        let sink_inverse = inverse.clone();
        let sink_given = base_given.clone();
        let sink: Arc<dyn Fn(FactReference) + Send + Sync> = Arc::new(move |fact| {
            spawn_incremental(sink_shared.clone(), sink_target.clone(), sink_inverse.clone(), sink_given.clone(), fact);
        });
        subscriptions.push(shared.router.subscribe(shared.id, inverse.clone(), sink));
    }

    let to_replay = {
        let mut tree = shared.tree.write();
        let Some(node) = tree.nodes.get_mut(&parent) else {
            return Ok(());
        };
        let Some(collection) = node.children.get_mut(&field) else {
            return Ok(());
        };
        collection.base_given = base_given;
        collection.inverses = inverses;
        collection.subscriptions = subscriptions;
        collection.buffering = false;
        std::mem::take(&mut collection.buffered)
    };

    for row in rows {
        deliver_added(shared.clone(), Target::Child(parent, field.clone()), row).await;
    }
    for delta in to_replay {
        match delta {
            BufferedDelta::Add(row) => deliver_added(shared.clone(), Target::Child(parent, field.clone()), row).await,
            BufferedDelta::Remove(identity) => deliver_removed(shared.clone(), Target::Child(parent, field.clone()), identity).await,
        }
    }
    Ok(())
}

/// Evaluate one inverse against a freshly-arrived pivot fact and apply
/// whichever delta it produces at `target`. Queued on the observer's task
/// queue so a synchronous router dispatch can trigger asynchronous work.
pub(crate) fn spawn_incremental<S: Store + Clone + 'static>(shared: Arc<ObserverShared<S>>, target: Target, inverse: Inverse, base_given: Vec<FactReference>, fact: FactReference) {
    if *shared.stopped.read() {
        return;
    }
    let queue_shared = shared.clone();
    queue_shared.task_queue.write().spawn(async move {
        // `inverse.inner_specification.given` is the outer spec's own givens,
        // in their original order, with the pivot appended last (see
        // `plain_pivot_inverse`/`existential_pivot_inverse`) — except for the
        // self-inverse, whose `inner_specification` IS the unchanged original
        // spec and whose `given_subset` is empty, so the fact alone fills its
        // one declared slot. `read` binds this vector to that list by
        // position, so it has to mirror the same order.
        let mut given = Vec::with_capacity(1 + inverse.given_subset.len());
        for &index in &inverse.given_subset {
            let Some(reference) = base_given.get(index) else {
                tracing::warn!(pivot_type = %inverse.pivot_type, "inverse given_subset index out of range for its nesting level; dropping this notification");
                return Ok(());
            };
            given.push(reference.clone());
        }
        given.push(fact);

        let rows = match shared.evaluator.read(&given, &inverse.inner_specification).await {
            Ok(rows) => rows,
            Err(chronicle_query::QueryError::StoreError(err)) => {
                tracing::warn!(error = %err, pivot_type = %inverse.pivot_type, "unrecoverable store error while processing a notification");
                *shared.failed.write() = Some(err.to_string());
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(error = %err, pivot_type = %inverse.pivot_type, "evaluator error while processing a notification; result may be stale");
                return Ok(());
            }
        };

        for row in rows {
            match inverse.operation {
                Operation::Add => deliver_added(shared.clone(), target.clone(), row).await,
                Operation::Remove => deliver_removed(shared.clone(), target.clone(), row.identity.clone()).await,
            }
        }
        Ok(())
    });
}
