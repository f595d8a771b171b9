use std::sync::Arc;

use chronicle_common::{SharedCell, TaskQueue};
use chronicle_facts::{FactHash, FactReference};
use chronicle_query::{Evaluator, ProjectedValue, Store};
use chronicle_spec::Specification;

use crate::dispatch::{deliver_added, deliver_removed, eager_evaluate, spawn_incremental, Target};
use crate::error::ObserverError;
use crate::ids::ObserverId;
use crate::router::NotificationRouter;
use crate::tree::{NodeId, Tree};

/// A callback registered against one row or one collection, invoked each
/// time a matching row is added or removed (spec §4.6).
pub(crate) type RowHandler<S> = Box<dyn FnMut(RowEvent<S>) + Send + Sync>;

/// One change to a materialized collection, delivered to whatever handler
/// is registered for it.
pub enum RowEvent<S: Store + Clone> {
    Added(ObservedRow<S>),
    Removed(Vec<FactHash>),
}

/// A handle to one materialized row of an [`Observer`]'s result.
///
/// Registering a handler on a named `Collection` field of this row (with
/// [`on_child_added`](Self::on_child_added)) starts that nested collection
/// reacting to its own fact arrivals, recursively. A field registered while
/// this row's own `Added` callback is still executing receives every event
/// that raced in during the collection's first evaluation, in arrival
/// order, before that callback returns; registering later only sees events
/// from that point on (spec §4.6, handler-registration race).
pub struct ObservedRow<S: Store + Clone> {
    pub identity: Vec<FactHash>,
    pub value: ProjectedValue<S>,
    pub(crate) node: NodeId,
    pub(crate) shared: Arc<ObserverShared<S>>,
}

impl<S: Store + Clone + 'static> ObservedRow<S> {
    /// Registers `handler` against the `Collection` field named `field` of
    /// this row's own projection (pass `""` if the row's whole projection
    /// is a bare collection rather than a composite). A field with no
    /// registered handler is never evaluated, so unobserved branches of a
    /// wide specification cost nothing.
    pub fn on_child_added(&self, field: &str, handler: impl FnMut(RowEvent<S>) + Send + Sync + 'static) {
        if *self.shared.stopped.read() {
            return;
        }
        let should_spawn = {
            let mut tree = self.shared.tree.write();
            let Some(node) = tree.nodes.get_mut(&self.node) else {
                return;
            };
            let Some(collection) = node.children.get_mut(field) else {
                return;
            };
            collection.handler = Some(Box::new(handler));
            if collection.evaluation_started {
                false
            } else {
                collection.evaluation_started = true;
                true
            }
        };
        if should_spawn {
            let shared = self.shared.clone();
            let node = self.node;
            let field = field.to_string();
            self.shared.task_queue.write().spawn(eager_evaluate(shared, node, field));
        }
    }
}

/// Shared state behind every clone of a handle derived from one [`Observer`]
/// (the observer itself and every [`ObservedRow`] it has delivered).
pub(crate) struct ObserverShared<S: Store + Clone> {
    pub(crate) id: ObserverId,
    pub(crate) evaluator: Evaluator<S>,
    pub(crate) router: NotificationRouter<S>,
    pub(crate) tree: SharedCell<Tree<S>>,
    pub(crate) task_queue: SharedCell<TaskQueue>,
    pub(crate) failed: SharedCell<Option<String>>,
    pub(crate) stopped: SharedCell<bool>,
}

/// A live, incrementally-updated view of one [`Specification`]'s result
/// (spec §4.6).
///
/// Built with [`Observer::watch`], which runs the baseline evaluation and
/// delivers every starting row before returning. From then on, facts saved
/// to the store that this observer's inverses react to arrive as further
/// `Added`/`Removed` callbacks, dispatched through the shared
/// [`NotificationRouter`].
pub struct Observer<S: Store + Clone> {
    shared: Arc<ObserverShared<S>>,
}

impl<S: Store + Clone + 'static> Observer<S> {
    /// Starts watching `spec` bound to `given` against a dedicated
    /// [`NotificationRouter`], delivering every baseline row to `callback`
    /// before returning.
    ///
    /// Spawns its own router, meaning its own subscription to the store's
    /// save notifications. Prefer [`Observer::watch_with_router`] when more
    /// than one observer watches the same store, so they share a single
    /// router the way spec §4.5 describes ("a single process-wide
    /// component").
    pub async fn watch<F>(store: S, spec: Specification, given: Vec<FactReference>, callback: F) -> Result<Self, ObserverError>
    where
        F: FnMut(RowEvent<S>) + Send + Sync + 'static,
    {
        let router = NotificationRouter::spawn(store.clone());
        Self::watch_with_router(router, store, spec, given, callback).await
    }

    /// Starts watching `spec` bound to `given` against an existing,
    /// possibly-shared [`NotificationRouter`].
    pub async fn watch_with_router<F>(router: NotificationRouter<S>, store: S, spec: Specification, given: Vec<FactReference>, callback: F) -> Result<Self, ObserverError>
    where
        F: FnMut(RowEvent<S>) + Send + Sync + 'static,
    {
        let inverses = chronicle_inverse::inverses_of(&spec)?;
        let evaluator = Evaluator::new(store);
        let id = ObserverId::fresh();
        let shared = Arc::new(ObserverShared {
            id,
            evaluator: evaluator.clone(),
            router: router.clone(),
            tree: SharedCell::new(Tree::default()),
            task_queue: SharedCell::new(TaskQueue::default()),
            failed: SharedCell::new(None),
            stopped: SharedCell::new(false),
        });
        shared.tree.write().root_handler = Some(Box::new(callback));

        // Subscribe before evaluating the baseline: a fact that arrives
        // mid-evaluation must still be accounted for, not lost (spec §4.6,
        // "subscribe before building the result tree").
        for inverse in &inverses {
            let sink_shared = shared.clone();
            let sink_inverse = inverse.clone();
            let sink_given = given.clone();
            let sink: Arc<dyn Fn(FactReference) + Send + Sync> = Arc::new(move |fact| {
                spawn_incremental(sink_shared.clone(), Target::Root, sink_inverse.clone(), sink_given.clone(), fact);
            });
            router.subscribe(id, inverse.clone(), sink);
        }

        let rows = evaluator.read(&given, &spec).await.map_err(|err| ObserverError::Store(err.to_string()))?;

        let to_replay = {
            let mut tree = shared.tree.write();
            tree.root_buffering = false;
            std::mem::take(&mut tree.root_buffered)
        };

        for row in rows {
            deliver_added(shared.clone(), Target::Root, row).await;
        }
        for delta in to_replay {
            match delta {
                crate::tree::BufferedDelta::Add(row) => deliver_added(shared.clone(), Target::Root, row).await,
                crate::tree::BufferedDelta::Remove(identity) => deliver_removed(shared.clone(), Target::Root, identity).await,
            }
        }

        Ok(Self { shared })
    }

    /// Resolves once the initial evaluation and every callback it
    /// synchronously triggered (including nested collections registered
    /// during those callbacks) have completed.
    pub async fn loaded(&self) -> Result<(), ObserverError> {
        self.processed().await
    }

    /// Resolves once every notification enqueued before this call has been
    /// fully processed. Returns the observer's failure, if any unrecoverable
    /// store error has occurred since the observer started.
    pub async fn processed(&self) -> Result<(), ObserverError> {
        if let Some(message) = self.shared.failed.read().clone() {
            return Err(ObserverError::Store(message));
        }
        let mut pending = std::mem::take(&mut *self.shared.task_queue.write());
        pending.drain().await.map_err(|_| ObserverError::Stopped)?;
        if let Some(message) = self.shared.failed.read().clone() {
            return Err(ObserverError::Store(message));
        }
        Ok(())
    }

    /// Stops this observer: no further callbacks fire once this returns.
    /// Work already in flight when `stop` is called may still complete.
    pub fn stop(&self) {
        *self.shared.stopped.write() = true;
        self.shared.router.unsubscribe_owner(self.shared.id);
    }
}
