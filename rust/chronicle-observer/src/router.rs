use std::collections::HashMap;
use std::sync::Arc;

use chronicle_common::SharedCell;
use chronicle_facts::FactReference;
use chronicle_inverse::Inverse;
use chronicle_query::Store;
use tokio::sync::mpsc::unbounded_channel;

use crate::ids::{ObserverId, SubscriptionId};

struct Subscription {
    id: SubscriptionId,
    owner: ObserverId,
    sink: Arc<dyn Fn(FactReference) + Send + Sync>,
}

#[derive(Default)]
struct RouterState {
    by_pivot_type: HashMap<String, Vec<Subscription>>,
}

struct Inner<S> {
    store: S,
    state: SharedCell<RouterState>,
}

/// The process-wide dispatch table that turns store saves into the inverse
/// evaluations that keep observers current (spec §4.5).
///
/// One router drains one store's save notifications; every [`crate::Observer`]
/// built against that store shares the same router instance.
pub struct NotificationRouter<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for NotificationRouter<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S> NotificationRouter<S>
where
    S: Store + Clone + 'static,
{
    /// Subscribe to `store`'s save notifications and start routing them.
    /// The returned router can be cloned freely; all clones share the same
    /// subscription table and the same background dispatch task.
    pub fn spawn(store: S) -> Self {
        let router = Self {
            inner: Arc::new(Inner {
                store: store.clone(),
                state: SharedCell::new(RouterState::default()),
            }),
        };
        let (tx, mut rx) = unbounded_channel();
        store.subscribe_to_saves(tx);
        let worker = router.clone();
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                worker.dispatch(batch);
            }
        });
        router
    }

    /// Register interest in `inverse.pivot_type`. Every fact of that type
    /// saved from now on is delivered to `sink`, in storage order, until
    /// `unsubscribe` or `unsubscribe_owner` removes it.
    pub fn subscribe(&self, owner: ObserverId, inverse: Inverse, sink: Arc<dyn Fn(FactReference) + Send + Sync>) -> SubscriptionId {
        let id = SubscriptionId::fresh();
        let mut state = self.inner.state.write();
        state.by_pivot_type.entry(inverse.pivot_type).or_default().push(Subscription { id, owner, sink });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.inner.state.write();
        for subs in state.by_pivot_type.values_mut() {
            subs.retain(|s| s.id != id);
        }
    }

    /// Drop every subscription belonging to `owner`. Called once, when an
    /// observer stops.
    pub fn unsubscribe_owner(&self, owner: ObserverId) {
        let mut state = self.inner.state.write();
        for subs in state.by_pivot_type.values_mut() {
            subs.retain(|s| s.owner != owner);
        }
    }

    fn dispatch(&self, batch: Vec<FactReference>) {
        let state = self.inner.state.read();
        for fact in batch {
            let Some(subs) = state.by_pivot_type.get(&fact.fact_type) else {
                continue;
            };
            for sub in subs {
                (sub.sink)(fact.clone());
            }
        }
    }
}
