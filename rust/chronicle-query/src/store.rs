use std::future::Future;

use chronicle_common::{ConditionalSend, ConditionalSync};
use chronicle_facts::{Fact, FactReference};
use tokio::sync::mpsc::UnboundedSender;

/// A handle returned by [`Store::subscribe_to_saves`], used to cancel the
/// subscription later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// The narrow read/save/notify contract the evaluator and the router need
/// from a fact store (spec §6). Durable storage engines, signing, and the
/// wire protocol to a synchronizing server live behind this trait and are
/// not this crate's concern.
pub trait Store: ConditionalSend + ConditionalSync {
    /// The failure mode of this store's backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a batch of facts atomically. Facts already present by hash
    /// are not re-added; the returned sequence contains only the
    /// newly-added references, in the batch's declared order.
    fn save(&self, batch: Vec<Fact>) -> impl Future<Output = Result<Vec<FactReference>, Self::Error>> + ConditionalSend;

    /// Load a fact's content by reference.
    fn load(&self, reference: &FactReference) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + ConditionalSend;

    /// Filter `references` down to the ones already persisted.
    fn which_exist(
        &self,
        references: &[FactReference],
    ) -> impl Future<Output = Result<Vec<FactReference>, Self::Error>> + ConditionalSend;

    /// Facts of any type that reference `of` by the predecessor role
    /// `through_role`, restricted to `of_type`.
    fn successors(
        &self,
        of: &FactReference,
        through_role: &str,
        of_type: &str,
    ) -> impl Future<Output = Result<Vec<FactReference>, Self::Error>> + ConditionalSend;

    /// The predecessor(s) of `of` reachable through role `through_role`.
    /// Always returns a sequence; single-valued roles yield at most one
    /// entry.
    fn predecessors(
        &self,
        of: &FactReference,
        through_role: &str,
    ) -> impl Future<Output = Result<Vec<FactReference>, Self::Error>> + ConditionalSend;

    /// Register to be notified, in save order, of every batch accepted by
    /// [`Store::save`]. This is the router's hook (spec §4.5).
    fn subscribe_to_saves(&self, sink: UnboundedSender<Vec<FactReference>>) -> SubscriptionId;

    /// Cancel a subscription registered with [`Store::subscribe_to_saves`].
    fn unsubscribe_from_saves(&self, subscription: SubscriptionId);
}
