use std::collections::HashMap;
use std::sync::Arc;

use chronicle_common::SharedCell;
use chronicle_facts::{Fact, FactError, FactHash, FactReference};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::store::{Store, SubscriptionId};

/// The single in-scope storage exception (spec §1): a reference
/// implementation of [`Store`] used for testing the evaluator, the inverse
/// compiler, and the observer without a durable backend.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<SharedCell<State>>,
}

#[derive(Default)]
struct State {
    facts: HashMap<FactHash, Fact>,
    successors: HashMap<(FactReference, String), Vec<FactReference>>,
    subscribers: HashMap<u64, UnboundedSender<Vec<FactReference>>>,
    next_subscription: u64,
}

/// [`MemoryStore`] only fails when a fact cannot be canonicalized.
#[derive(Error, Debug)]
pub enum MemoryStoreError {
    #[error(transparent)]
    InvalidFact(#[from] FactError),
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedCell::new(State::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    type Error = MemoryStoreError;

    async fn save(&self, batch: Vec<Fact>) -> Result<Vec<FactReference>, Self::Error> {
        let mut added = Vec::new();
        {
            let mut state = self.state.write();
            for fact in batch {
                let reference = fact.reference()?;
                if state.facts.contains_key(&reference.hash) {
                    continue;
                }
                for (role, predecessors) in &fact.predecessors {
                    for predecessor in predecessors.references() {
                        state
                            .successors
                            .entry((predecessor.clone(), role.clone()))
                            .or_default()
                            .push(reference.clone());
                    }
                }
                state.facts.insert(reference.hash, fact);
                added.push(reference);
            }
            if !added.is_empty() {
                debug!(count = added.len(), "persisted new facts");
                for sender in state.subscribers.values() {
                    let _ = sender.send(added.clone());
                }
            }
        }
        Ok(added)
    }

    async fn load(&self, reference: &FactReference) -> Result<Option<Fact>, Self::Error> {
        Ok(self.state.read().facts.get(&reference.hash).cloned())
    }

    async fn which_exist(&self, references: &[FactReference]) -> Result<Vec<FactReference>, Self::Error> {
        let state = self.state.read();
        Ok(references
            .iter()
            .filter(|r| state.facts.contains_key(&r.hash))
            .cloned()
            .collect())
    }

    async fn successors(
        &self,
        of: &FactReference,
        through_role: &str,
        of_type: &str,
    ) -> Result<Vec<FactReference>, Self::Error> {
        let state = self.state.read();
        Ok(state
            .successors
            .get(&(of.clone(), through_role.to_string()))
            .into_iter()
            .flatten()
            .filter(|r| r.fact_type == of_type)
            .cloned()
            .collect())
    }

    async fn predecessors(&self, of: &FactReference, through_role: &str) -> Result<Vec<FactReference>, Self::Error> {
        let state = self.state.read();
        Ok(state
            .facts
            .get(&of.hash)
            .map(|fact| fact.predecessors_by_role(through_role).to_vec())
            .unwrap_or_default())
    }

    fn subscribe_to_saves(&self, sink: UnboundedSender<Vec<FactReference>>) -> SubscriptionId {
        let mut state = self.state.write();
        let id = state.next_subscription;
        state.next_subscription += 1;
        state.subscribers.insert(id, sink);
        SubscriptionId(id)
    }

    fn unsubscribe_from_saves(&self, subscription: SubscriptionId) {
        self.state.write().subscribers.remove(&subscription.0);
    }
}

#[cfg(test)]
mod tests {
    use chronicle_facts::Fact;

    use super::*;

    fn office(company: &FactReference, id: &str) -> Fact {
        Fact::new("Office")
            .with_predecessor("company", company.clone())
            .with_field("id", id)
    }

    #[tokio::test]
    async fn it_deduplicates_identical_facts_within_a_batch() {
        let store = MemoryStore::new();
        let company = Fact::new("Company").with_field("id", "Acme");
        let reference = company.reference().unwrap();
        let added = store.save(vec![company.clone(), company]).await.unwrap();
        assert_eq!(added, vec![reference]);
    }

    #[tokio::test]
    async fn it_indexes_successors_by_role_and_type() {
        let store = MemoryStore::new();
        let company = Fact::new("Company").with_field("id", "Acme");
        let company_ref = store.save(vec![company]).await.unwrap().remove(0);
        let office = office(&company_ref, "HQ");
        let office_ref = store.save(vec![office]).await.unwrap().remove(0);

        let successors = store.successors(&company_ref, "company", "Office").await.unwrap();
        assert_eq!(successors, vec![office_ref]);
    }

    #[tokio::test]
    async fn it_walks_predecessors_by_role() {
        let store = MemoryStore::new();
        let company = Fact::new("Company").with_field("id", "Acme");
        let company_ref = store.save(vec![company]).await.unwrap().remove(0);
        let office = office(&company_ref, "HQ");
        store.save(vec![office.clone()]).await.unwrap();

        let predecessors = store.predecessors(&office.reference().unwrap(), "company").await.unwrap();
        assert_eq!(predecessors, vec![company_ref]);
    }

    #[tokio::test]
    async fn it_notifies_subscribers_only_of_newly_added_facts() {
        let store = MemoryStore::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        store.subscribe_to_saves(tx);

        let company = Fact::new("Company").with_field("id", "Acme");
        store.save(vec![company.clone()]).await.unwrap();
        store.save(vec![company]).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(rx.try_recv().is_err());
    }
}
