//! The Evaluator: runs a [`chronicle_spec::Specification`] against a
//! [`Store`] and produces projected rows (spec §4.3).

mod error;
mod evaluator;
mod limits;
mod memory;
mod projected;
mod store;

pub use error::{GivenMismatchKind, QueryError};
pub use evaluator::Evaluator;
pub use limits::Limits;
pub use memory::{MemoryStore, MemoryStoreError};
pub use projected::{LazyCollection, ProjectedRow, ProjectedValue};
pub use store::{Store, SubscriptionId};
