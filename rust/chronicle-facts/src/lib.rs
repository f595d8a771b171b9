//! Content-addressed fact model.
//!
//! A [`Fact`] is an immutable record with a type, named predecessor edges to
//! other facts, and scalar fields; it is identified by a [`FactReference`]
//! computed from a canonical byte encoding of its contents (spec §3, §4.1).
//! This crate has no notion of storage, querying, or reactivity — those live
//! in `chronicle-query`, `chronicle-inverse`, and `chronicle-observer`,
//! which consume facts purely through the types defined here.

mod canonical;
mod error;
mod fact;
mod hash;
mod reference;
mod scalar;

pub use error::FactError;
pub use fact::{Fact, Predecessors};
pub use hash::{FactHash, HASH_SIZE};
pub use reference::FactReference;
pub use scalar::Scalar;
