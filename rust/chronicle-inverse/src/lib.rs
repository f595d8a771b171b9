//! The Inverse compiler: derives, from one [`chronicle_spec::Specification`],
//! the set of triggers that tell the observer which fact arrivals can change
//! its result (spec §4.4).

mod compiler;
mod error;
mod types;

pub use compiler::inverses_of;
pub use error::InverseError;
pub use types::{Inverse, Operation};
