//! The declarative Specification language: AST, textual parser/describer,
//! and the label-free Skeleton form used for planning and plan equality.

mod condition;
mod describer;
mod error;
mod label;
mod parser;
mod projection;
mod skeleton;
mod specification;

pub use condition::{Condition, ExistentialCondition, Given, Match};
pub use describer::describe;
pub use error::{Invalid, InvalidKind, ParseError, Position};
pub use label::{Label, Role};
pub use parser::parse;
pub use projection::Projection;
pub use skeleton::{Skeleton, SkeletonEdge, SkeletonExistential, SkeletonFact, SkeletonMatch};
pub use specification::Specification;
