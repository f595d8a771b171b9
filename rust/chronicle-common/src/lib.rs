//! Light weight helpers shared across the chronicle crates. Their chief
//! quality is that they have virtually zero dependencies.

mod sync;
pub use sync::*;

mod r#async;
pub use r#async::*;
