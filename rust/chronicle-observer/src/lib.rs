//! The Notification Router and the Observer built on top of it: the
//! reactive layer that keeps a [`chronicle_spec::Specification`]'s result
//! current as facts are saved (spec §4.5, §4.6).

mod dispatch;
mod error;
mod ids;
mod observer;
mod router;
mod tree;

pub use error::ObserverError;
pub use observer::{ObservedRow, Observer, RowEvent};
pub use router::NotificationRouter;
