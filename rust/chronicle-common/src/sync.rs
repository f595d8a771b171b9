//! Cross-target bound compatibility traits.
//!
//! The engine is meant to run on a single executor per process, but the
//! trait bounds used throughout the crate stay uniform whether or not that
//! executor happens to be multi-threaded.

#[allow(missing_docs)]
pub trait ConditionalSend: Send {}
impl<S> ConditionalSend for S where S: Send {}

#[allow(missing_docs)]
pub trait ConditionalSync: Send + Sync {}
impl<S> ConditionalSync for S where S: Send + Sync {}

/// A shared, interior-mutable cell guarded by a read-write lock.
///
/// Used anywhere multiple clones of a handle (an `Observer`, the
/// `NotificationRouter`'s subscription table) need to see the same mutable
/// state without threading a lock through every call site.
#[derive(Debug)]
pub struct SharedCell<T>(std::sync::RwLock<T>);

impl<T> SharedCell<T> {
    /// Creates a new cell wrapping `value`.
    pub fn new(value: T) -> Self {
        Self(std::sync::RwLock::new(value))
    }

    /// Acquires a read lock, blocking until it can be acquired.
    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, T> {
        self.0.read().expect("lock poisoned")
    }

    /// Acquires a write lock, blocking until it can be acquired.
    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, T> {
        self.0.write().expect("lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reads_and_writes() {
        let cell = SharedCell::new(1);
        assert_eq!(*cell.read(), 1);
        *cell.write() = 2;
        assert_eq!(*cell.read(), 2);
    }
}
