// SPDX-License-Identifier: MIT OR Apache-2.0
//! Guard types for [`ValueLock`](crate::ValueLock).
//!
//! A guard is created by taking the lock and releases it when dropped. Guards
//! are not `Clone`, so one hold can never turn into two live guards; moving a
//! guard moves the hold. Because the deadlock detector keeps its books per
//! thread, guards are `!Send` and are always released where they were taken.

use crate::detector::{DeadlockDetector, DefaultDetector};
use crate::error::LockError;
use crate::value_lock::Shared;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shared access to the value of a [`ValueLock`](crate::ValueLock).
///
/// Many `ReadGuard`s may be live at once, on any number of threads.
///
/// # Examples
///
/// ```
/// use gated_rwlock::ValueLock;
///
/// let lock = ValueLock::new(vec![1, 2, 3]);
/// {
///     let guard1 = lock.read();
///     let guard2 = lock.read();
///     assert_eq!(guard1.len(), 3);
///     assert_eq!(guard2[0], 1);
///     assert_eq!(lock.state().readers, 2);
/// }
/// assert!(lock.state().is_unlocked());
/// ```
pub struct ReadGuard<T, D: DeadlockDetector = DefaultDetector> {
    shared: Arc<Shared<T, D>>,
    _not_send: PhantomData<*const ()>,
}

/// Exclusive access to the value of a [`ValueLock`](crate::ValueLock).
///
/// # Examples
///
/// ```
/// use gated_rwlock::ValueLock;
///
/// let lock = ValueLock::new(String::from("hello"));
/// {
///     let mut guard = lock.write();
///     guard.push_str(", world!");
///     assert_eq!(&*guard, "hello, world!");
/// }
/// assert_eq!(*lock.read(), "hello, world!");
/// ```
pub struct WriteGuard<T, D: DeadlockDetector = DefaultDetector> {
    shared: Arc<Shared<T, D>>,
    _not_send: PhantomData<*const ()>,
}

impl<T, D: DeadlockDetector> ReadGuard<T, D> {
    pub(crate) fn acquire(shared: Arc<Shared<T, D>>) -> Result<Self, LockError> {
        shared.mutex.read_lock()?;
        Ok(ReadGuard {
            shared,
            _not_send: PhantomData,
        })
    }
}

impl<T, D: DeadlockDetector> WriteGuard<T, D> {
    pub(crate) fn acquire(shared: Arc<Shared<T, D>>) -> Result<Self, LockError> {
        shared.mutex.write_lock()?;
        Ok(WriteGuard {
            shared,
            _not_send: PhantomData,
        })
    }
}

impl<T, D: DeadlockDetector> std::ops::Deref for ReadGuard<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a read lock is held for our whole lifetime, so no `&mut T` exists
        unsafe { &*self.shared.value.get() }
    }
}

impl<T, D: DeadlockDetector> std::ops::Deref for WriteGuard<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write lock is held for our whole lifetime
        unsafe { &*self.shared.value.get() }
    }
}

impl<T, D: DeadlockDetector> std::ops::DerefMut for WriteGuard<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write lock is held, and `&mut self` rules out other borrows
        unsafe { &mut *self.shared.value.get() }
    }
}

impl<T, D: DeadlockDetector> Drop for ReadGuard<T, D> {
    fn drop(&mut self) {
        let unlocked = self.shared.mutex.read_unlock();
        assert!(unlocked.is_ok(), "read guard dropped: {unlocked:?}");
    }
}

impl<T, D: DeadlockDetector> Drop for WriteGuard<T, D> {
    fn drop(&mut self) {
        let unlocked = self.shared.mutex.write_unlock();
        assert!(unlocked.is_ok(), "write guard dropped: {unlocked:?}");
    }
}

// Sharing a guard only ever shares `&T`.
unsafe impl<T: Sync, D: DeadlockDetector> Sync for ReadGuard<T, D> {}
unsafe impl<T: Sync, D: DeadlockDetector> Sync for WriteGuard<T, D> {}

// ================================================================================================
// Boilerplate trait implementations
// ================================================================================================

impl<T, D: DeadlockDetector> AsRef<T> for ReadGuard<T, D> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, D: DeadlockDetector> AsRef<T> for WriteGuard<T, D> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, D: DeadlockDetector> AsMut<T> for WriteGuard<T, D> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: std::fmt::Debug, D: DeadlockDetector> std::fmt::Debug for ReadGuard<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadGuard")
            .field("data", &**self)
            .finish_non_exhaustive()
    }
}

impl<T: std::fmt::Debug, D: DeadlockDetector> std::fmt::Debug for WriteGuard<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard")
            .field("data", &**self)
            .finish_non_exhaustive()
    }
}

impl<T: std::fmt::Display, D: DeadlockDetector> std::fmt::Display for ReadGuard<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&**self, f)
    }
}

impl<T: std::fmt::Display, D: DeadlockDetector> std::fmt::Display for WriteGuard<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&**self, f)
    }
}
