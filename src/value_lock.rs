// SPDX-License-Identifier: MIT OR Apache-2.0
//! A value and the mutex that protects it, shared behind one allocation.

use crate::detector::{DeadlockDetector, DefaultDetector};
use crate::error::LockError;
use crate::guard::{ReadGuard, WriteGuard};
use crate::mutex::RwMutexImpl;
use crate::state::LockState;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
mod tests;

pub(crate) struct Shared<T, D: DeadlockDetector> {
    pub(crate) value: UnsafeCell<T>,
    pub(crate) mutex: RwMutexImpl<D>,
}

// The mutex hands out `&T` to many threads and `&mut T` to one at a time.
unsafe impl<T: Send + Sync, D: DeadlockDetector> Send for Shared<T, D> {}
unsafe impl<T: Send + Sync, D: DeadlockDetector> Sync for Shared<T, D> {}

/// A value protected by a reader-writer mutex.
///
/// [`read`](Self::read) returns a [`ReadGuard`] that derefs to `&T`;
/// [`write`](Self::write) returns a [`WriteGuard`] that also derefs to
/// `&mut T`. Any number of read guards may be live at once, or exactly one
/// write guard. A writer that has started waiting keeps new readers out until
/// it is done.
///
/// The value and its mutex live in one reference-counted allocation. Every
/// guard owns a reference to it, so the value outlives every guard even if the
/// `ValueLock` itself is dropped first.
///
/// Guards must be dropped on the thread that created them; they are `!Send`.
///
/// # Examples
///
/// ```
/// use gated_rwlock::ValueLock;
///
/// let lock = ValueLock::new(String::from("Hello"));
/// {
///     let a = lock.read();
///     let b = lock.read();
///     assert_eq!(*a, "Hello");
///     assert_eq!(*b, "Hello");
/// }
/// lock.write().push_str(", world");
/// assert_eq!(lock.with_read(|s| s.len()), 12);
/// ```
///
/// ## Picking a detector
///
/// ```
/// use gated_rwlock::{LockError, TrackingDetector, ValueLock};
///
/// let lock = ValueLock::<_, TrackingDetector>::with_detector(0);
/// let reader = lock.read();
/// assert!(matches!(lock.checked_write(), Err(LockError::Reentrant { .. })));
/// drop(reader);
/// *lock.write() += 1;
/// ```
pub struct ValueLock<T, D: DeadlockDetector = DefaultDetector> {
    shared: Arc<Shared<T, D>>,
}

impl<T> ValueLock<T> {
    /// Wraps `value` using the build's default deadlock detector.
    pub fn new(value: T) -> ValueLock<T> {
        ValueLock::with_detector(value)
    }
}

impl<T, D: DeadlockDetector> ValueLock<T, D> {
    /// Wraps `value`, with the detector chosen by the type parameter.
    pub fn with_detector(value: T) -> ValueLock<T, D> {
        ValueLock {
            shared: Arc::new(Shared {
                value: UnsafeCell::new(value),
                mutex: RwMutexImpl::new(),
            }),
        }
    }

    /// Blocks until shared access is granted.
    ///
    /// # Panics
    ///
    /// Panics if the detector refuses the lock because this thread holds the
    /// write guard. Use [`checked_read`](Self::checked_read) to get the error
    /// instead.
    pub fn read(&self) -> ReadGuard<T, D> {
        match self.checked_read() {
            Ok(guard) => guard,
            Err(err) => panic!("{err}"),
        }
    }

    /// Blocks until exclusive access is granted.
    ///
    /// # Panics
    ///
    /// Panics if the detector refuses the lock because this thread holds any
    /// guard on this value. Use [`checked_write`](Self::checked_write) to get
    /// the error instead.
    pub fn write(&self) -> WriteGuard<T, D> {
        match self.checked_write() {
            Ok(guard) => guard,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`read`](Self::read), but returns a refusal as an error.
    pub fn checked_read(&self) -> Result<ReadGuard<T, D>, LockError> {
        ReadGuard::acquire(Arc::clone(&self.shared))
    }

    /// Like [`write`](Self::write), but returns a refusal as an error.
    pub fn checked_write(&self) -> Result<WriteGuard<T, D>, LockError> {
        WriteGuard::acquire(Arc::clone(&self.shared))
    }

    /// Runs `f` under a read guard that is released as soon as `f` returns.
    ///
    /// ```
    /// use gated_rwlock::ValueLock;
    ///
    /// let lock = ValueLock::new(vec![1, 2, 3]);
    /// assert_eq!(lock.with_read(|v| v.iter().sum::<i32>()), 6);
    /// ```
    pub fn with_read<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
        let guard = self.read();
        f(&guard)
    }

    /// Runs `f` under a write guard that is released as soon as `f` returns.
    ///
    /// ```
    /// use gated_rwlock::ValueLock;
    ///
    /// let lock = ValueLock::new(vec![1, 2, 3]);
    /// let len = lock.with_write(|v| {
    ///     v.push(4);
    ///     v.len()
    /// });
    /// assert_eq!(len, 4);
    /// ```
    pub fn with_write<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut guard = self.write();
        f(&mut guard)
    }

    /// A snapshot of the underlying lock word.
    pub fn state(&self) -> LockState {
        self.shared.mutex.state()
    }
}

impl<T: Default, D: DeadlockDetector> Default for ValueLock<T, D> {
    fn default() -> Self {
        ValueLock::with_detector(T::default())
    }
}

impl<T, D: DeadlockDetector> From<T> for ValueLock<T, D> {
    fn from(value: T) -> Self {
        ValueLock::with_detector(value)
    }
}

impl<T, D: DeadlockDetector> fmt::Debug for ValueLock<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reading the value could block or be refused, so only the lock is shown.
        f.debug_struct("ValueLock")
            .field("mutex", &self.shared.mutex)
            .finish_non_exhaustive()
    }
}
