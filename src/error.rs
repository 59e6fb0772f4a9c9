// SPDX-License-Identifier: MIT OR Apache-2.0
use std::fmt;

/// Which side of the lock an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Shared access.
    Read,
    /// Exclusive access.
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// A protocol violation by the caller of an [`RwMutex`](crate::RwMutex).
///
/// Every variant is a bug in the calling code. Nothing about the lock is
/// changed when one of these is returned.
///
/// # Examples
///
/// ```
/// use gated_rwlock::{Access, LockError, RwMutexChecked};
///
/// let mutex = RwMutexChecked::new();
/// assert_eq!(
///     mutex.read_unlock(),
///     Err(LockError::NotLocked { access: Access::Read })
/// );
///
/// mutex.read_lock().unwrap();
/// // Upgrading from read to write on one thread would wait on itself forever.
/// assert_eq!(
///     mutex.write_lock(),
///     Err(LockError::Reentrant { requested: Access::Write })
/// );
/// mutex.read_unlock().unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockError {
    /// The current thread already holds this mutex in a mode that makes the
    /// requested acquisition wait on itself. Only reported by the tracking
    /// detector.
    Reentrant {
        /// The access that was refused.
        requested: Access,
    },
    /// An unlock was requested for a lock that is not held in that mode.
    NotLocked {
        /// The access that was being released.
        access: Access,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Reentrant { requested } => write!(
                f,
                "{requested} lock refused: not allowed to mix read and write locks on the same thread"
            ),
            LockError::NotLocked { access } => {
                write!(f, "invalid call to unlock: {access} lock is not held")
            }
        }
    }
}

impl std::error::Error for LockError {}
