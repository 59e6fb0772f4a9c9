// SPDX-License-Identifier: MIT OR Apache-2.0
//! A writer-preferring reader-writer mutex that catches same-thread deadlocks,
//! plus a value lock built on it.
//!
//! # The pieces
//!
//! - [`RwMutexImpl`]: raw `read_lock`/`read_unlock`/`write_lock`/`write_unlock`.
//!   The lock word is a single atomic holding the reader count and the
//!   [`WriterState`]; every change to it is a compare-and-swap. A blocking gate
//!   serialises writers and parks readers while a writer is active.
//! - [`DeadlockDetector`]: per-thread bookkeeping that refuses a lock the
//!   calling thread could only get by waiting on itself (read-then-write,
//!   write-then-write, write-then-read on one mutex).
//! - [`ValueLock`]: owns a value together with its mutex and hands out
//!   [`ReadGuard`]s and [`WriteGuard`]s.
//!
//! # Ordering
//!
//! Once a writer has announced itself, no new reader is admitted; readers
//! already inside finish first, then the writer runs. Among writers there is
//! no FIFO guarantee. Nothing here takes a timeout.
//!
//! # Choosing a detector at build time
//!
//! [`RwMutex`] and the default parameter of [`ValueLock`] use
//! [`DefaultDetector`], fixed when the crate is compiled:
//!
//! 1. `GATED_RWLOCK_DETECTOR=tracking` or `=null` in the build environment wins;
//! 2. otherwise the `checked` feature selects [`TrackingDetector`] and the
//!    `unchecked` feature selects [`NullDetector`] (`checked` wins if both are on);
//! 3. otherwise debug builds track and release builds do not.
//!
//! [`RwMutexChecked`] and [`RwMutexUnchecked`] name either choice explicitly.
//!
//! # Example
//!
//! ```
//! # if cfg!(target_arch = "wasm32") { return; }
//! use gated_rwlock::ValueLock;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let lock = Arc::new(ValueLock::new(vec![1, 2, 3]));
//!
//! let writer = {
//!     let lock = Arc::clone(&lock);
//!     thread::spawn(move || lock.write().push(4))
//! };
//! writer.join().unwrap();
//!
//! let readers: Vec<_> = (0..3)
//!     .map(|_| {
//!         let lock = Arc::clone(&lock);
//!         thread::spawn(move || lock.read().iter().sum::<i32>())
//!     })
//!     .collect();
//! for reader in readers {
//!     assert_eq!(reader.join().unwrap(), 10);
//! }
//! ```
//!
//! # Logging
//!
//! Slow paths and refused calls are reported through the [`log`] facade at
//! `trace` and `debug` level. The crate never installs a logger.

mod detector;
mod error;
mod gate;
mod guard;
mod mutex;
mod spinlock;
mod state;
mod value_lock;
#[cfg(target_arch = "wasm32")]
mod wasm_support;

#[cfg(test)]
mod test_support;

pub use detector::{DeadlockDetector, DefaultDetector, MutexId, NullDetector, TrackingDetector};
pub use error::{Access, LockError};
pub use guard::{ReadGuard, WriteGuard};
pub use mutex::{RwMutex, RwMutexChecked, RwMutexImpl, RwMutexUnchecked};
pub use state::{LockState, WriterState};
pub use value_lock::ValueLock;
