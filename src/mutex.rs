// SPDX-License-Identifier: MIT OR Apache-2.0
//! The writer-preferring reader-writer mutex.
//!
//! # State machine
//!
//! The lock word holds `(readers, writer)` and every transition is one
//! compare-and-swap, retried against a fresh observation until it lands:
//!
//! | operation      | transition                                    |
//! |----------------|-----------------------------------------------|
//! | `read_lock`    | `{r, None} → {r+1, None}`                     |
//! | `read_unlock`  | `{r, w} → {r-1, w}`, `r > 0`                  |
//! | `write_lock`   | `{r, _} → {r, Waiting}`, then `{0, Waiting} → {0, Owned}` |
//! | `write_unlock` | `{0, Owned} → {0, None}`                      |
//!
//! A writer first takes the gate, which keeps other writers out, then
//! announces itself with `Waiting`. From that moment new readers see writer
//! interest and wait on the gate instead of joining, while readers that were
//! already inside finish normally. Once the count reaches zero the writer
//! moves to `Owned`. Writers therefore win over readers that arrive after
//! them; among writers the order is whatever the gate gives.
//!
//! # Errors
//!
//! Unlocking something that is not held returns [`LockError::NotLocked`] and
//! leaves the lock untouched. With [`TrackingDetector`](crate::TrackingDetector),
//! a same-thread acquisition that would wait on itself returns
//! [`LockError::Reentrant`] before blocking. With [`NullDetector`] such a call
//! deadlocks.
//!
//! A thread that already reads and asks for a second read lock is allowed to,
//! but if a writer has announced itself in between, that second read waits
//! for the writer while the writer waits for the first read. Avoid nested
//! reads on one mutex.

use crate::detector::{DeadlockDetector, DefaultDetector, MutexId, NullDetector, TrackingDetector};
use crate::error::{Access, LockError};
use crate::gate::Gate;
use crate::state::{AtomicLockState, LockState, WriterState};
use std::fmt;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

#[cfg(target_arch = "wasm32")]
use wasm_safe_thread as thread;
#[cfg(not(target_arch = "wasm32"))]
use std::thread;


/// A reader-writer mutex with no payload.
///
/// Many threads may hold the read lock at once; one thread may hold the write
/// lock, and only while nobody reads. The lock is released explicitly with
/// the matching unlock call. For guard-based access to a value, see
/// [`ValueLock`](crate::ValueLock).
///
/// `D` picks the [`DeadlockDetector`]. Usually you want one of the aliases:
/// [`RwMutex`], [`RwMutexChecked`] or [`RwMutexUnchecked`].
///
/// No operation takes a timeout and none can be cancelled.
///
/// # Examples
///
/// ```
/// use gated_rwlock::{RwMutexChecked, WriterState};
///
/// let mutex = RwMutexChecked::new();
///
/// mutex.read_lock().unwrap();
/// mutex.read_lock().unwrap();
/// assert_eq!(mutex.reader_count(), 2);
/// mutex.read_unlock().unwrap();
/// mutex.read_unlock().unwrap();
///
/// mutex.write_lock().unwrap();
/// assert_eq!(mutex.writer_state(), WriterState::Owned);
/// mutex.write_unlock().unwrap();
/// assert!(mutex.state().is_unlocked());
/// ```
///
/// ## Sharing between threads
///
/// ```
/// # if cfg!(target_arch = "wasm32") { return; }
/// use gated_rwlock::RwMutex;
/// use std::sync::Arc;
/// use std::thread;
///
/// let mutex = Arc::new(RwMutex::new());
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let mutex = Arc::clone(&mutex);
///         thread::spawn(move || {
///             mutex.write_lock().unwrap();
///             mutex.write_unlock().unwrap();
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert!(mutex.state().is_unlocked());
/// ```
pub struct RwMutexImpl<D: DeadlockDetector> {
    state: AtomicLockState,
    gate: Gate,
    id: MutexId,
    detector: D,
}

/// A mutex that rejects same-thread re-entrancy.
pub type RwMutexChecked = RwMutexImpl<TrackingDetector>;
/// A mutex with no re-entrancy bookkeeping.
pub type RwMutexUnchecked = RwMutexImpl<NullDetector>;
/// The mutex selected by the build configuration; see the crate documentation.
pub type RwMutex = RwMutexImpl<DefaultDetector>;

impl<D: DeadlockDetector> RwMutexImpl<D> {
    /// Creates an unlocked mutex with a fresh identity.
    pub fn new() -> Self {
        let id = MutexId::next();
        RwMutexImpl {
            state: AtomicLockState::new(),
            gate: Gate::new(),
            id,
            detector: D::new(id),
        }
    }

    /// Takes a read lock, waiting while a writer is waiting or owns the lock.
    ///
    /// # Errors
    ///
    /// [`LockError::Reentrant`] if the detector reports that this thread holds
    /// the write lock.
    pub fn read_lock(&self) -> Result<(), LockError> {
        if !self.detector.can_read_lock() {
            return Err(self.refuse(Access::Read));
        }

        let mut current = self.state.load(Relaxed);
        loop {
            if current.writer != WriterState::None {
                log::trace!("{}: reader waiting on gate, state {current}", self.id);
                self.gate.wait();
                current = self.state.load(Relaxed);
                continue;
            }
            match self.state.compare_exchange_weak(
                current,
                current.with_reader_added(),
                Acquire,
                Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.detector.read_locked();
        Ok(())
    }

    /// Releases one read lock.
    ///
    /// # Errors
    ///
    /// [`LockError::NotLocked`] if no reader holds the lock. The reader count
    /// is not changed.
    pub fn read_unlock(&self) -> Result<(), LockError> {
        let mut current = self.state.load(Relaxed);
        loop {
            if current.readers == 0 {
                return Err(self.misuse(Access::Read));
            }
            match self.state.compare_exchange_weak(
                current,
                current.with_reader_removed(),
                Release,
                Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.detector.read_unlocked();
        Ok(())
    }

    /// Takes the write lock.
    ///
    /// Waits for the gate (other writers), announces the writer so no new
    /// reader gets in, then yields until the readers already inside are gone.
    ///
    /// # Errors
    ///
    /// [`LockError::Reentrant`] if the detector reports that this thread holds
    /// any lock on this mutex.
    pub fn write_lock(&self) -> Result<(), LockError> {
        if !self.detector.can_write_lock() {
            return Err(self.refuse(Access::Write));
        }

        self.gate.lock();

        let mut current = self.state.load(Relaxed);
        loop {
            match self.state.compare_exchange_weak(
                current,
                current.with_writer(WriterState::Waiting),
                Relaxed,
                Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.detector.write_locked();

        if current.readers > 0 {
            log::trace!("{}: writer draining {} reader(s)", self.id, current.readers);
        }
        let draining = LockState::new(0, WriterState::Waiting);
        let owned = LockState::new(0, WriterState::Owned);
        // TODO: park the writer and have the last reader unpark it instead of yielding.
        while self
            .state
            .compare_exchange_weak(draining, owned, Acquire, Relaxed)
            .is_err()
        {
            thread::yield_now();
        }
        Ok(())
    }

    /// Releases the write lock and lets waiting readers and writers in.
    ///
    /// # Errors
    ///
    /// [`LockError::NotLocked`] if the lock is not owned by a writer. Nothing
    /// is changed.
    pub fn write_unlock(&self) -> Result<(), LockError> {
        let owned = LockState::new(0, WriterState::Owned);
        if self
            .state
            .compare_exchange(owned, LockState::UNLOCKED, Release, Relaxed)
            .is_err()
        {
            return Err(self.misuse(Access::Write));
        }
        self.detector.write_unlocked();
        self.gate.unlock();
        Ok(())
    }

    /// A snapshot of the lock word. Stale as soon as it is returned.
    pub fn state(&self) -> LockState {
        self.state.load(Relaxed)
    }

    /// Number of readers currently holding the lock.
    pub fn reader_count(&self) -> u16 {
        self.state().readers
    }

    /// Whether a writer is absent, waiting for readers to drain, or owns the lock.
    pub fn writer_state(&self) -> WriterState {
        self.state().writer
    }

    /// Whether a writer currently holds the gate.
    pub fn is_gate_locked(&self) -> bool {
        self.gate.is_locked()
    }

    /// This mutex's identity.
    pub fn id(&self) -> MutexId {
        self.id
    }

    fn refuse(&self, requested: Access) -> LockError {
        let err = LockError::Reentrant { requested };
        log::debug!("{}: {err}", self.id);
        err
    }

    fn misuse(&self, access: Access) -> LockError {
        let err = LockError::NotLocked { access };
        log::debug!("{}: {err}", self.id);
        err
    }

    #[cfg(test)]
    pub(crate) fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: DeadlockDetector> Default for RwMutexImpl<D> {
    fn default() -> Self {
        RwMutexImpl::new()
    }
}

impl<D: DeadlockDetector> Drop for RwMutexImpl<D> {
    fn drop(&mut self) {
        #[cfg(tracking_detector)]
        if !std::thread::panicking() {
            let state = self.state.load(Relaxed);
            assert!(
                state.is_unlocked(),
                "{} dropped while locked: {state}",
                self.id
            );
        }
    }
}

impl<D: DeadlockDetector> fmt::Debug for RwMutexImpl<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwMutex")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
