// SPDX-License-Identifier: MIT OR Apache-2.0
//! Same-thread deadlock detection for [`RwMutexImpl`](crate::RwMutexImpl).
//!
//! The lock word alone cannot tell a reader on this thread from a reader on
//! another one, so a thread that holds a read lock and then asks for the write
//! lock would wait forever for its own read to drain. A [`DeadlockDetector`]
//! keeps enough per-thread bookkeeping to refuse such a request before the
//! mutex blocks.
//!
//! Two detectors are provided:
//!
//! - [`NullDetector`] records nothing and allows everything
//! - [`TrackingDetector`] counts, per OS thread, the locks held on each mutex
//!
//! The detector is a type parameter of the mutex, so the choice is made at
//! compile time. [`DefaultDetector`] follows the build configuration; see the
//! crate documentation.
//!
//! Cycles between threads (A waits for B while B waits for A) are not
//! detected by either detector.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static MUTEX_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The identity of one mutex, unique for the life of the process.
///
/// Ids are never reused, so bookkeeping left behind for a dropped mutex can
/// never be mistaken for a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutexId(u64);

impl MutexId {
    pub(crate) fn next() -> MutexId {
        MutexId(MUTEX_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MutexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mutex#{}", self.0)
    }
}

/// Bookkeeping consulted by a mutex before it acquires, and updated after it
/// acquires or releases.
///
/// An implementation is created once per mutex with that mutex's id. Checks
/// and records always concern the calling thread.
pub trait DeadlockDetector: Send + Sync {
    /// Creates the detector for the mutex identified by `id`.
    fn new(id: MutexId) -> Self
    where
        Self: Sized;

    /// Whether the calling thread may take a read lock without waiting on itself.
    fn can_read_lock(&self) -> bool;

    /// Whether the calling thread may take the write lock without waiting on itself.
    fn can_write_lock(&self) -> bool;

    /// Records that the calling thread took a read lock.
    fn read_locked(&self);
    /// Records that the calling thread released a read lock.
    fn read_unlocked(&self);
    /// Records that the calling thread took the write lock.
    fn write_locked(&self);
    /// Records that the calling thread released the write lock.
    fn write_unlocked(&self);
}

/// A detector that allows everything and remembers nothing.
///
/// With this detector a same-thread read-then-write deadlocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl DeadlockDetector for NullDetector {
    fn new(_id: MutexId) -> Self {
        NullDetector
    }
    fn can_read_lock(&self) -> bool {
        true
    }
    fn can_write_lock(&self) -> bool {
        true
    }
    fn read_locked(&self) {}
    fn read_unlocked(&self) {}
    fn write_locked(&self) {}
    fn write_unlocked(&self) {}
}

/// Locks the current thread holds on one mutex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Held {
    pub(crate) reads: u16,
    pub(crate) write: bool,
}

impl Held {
    fn is_idle(&self) -> bool {
        self.reads == 0 && !self.write
    }
}

thread_local! {
    static HELD: RefCell<HashMap<MutexId, Held>> = RefCell::new(HashMap::new());
}

/// A detector that tracks, for the calling thread only, how many read locks
/// and whether the write lock it holds on its mutex.
///
/// The per-thread table is a `thread_local!`, so no thread ever touches
/// another thread's entries and nothing needs to be synchronised. Entries are
/// created on the first lock and removed once the thread holds nothing.
///
/// # Examples
///
/// ```
/// use gated_rwlock::{LockError, RwMutexChecked};
///
/// let mutex = RwMutexChecked::new();
/// mutex.write_lock().unwrap();
/// assert!(matches!(mutex.read_lock(), Err(LockError::Reentrant { .. })));
/// mutex.write_unlock().unwrap();
/// ```
#[derive(Debug)]
pub struct TrackingDetector {
    id: MutexId,
}

impl TrackingDetector {
    fn held(&self) -> Held {
        // During thread teardown the table may already be gone; nothing is held then.
        HELD.try_with(|held| held.borrow().get(&self.id).copied())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut Held)) {
        let _ = HELD.try_with(|held| {
            let mut held = held.borrow_mut();
            let entry = held.entry(self.id).or_default();
            f(entry);
            if entry.is_idle() {
                held.remove(&self.id);
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn held_by_current_thread(&self) -> Held {
        self.held()
    }
}

impl DeadlockDetector for TrackingDetector {
    fn new(id: MutexId) -> Self {
        TrackingDetector { id }
    }

    fn can_read_lock(&self) -> bool {
        !self.held().write
    }

    fn can_write_lock(&self) -> bool {
        self.held().is_idle()
    }

    fn read_locked(&self) {
        self.update(|held| held.reads = held.reads.saturating_add(1));
    }

    fn read_unlocked(&self) {
        // A read taken on another thread and released here has no entry to
        // decrement.
        self.update(|held| held.reads = held.reads.saturating_sub(1));
    }

    fn write_locked(&self) {
        self.update(|held| held.write = true);
    }

    fn write_unlocked(&self) {
        self.update(|held| held.write = false);
    }
}

impl Drop for TrackingDetector {
    fn drop(&mut self) {
        let _ = HELD.try_with(|held| held.borrow_mut().remove(&self.id));
    }
}

/// The detector used by [`RwMutex`](crate::RwMutex) in this build.
#[cfg(tracking_detector)]
pub type DefaultDetector = TrackingDetector;
/// The detector used by [`RwMutex`](crate::RwMutex) in this build.
#[cfg(not(tracking_detector))]
pub type DefaultDetector = NullDetector;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_ids_are_unique() {
        let a = MutexId::next();
        let b = MutexId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_null_allows_everything() {
        let detector = NullDetector::new(MutexId::next());
        detector.write_locked();
        assert!(detector.can_read_lock());
        assert!(detector.can_write_lock());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_tracking_rules() {
        let detector = TrackingDetector::new(MutexId::next());
        assert!(detector.can_read_lock());
        assert!(detector.can_write_lock());

        detector.read_locked();
        detector.read_locked();
        assert!(detector.can_read_lock());
        assert!(!detector.can_write_lock());
        assert_eq!(
            detector.held_by_current_thread(),
            Held {
                reads: 2,
                write: false
            }
        );

        detector.read_unlocked();
        detector.read_unlocked();
        assert!(detector.can_write_lock());

        detector.write_locked();
        assert!(!detector.can_read_lock());
        assert!(!detector.can_write_lock());
        detector.write_unlocked();
        assert!(detector.can_read_lock());
        assert!(detector.can_write_lock());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_tracking_is_per_mutex() {
        let a = TrackingDetector::new(MutexId::next());
        let b = TrackingDetector::new(MutexId::next());
        a.write_locked();
        assert!(b.can_write_lock());
        assert!(b.can_read_lock());
        a.write_unlocked();
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_idle_entries_are_removed() {
        let detector = TrackingDetector::new(MutexId::next());
        detector.read_locked();
        assert!(HELD.with(|held| held.borrow().contains_key(&detector.id)));
        detector.read_unlocked();
        assert!(!HELD.with(|held| held.borrow().contains_key(&detector.id)));

        // Unmatched unlocks never underflow.
        detector.read_unlocked();
        assert_eq!(detector.held_by_current_thread(), Held::default());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_drop_erases_entry() {
        let detector = TrackingDetector::new(MutexId::next());
        let id = detector.id;
        detector.write_locked();
        drop(detector);
        assert!(!HELD.with(|held| held.borrow().contains_key(&id)));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_tracking_is_per_thread() {
        use std::sync::Arc;

        let detector = Arc::new(TrackingDetector::new(MutexId::next()));
        detector.write_locked();
        let other = Arc::clone(&detector);
        let (can_read, can_write) =
            std::thread::spawn(move || (other.can_read_lock(), other.can_write_lock()))
                .join()
                .unwrap();
        assert!(can_read);
        assert!(can_write);
        assert!(!detector.can_read_lock());
        detector.write_unlocked();
    }

    #[cfg(tracking_detector)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_default_detector_tracks() {
        use crate::{Access, LockError, RwMutex};

        let mutex = RwMutex::new();
        mutex.read_lock().unwrap();
        assert_eq!(
            mutex.write_lock(),
            Err(LockError::Reentrant {
                requested: Access::Write
            })
        );
        mutex.read_unlock().unwrap();
    }

    #[cfg(not(tracking_detector))]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_default_detector_is_null() {
        use std::any::TypeId;

        assert_eq!(TypeId::of::<DefaultDetector>(), TypeId::of::<NullDetector>());
    }
}
