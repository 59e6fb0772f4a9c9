// SPDX-License-Identifier: MIT OR Apache-2.0
//! The blocking gate: a plain, non-reentrant mutual-exclusion primitive with
//! raw `lock`/`unlock` calls.
//!
//! Writers hold the gate for their whole hold, which serialises them. Readers
//! that see writer interest call [`Gate::wait`] only to get off the CPU until
//! the writer is gone; whether a reader may proceed is decided by the lock
//! word, never by the gate.
//!
//! Waiting strategy, chosen per call:
//! - **Native**: park the thread on the gate's waiting list
//! - **WASM with `Atomics.wait`**: same as native
//! - **WASM without `Atomics.wait`**: spin (e.g. the browser main thread)

use crate::spinlock::Spinlock;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

#[cfg(target_arch = "wasm32")]
use wasm_safe_thread as thread;
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

pub(crate) struct Gate {
    locked: AtomicBool,
    parked: Spinlock<Vec<thread::Thread>>,
}

impl Gate {
    pub(crate) const fn new() -> Gate {
        Gate {
            locked: AtomicBool::new(false),
            parked: Spinlock::new(Vec::new()),
        }
    }

    pub(crate) fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_ok()
    }

    /// Blocks until the gate is acquired, parking or spinning as the platform allows.
    pub(crate) fn lock(&self) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.lock_block()
        }
        #[cfg(target_arch = "wasm32")]
        {
            if crate::wasm_support::atomics_wait_supported() {
                self.lock_block()
            } else {
                self.lock_spin()
            }
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    fn lock_spin(&self) {
        while !self.try_lock() {
            std::hint::spin_loop();
        }
    }

    fn lock_block(&self) {
        loop {
            // Registering under the list lock means an unlock that lands after
            // our failed attempt always finds us in the list.
            let acquired = self.parked.with_mut(|threads| {
                if self.try_lock() {
                    true
                } else {
                    threads.push(thread::current());
                    false
                }
            });
            if acquired {
                return;
            }
            log::trace!("gate: parking {:?}", thread::current().id());
            thread::park();
        }
    }

    /// Releases the gate and wakes every parked thread so they can race for it.
    ///
    /// # Panics
    ///
    /// Panics if the gate is not locked.
    pub(crate) fn unlock(&self) {
        let was_locked = self.locked.swap(false, Release);
        assert!(was_locked, "unlock of a gate that is not locked");
        let threads = self.parked.with_mut(std::mem::take);
        if !threads.is_empty() {
            log::trace!("gate: waking {} parked thread(s)", threads.len());
        }
        for thread in threads {
            thread.unpark();
        }
    }

    /// Waits until the gate is free at least once, without keeping it.
    pub(crate) fn wait(&self) {
        self.lock();
        self.unlock();
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Relaxed)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Gate::new()
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
