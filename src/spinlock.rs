// SPDX-License-Identifier: MIT OR Apache-2.0
//! A tiny spinlock guarding the gate's list of parked threads.
//!
//! The critical sections it protects are a push or a `mem::take` on a `Vec`,
//! so spinning is cheaper than any parking scheme, and it cannot itself need
//! the gate it is part of.

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};

#[derive(Debug, Default)]
pub(crate) struct Spinlock<T> {
    data: UnsafeCell<T>,
    locked: AtomicBool,
}

impl<T> Spinlock<T> {
    pub(crate) const fn new(data: T) -> Self {
        Spinlock {
            data: UnsafeCell::new(data),
            locked: AtomicBool::new(false),
        }
    }

    /// Runs `f` with exclusive access to the data.
    ///
    /// `f` must not panic or re-enter this spinlock.
    pub(crate) fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        while self.locked.swap(true, Acquire) {
            std::hint::spin_loop();
        }

        // SAFETY: the swap above gave us exclusive access until the store below
        let result = unsafe { f(&mut *self.data.get()) };

        self.locked.store(false, Release);
        result
    }
}

unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

#[cfg(test)]
mod tests {
    use super::Spinlock;

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn test_spinlock_basic() {
        let spinlock = Spinlock::new(vec![1]);
        let len = spinlock.with_mut(|data| {
            data.push(2);
            data.len()
        });
        assert_eq!(len, 2);
        assert_eq!(spinlock.with_mut(std::mem::take), vec![1, 2]);
        assert!(spinlock.with_mut(|data| data.is_empty()));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_spinlock_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let spinlock = Arc::new(Spinlock::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let spinlock = Arc::clone(&spinlock);
                thread::spawn(move || {
                    for _ in 0..500 {
                        spinlock.with_mut(|n| *n += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(spinlock.with_mut(|n| *n), 4000);
    }
}
