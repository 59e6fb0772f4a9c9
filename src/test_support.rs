// SPDX-License-Identifier: MIT OR Apache-2.0
//! Helpers shared by the unit tests.
#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::time::{Duration, Instant};

static NOOP_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    |_| RawWaker::new(std::ptr::null(), &NOOP_WAKER_VTABLE),
    |_| (),
    |_| (),
    |_| (),
);

/// Polls `future` to completion on the current thread, yielding between polls.
///
/// Only used to wait on `r#continue` hand-offs from spawned threads.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    let mut f = pin!(future);
    let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &NOOP_WAKER_VTABLE)) };
    let mut cx = Context::from_waker(&waker);
    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Pending => std::thread::yield_now(),
            Poll::Ready(r) => return r,
        }
    }
}

/// Polls `condition` until it holds, failing the test after `timeout`.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached within {timeout:?}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
