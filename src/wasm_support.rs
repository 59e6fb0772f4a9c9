// SPDX-License-Identifier: MIT OR Apache-2.0
//! Probes whether the current wasm thread may block in `Atomics.wait`.
//!
//! Browser main threads may not; workers usually can. The answer is fixed for
//! the life of a thread, so it is probed once per thread.

use std::cell::Cell;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
export function _grw_canAtomicsWait() {
    if (typeof SharedArrayBuffer === 'undefined') return false;
    if (typeof Atomics === 'undefined' || typeof Atomics.wait !== 'function') return false;

    try {
        const sab = new SharedArrayBuffer(4);
        const ia = new Int32Array(sab);
        const result = Atomics.wait(ia, 0, 0, 0);
        return result === 'timed-out' || result === 'not-equal';
    } catch (_) {
        return false;
    }
}
")]
extern "C" {
    fn _grw_canAtomicsWait() -> bool;
}

thread_local! {
    static ATOMICS_WAIT: Cell<Option<bool>> = const { Cell::new(None) };
}

pub(crate) fn atomics_wait_supported() -> bool {
    ATOMICS_WAIT.with(|cached| match cached.get() {
        Some(supported) => supported,
        None => {
            let supported = _grw_canAtomicsWait();
            log::debug!("Atomics.wait supported on this thread: {supported}");
            cached.set(Some(supported));
            supported
        }
    })
}
