// SPDX-License-Identifier: MIT OR Apache-2.0
use super::ValueLock;
use crate::detector::{NullDetector, TrackingDetector};
use crate::error::{Access, LockError};
use crate::state::{LockState, WriterState};

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_default_and_from() {
    let lock: ValueLock<Vec<u8>> = ValueLock::default();
    assert!(lock.read().is_empty());

    let lock: ValueLock<&str, NullDetector> = ValueLock::from("in place");
    assert_eq!(*lock.read(), "in place");
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_guards_track_state() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(1);
    let a = lock.read();
    let b = lock.read();
    assert_eq!(lock.state(), LockState::new(2, WriterState::None));
    assert_eq!(*a + *b, 2);
    drop(a);
    drop(b);
    assert!(lock.state().is_unlocked());

    let mut w = lock.write();
    *w = 7;
    assert_eq!(lock.state(), LockState::new(0, WriterState::Owned));
    drop(w);
    assert_eq!(*lock.read(), 7);
    assert!(lock.state().is_unlocked());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_moved_guard_keeps_hold() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(String::new());
    let guard = lock.write();
    let mut moved = guard;
    moved.push('x');
    assert_eq!(lock.state().writer, WriterState::Owned);
    drop(moved);
    assert!(lock.state().is_unlocked());
    assert_eq!(*lock.read(), "x");
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_guard_outlives_handle() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(vec![1, 2, 3]);
    let guard = lock.read();
    drop(lock);
    assert_eq!(guard.len(), 3);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_checked_refusals() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(0u32);
    let reader = lock.read();
    assert_eq!(
        lock.checked_write().err(),
        Some(LockError::Reentrant {
            requested: Access::Write
        })
    );
    drop(reader);

    let writer = lock.write();
    assert_eq!(
        lock.checked_read().err(),
        Some(LockError::Reentrant {
            requested: Access::Read
        })
    );
    assert!(lock.checked_write().is_err());
    drop(writer);
    assert!(lock.checked_write().is_ok());
}

#[test]
#[should_panic(expected = "not allowed to mix read and write locks")]
fn test_read_under_write_panics() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(0u32);
    let _writer = lock.write();
    let _reader = lock.read();
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_with_closures() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(vec![1, 2]);
    let len = lock.with_write(|v| {
        v.push(3);
        v.len()
    });
    assert_eq!(len, 3);
    assert_eq!(lock.with_read(|v| v.iter().sum::<i32>()), 6);
    assert!(lock.state().is_unlocked());
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
#[test]
fn test_formatting() {
    let lock = ValueLock::<_, TrackingDetector>::with_detector(42);
    assert_eq!(lock.read().to_string(), "42");
    assert_eq!(format!("{:?}", lock.write()), "WriteGuard { data: 42, .. }");
    assert!(format!("{lock:?}").starts_with("ValueLock"));
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn test_read_after_write() {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    let lock = Arc::new(ValueLock::<_, TrackingDetector>::with_detector(0));
    let writer = lock.write();

    let (c, r) = r#continue::continuation();
    let reader = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            c.send(());
            *lock.read()
        })
    };
    crate::test_support::block_on(r);
    thread::sleep(Duration::from_millis(20));
    assert!(!reader.is_finished());

    let mut writer = writer;
    *writer = 99;
    drop(writer);
    assert_eq!(reader.join().unwrap(), 99);
}
