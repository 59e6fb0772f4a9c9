// SPDX-License-Identifier: MIT OR Apache-2.0
//! The packed lock word shared by every reader and writer of an [`RwMutex`](crate::RwMutex).
//!
//! The word holds two fields:
//!
//! - the number of active readers (low 16 bits)
//! - the [`WriterState`] (the bits above)
//!
//! It is only ever changed by a single compare-and-swap from an observed value
//! to a new value, so readers and writers always agree on one linear history.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

const READERS_MASK: u32 = 0xFFFF;
const WRITER_SHIFT: u32 = 16;

/// What, if anything, a writer is doing with the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriterState {
    /// No writer is interested. New readers are admitted.
    #[default]
    None,
    /// A writer holds the gate and waits for the readers it saw to drain.
    /// New readers are not admitted.
    Waiting,
    /// A writer has exclusive access. The reader count is zero.
    Owned,
}

impl WriterState {
    const fn to_bits(self) -> u32 {
        match self {
            WriterState::None => 0,
            WriterState::Waiting => 1,
            WriterState::Owned => 2,
        }
    }

    const fn from_bits(bits: u32) -> WriterState {
        match bits {
            0 => WriterState::None,
            1 => WriterState::Waiting,
            _ => WriterState::Owned,
        }
    }
}

/// A snapshot of the lock word.
///
/// # Examples
///
/// ```
/// use gated_rwlock::{LockState, WriterState};
///
/// let state = LockState::UNLOCKED;
/// assert_eq!(state.readers, 0);
/// assert_eq!(state.writer, WriterState::None);
/// assert!(state.is_unlocked());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LockState {
    /// Number of readers currently holding the lock.
    pub readers: u16,
    /// The writer's progress.
    pub writer: WriterState,
}

impl LockState {
    /// No readers, no writer.
    pub const UNLOCKED: LockState = LockState::new(0, WriterState::None);

    /// Creates a snapshot from its parts.
    pub const fn new(readers: u16, writer: WriterState) -> LockState {
        LockState { readers, writer }
    }

    /// Returns true when nobody holds or wants the lock.
    pub const fn is_unlocked(&self) -> bool {
        self.readers == 0 && matches!(self.writer, WriterState::None)
    }

    /// The same state with one more reader.
    ///
    /// # Panics
    ///
    /// Panics if the reader count would overflow.
    pub(crate) fn with_reader_added(self) -> LockState {
        match self.readers.checked_add(1) {
            Some(readers) => LockState { readers, ..self },
            None => panic!("Too many readers"),
        }
    }

    /// The same state with one less reader. The caller checks `readers > 0`.
    pub(crate) fn with_reader_removed(self) -> LockState {
        LockState {
            readers: self.readers - 1,
            ..self
        }
    }

    pub(crate) const fn with_writer(self, writer: WriterState) -> LockState {
        LockState { writer, ..self }
    }

    const fn pack(self) -> u32 {
        (self.writer.to_bits() << WRITER_SHIFT) | self.readers as u32
    }

    const fn unpack(word: u32) -> LockState {
        LockState {
            readers: (word & READERS_MASK) as u16,
            writer: WriterState::from_bits(word >> WRITER_SHIFT),
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{readers: {}, writer: {:?}}}", self.readers, self.writer)
    }
}

/// The lock word itself, a single lock-free `AtomicU32`.
pub(crate) struct AtomicLockState(AtomicU32);

impl AtomicLockState {
    pub(crate) const fn new() -> AtomicLockState {
        AtomicLockState(AtomicU32::new(LockState::UNLOCKED.pack()))
    }

    pub(crate) fn load(&self, order: Ordering) -> LockState {
        LockState::unpack(self.0.load(order))
    }

    /// May fail spuriously; only use inside a retry loop.
    pub(crate) fn compare_exchange_weak(
        &self,
        current: LockState,
        new: LockState,
        success: Ordering,
        failure: Ordering,
    ) -> Result<LockState, LockState> {
        self.0
            .compare_exchange_weak(current.pack(), new.pack(), success, failure)
            .map(LockState::unpack)
            .map_err(LockState::unpack)
    }

    pub(crate) fn compare_exchange(
        &self,
        current: LockState,
        new: LockState,
        success: Ordering,
        failure: Ordering,
    ) -> Result<LockState, LockState> {
        self.0
            .compare_exchange(current.pack(), new.pack(), success, failure)
            .map(LockState::unpack)
            .map_err(LockState::unpack)
    }
}

impl Default for AtomicLockState {
    fn default() -> Self {
        AtomicLockState::new()
    }
}

impl fmt::Debug for AtomicLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(Ordering::Relaxed), f)
    }
}
