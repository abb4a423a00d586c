//! Cursor backends
//!
//! A ring buffer owns two cursors (write and read). How they are stored and
//! which memory ordering their loads/stores use is picked at the type level:
//!
//! - [`SingleOwner`]: plain `Cell<usize>`, no ordering at all. A buffer in
//!   this mode is `!Sync` and can never be observed from two threads.
//! - [`Concurrent`]: `AtomicUsize` on its own cache line. The owner of a
//!   cursor reads it `Relaxed`, the other side reads it `Acquire`, and every
//!   advance is a `Release` store issued after the slot access it publishes.
//!
//! ```text
//! producer: write slot[w]   -> Release store w+1   ==> consumer: Acquire load w, read slot
//! consumer: read  slot[r]   -> Release store r+1   ==> producer: Acquire load r, reuse slot
//! ```

use std::cell::Cell;

use crate::sync::{AtomicUsize, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// Storage for one ring cursor.
pub trait Cursor: sealed::Sealed {
    fn new(index: usize) -> Self;

    /// Load performed by the single writer of this cursor.
    fn load_own(&self) -> usize;

    /// Load performed by the opposite side (or any shared observer).
    fn load_peer(&self) -> usize;

    /// Advance the cursor, publishing every write that precedes it.
    fn publish(&self, index: usize);
}

/// Selects the cursor backend of a [`RingBuffer`](super::RingBuffer).
pub trait Mode: sealed::Sealed + 'static {
    type Cursor: Cursor;

    /// Short label used in logs and benchmark output.
    const NAME: &'static str;
}

/// Exclusive-owner mode: ordinary cursors, one thread of control.
#[derive(Debug)]
pub enum SingleOwner {}

/// Cross-thread SPSC mode: acquire/release cursors.
#[derive(Debug)]
pub enum Concurrent {}

impl sealed::Sealed for SingleOwner {}
impl sealed::Sealed for Concurrent {}

impl Mode for SingleOwner {
    type Cursor = PlainCursor;
    const NAME: &'static str = "single-owner";
}

impl Mode for Concurrent {
    type Cursor = AtomicCursor;
    const NAME: &'static str = "concurrent";
}

#[derive(Debug)]
pub struct PlainCursor(Cell<usize>);

impl sealed::Sealed for PlainCursor {}

impl Cursor for PlainCursor {
    #[inline(always)]
    fn new(index: usize) -> Self {
        Self(Cell::new(index))
    }

    #[inline(always)]
    fn load_own(&self) -> usize {
        self.0.get()
    }

    #[inline(always)]
    fn load_peer(&self) -> usize {
        self.0.get()
    }

    #[inline(always)]
    fn publish(&self, index: usize) {
        self.0.set(index);
    }
}

/// Padding supaya cursor menempati cache line sendiri (64 bytes pada x86-64)
#[repr(C, align(64))]
#[derive(Debug)]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Producer and consumer cursors live on separate cache lines so that the
/// two sides do not false-share.
#[derive(Debug)]
pub struct AtomicCursor(CacheLinePadded<AtomicUsize>);

impl sealed::Sealed for AtomicCursor {}

impl Cursor for AtomicCursor {
    #[inline(always)]
    fn new(index: usize) -> Self {
        Self(CacheLinePadded::new(AtomicUsize::new(index)))
    }

    #[inline(always)]
    fn load_own(&self) -> usize {
        // Only this cursor's writer takes this path; it always sees its own stores.
        self.0.value.load(Ordering::Relaxed)
    }

    #[inline(always)]
    fn load_peer(&self) -> usize {
        self.0.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn publish(&self, index: usize) {
        self.0.value.store(index, Ordering::Release);
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_cursor_on_own_cache_line() {
        assert_eq!(std::mem::align_of::<AtomicCursor>(), 64);
        assert_eq!(std::mem::size_of::<AtomicCursor>(), 64);
    }

    #[test]
    fn test_cursor_publish_then_load() {
        let plain = PlainCursor::new(0);
        plain.publish(5);
        assert_eq!(plain.load_own(), 5);
        assert_eq!(plain.load_peer(), 5);

        let atomic = AtomicCursor::new(3);
        assert_eq!(atomic.load_peer(), 3);
        atomic.publish(4);
        assert_eq!(atomic.load_own(), 4);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(SingleOwner::NAME, "single-owner");
        assert_eq!(Concurrent::NAME, "concurrent");
    }
}
