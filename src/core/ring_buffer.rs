//! Fixed-capacity ring buffer with pluggable cursor backends
//!
//! Capacity is always `2^k` slots and never changes. One slot is kept free so
//! that two cursors are enough to tell "full" from "empty":
//!
//! ```text
//! empty  <=>  write == read
//! full   <=>  read  == (write + 1) & mask
//! ```
//!
//! Usable capacity is therefore `2^k - 1`. Cursors stay inside `[0, mask]`
//! and are advanced with a bitmask, never with a modulo.
//!
//! The operations here take `&mut self` and are valid in both modes. For
//! cross-thread use, [`RingBuffer::split`] a [`Concurrent`] buffer into a
//! [`Producer`] / [`Consumer`] pair.

use std::fmt;
use std::mem;

use tracing::debug;

use super::cursor::{Concurrent, Cursor, Mode, SingleOwner};
use super::error::{Error, Result};
use super::handle::{Consumer, Producer};
use super::storage::{Backing, Storage};
use crate::sync::Arc;

/// Ring buffer that only one thread of control ever touches.
///
/// It is `Send` but never `Sync`:
///
/// ```compile_fail
/// fn shared<T: Sync>() {}
/// shared::<ringq::LocalRing<u32>>();
/// ```
pub type LocalRing<T> = RingBuffer<T, SingleOwner>;

/// Ring buffer with acquire/release cursors, ready to be [split](RingBuffer::split).
pub type SpscRing<T> = RingBuffer<T, Concurrent>;

/// Fixed-capacity FIFO of `2^k` slots.
///
/// `M` selects the cursor backend. It defaults to [`Concurrent`], which is
/// the only backend that may cross a thread boundary while shared.
pub struct RingBuffer<T, M: Mode = Concurrent> {
    // Advanced only by the producer
    write: M::Cursor,
    // Advanced only by the consumer
    read: M::Cursor,
    storage: Storage<T>,
    // capacity - 1
    mask: usize,
}

/// Validate `exponent` and return the slot count it selects.
fn capacity_for<T>(exponent: u32) -> Result<usize> {
    if exponent == 0 || exponent >= usize::BITS {
        return Err(Error::InvalidExponent { exponent });
    }
    let capacity = 1usize << exponent;
    match capacity.checked_mul(mem::size_of::<T>()) {
        Some(bytes) if bytes <= isize::MAX as usize => Ok(capacity),
        _ => Err(Error::InvalidExponent { exponent }),
    }
}

impl<T: Copy, M: Mode> RingBuffer<T, M> {
    /// Membuat ring buffer baru dengan `2^exponent` slot di heap.
    ///
    /// Alokasi hanya terjadi sekali; tidak ada alokasi di hot path.
    ///
    /// # Errors
    /// [`Error::InvalidExponent`] for `exponent == 0` or a size that does not
    /// fit the address space, [`Error::Allocation`] when the slots cannot be
    /// reserved.
    pub fn new(exponent: u32) -> Result<Self> {
        Self::with_backing(exponent, Backing::Heap)
    }

    /// Same as [`new`](Self::new) with an explicit backing store.
    pub fn with_backing(exponent: u32, backing: Backing) -> Result<Self> {
        let capacity = capacity_for::<T>(exponent)?;
        let storage = Storage::allocate(capacity, backing)?;

        debug!(capacity, mode = M::NAME, ?backing, "ring buffer allocated");

        Ok(Self {
            write: <M::Cursor as Cursor>::new(0),
            read: <M::Cursor as Cursor>::new(0),
            storage,
            mask: capacity - 1,
        })
    }

    /// Allocated slot count, `2^k`.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Maximum number of elements stored at once, `2^k - 1`.
    #[inline(always)]
    pub fn usable_capacity(&self) -> usize {
        self.mask
    }

    /// Number of stored elements.
    ///
    /// In a split buffer this is a snapshot; it may be stale by the time the
    /// caller looks at it.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let write = self.write.load_peer();
        let read = self.read.load_peer();
        write.wrapping_sub(read) & self.mask
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.write.load_peer() == self.read.load_peer()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.read.load_peer() == self.advance(self.write.load_peer())
    }

    /// Push `value` (producer side).
    ///
    /// Returns `false` and leaves the buffer untouched when it is full.
    #[inline(always)]
    #[must_use]
    pub fn add(&mut self, value: T) -> bool {
        // SAFETY: &mut self rules out any other producer or consumer.
        unsafe { self.try_push(value) }
    }

    /// Pop the oldest element (consumer side).
    ///
    /// Returns `None` and leaves the buffer untouched when it is empty.
    #[inline(always)]
    pub fn get(&mut self) -> Option<T> {
        // SAFETY: &mut self rules out any other producer or consumer.
        unsafe { self.try_pop() }
    }

    /// Push `value`, discarding the oldest element first if the buffer is full.
    ///
    /// Newest values always win; the dropped element is unrecoverable. This
    /// moves the read cursor from the producer side, which is why it needs
    /// exclusive access and has no counterpart on [`Producer`].
    #[inline(always)]
    pub fn force_add(&mut self, value: T) {
        if self.is_full() {
            let read = self.read.load_own();
            self.read.publish(self.advance(read));
        }
        // SAFETY: the buffer is not full any more and access is exclusive.
        unsafe { self.push_unchecked(value) }
    }

    /// Push without checking for space.
    ///
    /// # Safety
    /// The buffer must not be full. Violating this overwrites the oldest
    /// element and makes the buffer look empty. Debug builds panic instead.
    #[inline(always)]
    pub unsafe fn add_unchecked(&mut self, value: T) {
        self.push_unchecked(value)
    }

    /// Pop without checking for data.
    ///
    /// # Safety
    /// The buffer must not be empty. Violating this reads a slot that may
    /// never have been written. Debug builds panic instead.
    #[inline(always)]
    pub unsafe fn get_unchecked(&mut self) -> T {
        self.pop_unchecked()
    }

    /// Discard every stored element and rewind both cursors.
    pub fn clear(&mut self) {
        self.write.publish(0);
        self.read.publish(0);
    }

    /// Iterator that pops until the buffer is empty.
    pub fn drain(&mut self) -> Drain<'_, T, M> {
        Drain { ring: self }
    }

    #[inline(always)]
    fn advance(&self, index: usize) -> usize {
        (index + 1) & self.mask
    }

    /// Full check as seen by the producer.
    #[inline(always)]
    pub(crate) fn producer_sees_full(&self) -> bool {
        self.read.load_peer() == self.advance(self.write.load_own())
    }

    /// Empty check as seen by the consumer.
    #[inline(always)]
    pub(crate) fn consumer_sees_empty(&self) -> bool {
        self.write.load_peer() == self.read.load_own()
    }

    /// # Safety
    /// Caller is the only producer and the buffer is not full.
    #[inline(always)]
    pub(crate) unsafe fn push_unchecked(&self, value: T) {
        debug_assert!(
            !self.producer_sees_full(),
            "add_unchecked on a full ring buffer"
        );

        let write = self.write.load_own();
        (*self.storage.slot(write)).write(value);
        // Release: slot write di atas harus visible sebelum cursor berpindah
        self.write.publish(self.advance(write));
    }

    /// # Safety
    /// Caller is the only consumer and the buffer is not empty.
    #[inline(always)]
    pub(crate) unsafe fn pop_unchecked(&self) -> T {
        debug_assert!(
            !self.consumer_sees_empty(),
            "get_unchecked on an empty ring buffer"
        );

        let read = self.read.load_own();
        let value = (*self.storage.slot(read)).assume_init_read();
        // Release: slot selesai dibaca sebelum producer boleh menimpanya
        self.read.publish(self.advance(read));
        value
    }

    /// # Safety
    /// Caller is the only producer.
    #[inline(always)]
    pub(crate) unsafe fn try_push(&self, value: T) -> bool {
        if self.producer_sees_full() {
            return false;
        }
        self.push_unchecked(value);
        true
    }

    /// # Safety
    /// Caller is the only consumer.
    #[inline(always)]
    pub(crate) unsafe fn try_pop(&self) -> Option<T> {
        if self.consumer_sees_empty() {
            return None;
        }
        Some(self.pop_unchecked())
    }
}

impl<T: Copy + Send> RingBuffer<T, Concurrent> {
    /// Split into a producer and a consumer that may live on different threads.
    ///
    /// Neither half can be cloned, so each cursor keeps exactly one writer.
    /// The slots are released when both halves are gone.
    ///
    /// ```compile_fail
    /// let ring = ringq::SpscRing::<u32>::new(3).unwrap();
    /// let (mut producer, _consumer) = ring.split();
    /// producer.force_add(1);
    /// ```
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let ring = Arc::new(self);
        (Producer::new(Arc::clone(&ring)), Consumer::new(ring))
    }
}

impl<T, M: Mode> fmt::Debug for RingBuffer<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("mode", &M::NAME)
            .field("capacity", &(self.mask + 1))
            .field("write", &self.write.load_peer())
            .field("read", &self.read.load_peer())
            .field("mapped", &self.storage.is_mapped())
            .finish()
    }
}

/// Draining iterator returned by [`RingBuffer::drain`].
pub struct Drain<'a, T, M: Mode> {
    ring: &'a mut RingBuffer<T, M>,
}

impl<T: Copy, M: Mode> Iterator for Drain<'_, T, M> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.ring.get()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.ring.len();
        (len, Some(len))
    }
}

impl<T: Copy, M: Mode> ExactSizeIterator for Drain<'_, T, M> {}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::thread;

    /// Producer pushes K items, consumer pops until K received, under every
    /// interleaving loom can find.
    #[test]
    fn loom_spsc_fifo() {
        const K: u32 = 3;

        loom::model(|| {
            let (mut producer, mut consumer) = SpscRing::<u32>::new(2).unwrap().split();

            let p = thread::spawn(move || {
                for i in 0..K {
                    while !producer.add(i) {
                        thread::yield_now();
                    }
                }
            });

            let mut received = Vec::new();
            while received.len() < K as usize {
                match consumer.get() {
                    Some(v) => received.push(v),
                    None => thread::yield_now(),
                }
            }

            p.join().unwrap();
            assert_eq!(received, vec![0, 1, 2]);
        });
    }

    /// Usable capacity 1: every element needs a full round trip.
    #[test]
    fn loom_spsc_full_retry() {
        loom::model(|| {
            let (mut producer, mut consumer) = SpscRing::<u32>::new(1).unwrap().split();

            let p = thread::spawn(move || {
                for i in 0..3u32 {
                    while !producer.add(i) {
                        thread::yield_now();
                    }
                }
            });

            let c = thread::spawn(move || {
                let mut received = Vec::new();
                while received.len() < 3 {
                    match consumer.get() {
                        Some(v) => received.push(v),
                        None => thread::yield_now(),
                    }
                }
                received
            });

            p.join().unwrap();
            assert_eq!(c.join().unwrap(), vec![0, 1, 2]);
        });
    }
}
