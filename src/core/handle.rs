//! Producer / consumer halves of a split [`SpscRing`](super::SpscRing)
//!
//! Each half owns one cursor. The producer advances `write` and only reads
//! `read`; the consumer does the opposite. Neither half is `Clone`, so a
//! cursor can never gain a second writer.

use std::fmt;

use super::cursor::Concurrent;
use super::ring_buffer::RingBuffer;
use crate::sync::Arc;

/// Write half of a split ring buffer.
pub struct Producer<T> {
    ring: Arc<RingBuffer<T, Concurrent>>,
}

/// Read half of a split ring buffer.
pub struct Consumer<T> {
    ring: Arc<RingBuffer<T, Concurrent>>,
}

impl<T: Copy> Producer<T> {
    pub(crate) fn new(ring: Arc<RingBuffer<T, Concurrent>>) -> Self {
        Self { ring }
    }

    /// Push data ke buffer.
    ///
    /// Returns `false` jika buffer penuh; nothing is written in that case.
    /// Never blocks: retry policy is up to the caller.
    #[inline(always)]
    #[must_use]
    pub fn add(&mut self, value: T) -> bool {
        // SAFETY: this half is the only producer of the ring.
        unsafe { self.ring.try_push(value) }
    }

    /// Push without checking for space.
    ///
    /// # Safety
    /// [`is_full`](Self::is_full) must have returned `false` since the last
    /// push. The consumer can only make room, so that answer stays valid.
    #[inline(always)]
    pub unsafe fn add_unchecked(&mut self, value: T) {
        self.ring.push_unchecked(value)
    }

    /// Full as seen from the producer; a concurrent `get` may free a slot
    /// right after this returns `true`.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.ring.producer_sees_full()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T: Copy> Consumer<T> {
    pub(crate) fn new(ring: Arc<RingBuffer<T, Concurrent>>) -> Self {
        Self { ring }
    }

    /// Pop data dari buffer.
    ///
    /// Returns `None` jika buffer kosong. Never blocks.
    #[inline(always)]
    pub fn get(&mut self) -> Option<T> {
        // SAFETY: this half is the only consumer of the ring.
        unsafe { self.ring.try_pop() }
    }

    /// Pop without checking for data.
    ///
    /// # Safety
    /// [`is_empty`](Self::is_empty) must have returned `false` since the last
    /// pop. The producer can only add data, so that answer stays valid.
    #[inline(always)]
    pub unsafe fn get_unchecked(&mut self) -> T {
        self.ring.pop_unchecked()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ring.consumer_sees_empty()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("ring", &self.ring).finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("ring", &self.ring).finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::super::SpscRing;
    use std::thread;

    #[test]
    fn test_split_halves_share_state() {
        let (mut producer, mut consumer) = SpscRing::<u32>::new(2).unwrap().split();

        assert!(consumer.is_empty());
        assert!(producer.add(1));
        assert!(producer.add(2));
        assert!(producer.add(3));
        assert!(producer.is_full());
        assert!(consumer.is_full());
        assert!(!producer.add(4));

        assert_eq!(consumer.len(), 3);
        assert_eq!(consumer.get(), Some(1));
        assert!(!producer.is_full());
        assert!(producer.add(4));

        assert_eq!(consumer.get(), Some(2));
        assert_eq!(consumer.get(), Some(3));
        assert_eq!(consumer.get(), Some(4));
        assert_eq!(consumer.get(), None);
        assert!(producer.is_empty());
    }

    #[test]
    fn test_split_unchecked_pair() {
        let (mut producer, mut consumer) = SpscRing::<u64>::new(3).unwrap().split();

        let mut sent = 0u64;
        while !producer.is_full() {
            unsafe { producer.add_unchecked(sent) };
            sent += 1;
        }
        assert_eq!(sent, 7);
        assert_eq!(producer.capacity(), 8);

        let mut got = Vec::new();
        while !consumer.is_empty() {
            got.push(unsafe { consumer.get_unchecked() });
        }
        assert_eq!(got, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_spsc_threads_small_ring() {
        const N: u32 = 10_000;
        let (mut producer, mut consumer) = SpscRing::<u32>::new(2).unwrap().split();

        let handle = thread::spawn(move || {
            for i in 0..N {
                while !producer.add(i) {
                    thread::yield_now();
                }
            }
        });

        for expected in 0..N {
            let v = loop {
                match consumer.get() {
                    Some(v) => break v,
                    None => thread::yield_now(),
                }
            };
            assert_eq!(v, expected);
        }

        handle.join().unwrap();
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_dropping_one_half_keeps_ring_alive() {
        let (mut producer, consumer) = SpscRing::<u32>::new(2).unwrap().split();
        drop(consumer);
        assert!(producer.add(5));
        assert_eq!(producer.len(), 1);
    }
}
