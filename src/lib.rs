//! ringq - Fixed-Capacity Ring Buffer
//!
//! Arsitektur:
//! - Power-of-two slots, satu slot dikorbankan untuk membedakan full/empty
//! - Dua backend cursor: [`SingleOwner`] (plain) dan [`Concurrent`] (lock-free SPSC)
//! - No-Allocation: slot di-allocate sekali saat init (heap atau anonymous mmap)
//! - Non-blocking: `add` pada buffer penuh dan `get` pada buffer kosong langsung return
//!
//! ```
//! use ringq::{LocalRing, SpscRing};
//!
//! // 2^3 slots, 7 usable
//! let mut ring: LocalRing<u32> = LocalRing::new(3)?;
//! assert!(ring.add(5));
//! assert_eq!(ring.get(), Some(5));
//!
//! // Cross-thread: split into one producer and one consumer
//! let (mut producer, mut consumer) = SpscRing::<u32>::new(3)?.split();
//! let handle = std::thread::spawn(move || {
//!     for i in 0..100 {
//!         while !producer.add(i) {
//!             std::thread::yield_now();
//!         }
//!     }
//! });
//! let mut received = 0;
//! while received < 100 {
//!     if let Some(v) = consumer.get() {
//!         assert_eq!(v, received);
//!         received += 1;
//!     }
//! }
//! handle.join().unwrap();
//! # Ok::<(), ringq::Error>(())
//! ```

pub mod core;
pub mod pool;
mod sync;

pub use crate::core::{
    Backing, Concurrent, Consumer, Drain, Error, LocalRing, Mode, Producer, Result, RingBuffer,
    SingleOwner, SpscRing,
};
