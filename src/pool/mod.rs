//! Worker pool built on top of the ring buffer
//!
//! Nothing here is part of the buffer's contract. It is the caller side:
//! wait policies and a fixed set of worker threads, each fed through its own
//! SPSC queue.

mod backoff;
mod worker;

pub use backoff::{Attempt, RetrySleep, SpinYield};
pub use worker::{FeedReport, PoolConfig, WorkerPool, WorkerReport};
