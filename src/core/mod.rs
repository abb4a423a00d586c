//! Core module: fixed-capacity ring buffer
//!
//! Prinsip desain:
//! - Power-of-two slots, cursor dimajukan dengan bitmask
//! - Satu slot dikorbankan supaya full dan empty bisa dibedakan
//! - No-Allocation: semua slot di-allocate saat init, dilepas saat drop
//! - Dua backend cursor: single-owner (plain) dan concurrent (acquire/release)

mod cursor;
mod error;
mod handle;
mod ring_buffer;
mod storage;

pub use cursor::{Concurrent, Cursor, Mode, SingleOwner};
pub use error::{Error, Result};
pub use handle::{Consumer, Producer};
pub use ring_buffer::{Drain, LocalRing, RingBuffer, SpscRing};
pub use storage::Backing;
