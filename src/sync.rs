//! Atomic primitives used by the concurrent cursor backend.
//!
//! Built with `--cfg loom` these resolve to loom's model-checked versions:
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --release --lib
//! ```

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::Arc;

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::Arc;
