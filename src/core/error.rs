use std::io;

/// Errors raised while constructing a ring buffer or starting workers.
///
/// A full or empty buffer is not an error: `add` and `get` report those
/// through their `bool` / `Option` results.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid capacity exponent: {exponent}")]
    InvalidExponent { exponent: u32 },
    #[error("failed to allocate {slots} slots")]
    Allocation { slots: usize },
    #[error("failed to map backing store: {0}")]
    Mmap(#[from] io::Error),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
