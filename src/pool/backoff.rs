//! Caller-side wait policies
//!
//! The ring never blocks. These are the two policies the worker demo layers
//! on top of it: spin-then-yield while a queue is empty, and bounded
//! retry-with-sleep while a queue is full.

use std::hint;
use std::thread;
use std::time::Duration;

/// Spin with `spin_loop` hints, then give the CPU back to the scheduler.
#[derive(Debug, Clone)]
pub struct SpinYield {
    spins: u32,
    spin_limit: u32,
}

impl Default for SpinYield {
    fn default() -> Self {
        Self::new(32)
    }
}

impl SpinYield {
    pub const fn new(spin_limit: u32) -> Self {
        Self {
            spins: 0,
            spin_limit,
        }
    }

    /// Wait a little. Returns `true` when this call yielded to the OS.
    #[inline]
    pub fn snooze(&mut self) -> bool {
        if self.spins < self.spin_limit {
            self.spins += 1;
            hint::spin_loop();
            false
        } else {
            yield_now();
            true
        }
    }

    /// Call after progress so the next wait starts spinning again.
    #[inline]
    pub fn reset(&mut self) {
        self.spins = 0;
    }
}

#[cfg(unix)]
fn yield_now() {
    // SAFETY: sched_yield takes no arguments and cannot fail on Linux.
    unsafe {
        libc::sched_yield();
    }
}

#[cfg(not(unix))]
fn yield_now() {
    thread::yield_now();
}

/// Retry an operation, sleeping `interval` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySleep {
    pub interval: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetrySleep {
    fn default() -> Self {
        Self {
            interval: Duration::from_micros(10),
            max_retries: None,
        }
    }
}

/// Outcome of [`RetrySleep::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub succeeded: bool,
    pub retries: u32,
}

impl RetrySleep {
    pub const fn new(interval: Duration, max_retries: Option<u32>) -> Self {
        Self {
            interval,
            max_retries,
        }
    }

    /// Call `op` until it returns `true` or the retry budget runs out.
    pub fn run<F: FnMut() -> bool>(&self, mut op: F) -> Attempt {
        let mut retries = 0u32;
        loop {
            if op() {
                return Attempt {
                    succeeded: true,
                    retries,
                };
            }
            if self.max_retries.is_some_and(|max| retries >= max) {
                return Attempt {
                    succeeded: false,
                    retries,
                };
            }
            retries += 1;
            if self.interval.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.interval);
            }
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_spin_then_yield() {
        let mut backoff = SpinYield::new(3);
        assert!(!backoff.snooze());
        assert!(!backoff.snooze());
        assert!(!backoff.snooze());
        assert!(backoff.snooze());
        assert!(backoff.snooze());

        backoff.reset();
        assert!(!backoff.snooze());
    }

    #[test]
    fn test_retry_until_success() {
        let policy = RetrySleep::new(Duration::from_micros(1), None);
        let mut calls = 0;
        let attempt = policy.run(|| {
            calls += 1;
            calls == 4
        });
        assert_eq!(
            attempt,
            Attempt {
                succeeded: true,
                retries: 3
            }
        );
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let policy = RetrySleep::new(Duration::ZERO, Some(2));
        let mut calls = 0;
        let attempt = policy.run(|| {
            calls += 1;
            false
        });
        assert!(!attempt.succeeded);
        assert_eq!(attempt.retries, 2);
        assert_eq!(calls, 3);
    }
}
