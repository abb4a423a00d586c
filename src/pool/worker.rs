//! Per-worker SPSC queues drained by a fixed set of threads
//!
//! The thread that owns the pool is the single producer of every queue; each
//! worker thread is the single consumer of its own queue. Workers poll with
//! [`SpinYield`] and stop when their liveness flag is cleared, after draining
//! whatever was already queued.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use super::backoff::{RetrySleep, SpinYield};
use crate::core::{Backing, Consumer, Error, Producer, Result, SpscRing};

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    /// Each queue holds `2^queue_exponent` slots.
    pub queue_exponent: u32,
    pub backing: Backing,
    /// Policy for writes into a full queue.
    pub retry: RetrySleep,
    /// Spins before a worker yields on an empty queue.
    pub spin_limit: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_exponent: 3,
            backing: Backing::Heap,
            retry: RetrySleep::default(),
            spin_limit: 32,
        }
    }
}

/// What a worker did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// 1-based worker number.
    pub id: usize,
    pub received: u64,
    /// Times the worker gave its time slice back while idle.
    pub yields: u64,
}

/// Totals for a batch of feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub delivered: u64,
    pub dropped: u64,
    pub retries: u64,
}

impl AddAssign for FeedReport {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.dropped += rhs.dropped;
        self.retries += rhs.retries;
    }
}

struct Worker<T> {
    id: usize,
    queue: Producer<T>,
    // Handed to the worker thread on start
    pending: Option<Consumer<T>>,
    alive: Arc<AtomicBool>,
    thread: Option<JoinHandle<WorkerReport>>,
}

/// A fixed set of workers, each with its own queue.
pub struct WorkerPool<T> {
    workers: Vec<Worker<T>>,
    retry: RetrySleep,
    spin_limit: u32,
}

impl<T: Copy + Send + 'static> WorkerPool<T> {
    /// Allocate one queue per worker. No thread is started yet.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let ring = SpscRing::<T>::with_backing(config.queue_exponent, config.backing)?;
            let (queue, pending) = ring.split();
            workers.push(Worker {
                id: index + 1,
                queue,
                pending: Some(pending),
                alive: Arc::new(AtomicBool::new(false)),
                thread: None,
            });
        }

        debug!(
            workers = config.workers,
            exponent = config.queue_exponent,
            "worker queues allocated"
        );

        Ok(Self {
            workers,
            retry: config.retry,
            spin_limit: config.spin_limit,
        })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.workers.iter().any(|w| w.thread.is_some())
    }

    /// Allocated slots of each queue.
    pub fn queue_capacity(&self) -> usize {
        self.workers.first().map_or(0, |w| w.queue.capacity())
    }

    /// Elements currently waiting in queue `index`.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    pub fn queue_len(&self, index: usize) -> usize {
        self.workers[index].queue.len()
    }

    /// Fill queue `index` until it is full, taking values from `next(i)`.
    ///
    /// Returns how many values were queued.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    pub fn prefill<F: FnMut(usize) -> T>(&mut self, index: usize, mut next: F) -> usize {
        let worker = &mut self.workers[index];
        let mut count = 0;
        while !worker.queue.is_full() {
            // SAFETY: checked not full just above; only this thread produces.
            unsafe { worker.queue.add_unchecked(next(count)) };
            count += 1;
        }
        debug!(worker = worker.id, count, "queue prefilled");
        count
    }

    /// Spawn one thread per worker. Each calls `handler(id, value)` for every
    /// element it dequeues. Calling this twice is a no-op.
    pub fn start<H>(&mut self, handler: H) -> Result<()>
    where
        H: Fn(usize, T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let spin_limit = self.spin_limit;

        for worker in &mut self.workers {
            let Some(queue) = worker.pending.take() else {
                continue;
            };
            let id = worker.id;
            let alive = Arc::clone(&worker.alive);
            let handler = Arc::clone(&handler);

            alive.store(true, Ordering::Release);
            let spawned = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || run_worker(id, queue, &alive, &*handler, spin_limit));

            match spawned {
                Ok(handle) => {
                    debug!(worker = id, "worker thread created");
                    worker.thread = Some(handle);
                }
                Err(e) => {
                    worker.alive.store(false, Ordering::Release);
                    error!(worker = id, error = %e, "failed to spawn worker");
                    return Err(Error::Spawn(e));
                }
            }
        }

        info!(workers = self.workers.len(), "worker pool started");
        Ok(())
    }

    /// Enqueue `value` for worker `index`, retrying while the queue is full.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    pub fn feed(&mut self, index: usize, value: T) -> FeedReport {
        let worker = &mut self.workers[index];
        let queue = &mut worker.queue;
        let attempt = self.retry.run(|| queue.add(value));

        if !attempt.succeeded {
            warn!(
                worker = worker.id,
                retries = attempt.retries,
                "queue full, value dropped"
            );
        }

        FeedReport {
            delivered: u64::from(attempt.succeeded),
            dropped: u64::from(!attempt.succeeded),
            retries: u64::from(attempt.retries),
        }
    }

    /// Enqueue `value` to every worker in turn.
    pub fn broadcast(&mut self, value: T) -> FeedReport {
        let mut report = FeedReport::default();
        for index in 0..self.workers.len() {
            report += self.feed(index, value);
        }
        report
    }

    /// Stop every worker and collect their reports.
    ///
    /// Workers finish the elements already queued before they exit.
    pub fn shutdown(mut self) -> Vec<WorkerReport> {
        self.stop()
    }

    fn stop(&mut self) -> Vec<WorkerReport> {
        for worker in &self.workers {
            worker.alive.store(false, Ordering::Release);
        }

        let mut reports = Vec::with_capacity(self.workers.len());
        for worker in &mut self.workers {
            let Some(handle) = worker.thread.take() else {
                continue;
            };
            match handle.join() {
                Ok(report) => {
                    debug!(worker = report.id, received = report.received, "joined worker");
                    reports.push(report);
                }
                Err(_) => error!(worker = worker.id, "worker thread panicked"),
            }
        }
        reports
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.alive.store(false, Ordering::Release);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                let _ = handle.join();
            }
        }
    }
}

fn run_worker<T, H>(
    id: usize,
    mut queue: Consumer<T>,
    alive: &AtomicBool,
    handler: &H,
    spin_limit: u32,
) -> WorkerReport
where
    T: Copy,
    H: Fn(usize, T),
{
    let mut report = WorkerReport {
        id,
        received: 0,
        yields: 0,
    };
    let mut backoff = SpinYield::new(spin_limit);

    loop {
        if let Some(value) = queue.get() {
            handler(id, value);
            report.received += 1;
            backoff.reset();
            continue;
        }

        if !alive.load(Ordering::Acquire) {
            // Everything fed before the flag was cleared is visible now.
            while let Some(value) = queue.get() {
                handler(id, value);
                report.received += 1;
            }
            break;
        }

        if backoff.snooze() {
            report.yields += 1;
        }
    }

    debug!(worker = id, received = report.received, "worker stopped");
    report
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn config(workers: usize) -> PoolConfig {
        PoolConfig {
            workers,
            queue_exponent: 3,
            retry: RetrySleep::new(Duration::from_micros(10), None),
            ..PoolConfig::default()
        }
    }

    #[test]
    fn test_prefill_stops_at_usable_capacity() {
        let mut pool: WorkerPool<u32> = WorkerPool::new(&config(2)).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.queue_capacity(), 8);

        assert_eq!(pool.prefill(0, |i| i as u32), 7);
        assert_eq!(pool.queue_len(0), 7);
        assert_eq!(pool.queue_len(1), 0);
        assert!(!pool.is_started());
    }

    #[test]
    fn test_feed_without_workers_drops_after_budget() {
        let mut cfg = config(1);
        cfg.retry = RetrySleep::new(Duration::ZERO, Some(3));
        let mut pool: WorkerPool<u32> = WorkerPool::new(&cfg).unwrap();
        pool.prefill(0, |i| i as u32);

        let report = pool.feed(0, 99);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.retries, 3);
    }

    #[test]
    fn test_workers_receive_in_order() {
        let seen: Arc<Mutex<Vec<Vec<u32>>>> = Arc::new(Mutex::new(vec![Vec::new(); 3]));
        let mut pool: WorkerPool<u32> = WorkerPool::new(&config(3)).unwrap();

        for index in 0..pool.len() {
            pool.prefill(index, |i| i as u32);
        }

        let sink = Arc::clone(&seen);
        pool.start(move |id, v| sink.lock().unwrap()[id - 1].push(v))
            .expect("start workers");
        assert!(pool.is_started());

        let mut total = FeedReport::default();
        for v in 7..500u32 {
            total += pool.broadcast(v);
        }
        assert_eq!(total.delivered, 3 * 493);
        assert_eq!(total.dropped, 0);

        let reports = pool.shutdown();
        assert_eq!(reports.len(), 3);
        for report in &reports {
            assert_eq!(report.received, 500);
        }

        let seen = seen.lock().unwrap();
        for per_worker in seen.iter() {
            assert_eq!(*per_worker, (0..500).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_drop_stops_running_workers() {
        let mut pool: WorkerPool<u64> = WorkerPool::new(&config(2)).unwrap();
        pool.start(|_, _| {}).unwrap();
        let _ = pool.broadcast(1);
        drop(pool);
    }

    #[test]
    fn test_shutdown_before_start_is_empty() {
        let pool: WorkerPool<u32> = WorkerPool::new(&config(2)).unwrap();
        assert!(pool.shutdown().is_empty());
    }
}
