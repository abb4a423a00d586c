//! Worker Pool Test - master feeds per-worker queues while workers drain
//!
//! Usage:
//!   cargo test --release --test worker_pool_test -- --nocapture

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ringq::pool::{FeedReport, PoolConfig, RetrySleep, WorkerPool};
use ringq::Backing;

const WORKERS: usize = 4;

fn pool_config(exponent: u32, backing: Backing) -> PoolConfig {
    PoolConfig {
        workers: WORKERS,
        queue_exponent: exponent,
        backing,
        retry: RetrySleep::new(Duration::from_micros(10), None),
        spin_limit: 16,
    }
}

/// Prefill, start, broadcast `until` values, shut down; return per-worker
/// sequences.
fn run_demo(exponent: u32, backing: Backing, until: u32) -> (Vec<Vec<u32>>, FeedReport) {
    let seen: Arc<Mutex<Vec<Vec<u32>>>> = Arc::new(Mutex::new(vec![Vec::new(); WORKERS]));
    let mut pool: WorkerPool<u32> = WorkerPool::new(&pool_config(exponent, backing)).unwrap();

    let mut prefilled = 0;
    for index in 0..pool.len() {
        prefilled = pool.prefill(index, |i| i as u32);
    }
    assert_eq!(prefilled, (1 << exponent) - 1);

    let sink = Arc::clone(&seen);
    pool.start(move |id, v| sink.lock().unwrap()[id - 1].push(v))
        .expect("start workers");

    let mut totals = FeedReport::default();
    for v in prefilled as u32..until {
        totals += pool.broadcast(v);
    }

    let reports = pool.shutdown();
    assert_eq!(reports.len(), WORKERS);
    for report in &reports {
        assert_eq!(report.received, u64::from(until), "worker {}", report.id);
    }

    let seen = seen.lock().unwrap().clone();
    (seen, totals)
}

#[test]
fn test_default_demo_shape() {
    let (seen, totals) = run_demo(3, Backing::Heap, 20_000);

    assert_eq!(totals.delivered, (WORKERS as u64) * (20_000 - 7));
    assert_eq!(totals.dropped, 0);
    for per_worker in &seen {
        assert_eq!(*per_worker, (0..20_000).collect::<Vec<_>>());
    }
}

#[test]
fn test_larger_queues_on_mapped_backing() {
    let (seen, totals) = run_demo(10, Backing::Anonymous, 50_000);

    assert_eq!(totals.dropped, 0);
    for per_worker in &seen {
        assert_eq!(per_worker.len(), 50_000);
        assert!(per_worker.windows(2).all(|w| w[0] + 1 == w[1]));
    }
}

#[test]
fn test_handler_sees_every_worker_id() {
    let hits: Arc<[AtomicU64; WORKERS]> = Arc::new(Default::default());
    let mut pool: WorkerPool<u64> = WorkerPool::new(&pool_config(2, Backing::Heap)).unwrap();

    let counters = Arc::clone(&hits);
    pool.start(move |id, _| {
        counters[id - 1].fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    for v in 0..1_000u64 {
        let report = pool.broadcast(v);
        assert_eq!(report.delivered, WORKERS as u64);
    }
    pool.shutdown();

    for counter in hits.iter() {
        assert_eq!(counter.load(Ordering::Relaxed), 1_000);
    }
}
