//! ringq workers - multi-thread queue demo
//!
//! Master thread mengisi queue setiap worker sampai penuh, lalu menjalankan
//! worker threads dan terus mengirim data selagi worker berjalan:
//! - Setiap worker punya satu SPSC queue (master = producer, worker = consumer)
//! - Queue kosong: worker spin lalu yield
//! - Queue penuh: master retry dengan sleep singkat
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=debug cargo run --release --bin ringq_workers -- --workers 4 --until 20000
//! ```

use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};

use ringq::pool::{FeedReport, PoolConfig, RetrySleep, WorkerPool};
use ringq::{Backing, Result};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackingArg {
    Heap,
    Anonymous,
    Locked,
}

impl From<BackingArg> for Backing {
    fn from(arg: BackingArg) -> Self {
        match arg {
            BackingArg::Heap => Backing::Heap,
            BackingArg::Anonymous => Backing::Anonymous,
            #[cfg(unix)]
            BackingArg::Locked => Backing::Locked,
            #[cfg(not(unix))]
            BackingArg::Locked => Backing::Anonymous,
        }
    }
}

/// Demo configuration
#[derive(Parser, Debug)]
#[command(name = "ringq_workers")]
#[command(about = "Feed per-worker SPSC queues from one master thread")]
struct Config {
    /// Number of worker threads.
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Queue capacity exponent: each queue allocates 2^EXPONENT slots.
    #[arg(short, long, default_value_t = 3)]
    exponent: u32,

    /// Feed values up to (excluding) this number to every worker.
    #[arg(short, long, default_value_t = 20_000)]
    until: u32,

    /// Sleep between retries when a queue is full, in microseconds.
    #[arg(long, default_value_t = 10)]
    retry_sleep_us: u64,

    /// Give up on a value after this many retries (default: never).
    #[arg(long)]
    max_retries: Option<u32>,

    /// Time given to workers before they are told to stop, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    grace_ms: u64,

    /// Where queue slots are allocated.
    #[arg(long, value_enum, default_value_t = BackingArg::Heap)]
    backing: BackingArg,
}

impl Config {
    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            queue_exponent: self.exponent,
            backing: self.backing.into(),
            retry: RetrySleep::new(Duration::from_micros(self.retry_sleep_us), self.max_retries),
            ..PoolConfig::default()
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        tracing::error!("❌ Demo error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    info!("🚀 ringq worker demo");
    info!(
        "workers: {}, queue: 2^{} slots, feeding up to {}",
        config.workers, config.exponent, config.until
    );

    let mut pool: WorkerPool<u32> = WorkerPool::new(&config.pool_config())?;

    // Fill queues before startup
    let mut prefilled = 0;
    for index in 0..pool.len() {
        prefilled = pool.prefill(index, |i| i as u32);
        info!("Thread {} queue full ({} queued)", index + 1, prefilled);
    }

    pool.start(|id, value| debug!("Thread {} deq {}", id, value))?;

    // Fill queues at runtime
    let started = Instant::now();
    let mut totals = FeedReport::default();
    for value in prefilled as u32..config.until {
        totals += pool.broadcast(value);
    }
    let feed_time = started.elapsed();

    info!(
        "📊 fed {} values in {:.3}s ({} retries, {} dropped)",
        totals.delivered,
        feed_time.as_secs_f64(),
        totals.retries,
        totals.dropped
    );

    thread::sleep(Duration::from_millis(config.grace_ms));

    info!("Kill threads");
    let reports = pool.shutdown();

    let expected = u64::from(config.until.max(prefilled as u32));
    for report in &reports {
        info!(
            "Joined with thread {} ({} received, {} idle yields)",
            report.id, report.received, report.yields
        );
        if totals.dropped == 0 && report.received != expected {
            warn!(
                "⚠️  thread {} received {} of {} values",
                report.id, report.received, expected
            );
        }
    }

    info!("✅ Demo complete");
    Ok(())
}
