//! ringq harness - single-threaded fill and drain
//!
//! Mengisi ring buffer dari array sampai penuh, lalu mengosongkannya dan
//! mencetak setiap elemen untuk pengecekan visual.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin ringq_harness -- --exponent 3 --values 5,6,3,4,2,6,7
//! ```

use clap::Parser;
use tracing::{info, warn};

use ringq::{LocalRing, Result};

/// Harness configuration
#[derive(Parser, Debug)]
#[command(name = "ringq_harness")]
#[command(about = "Fill a ring buffer from a list of values, then drain it")]
struct Config {
    /// Capacity exponent: the ring allocates 2^EXPONENT slots.
    #[arg(short, long, default_value_t = 3)]
    exponent: u32,

    /// Values to enqueue, in order.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [5u32, 6, 3, 4, 2, 6, 7]
    )]
    values: Vec<u32>,

    /// Keep adding past full, overwriting the oldest element.
    #[arg(short, long)]
    force: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        tracing::error!("❌ Harness error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    let listing: Vec<String> = config.values.iter().map(u32::to_string).collect();
    info!("array: {}", listing.join(" "));

    let mut ring: LocalRing<u32> = LocalRing::new(config.exponent)?;
    info!("size {}", ring.capacity());

    let added = fill(&mut ring, config);
    info!("total: {} elements added", added);

    let mut count = 0usize;
    for elt in ring.drain() {
        info!("retrieved from the buffer : {}", elt);
        count += 1;
    }
    info!("total: {} elements retrieved", count);

    if !ring.is_empty() {
        warn!("ring not empty after drain");
    }
    Ok(())
}

fn fill(ring: &mut LocalRing<u32>, config: &Config) -> usize {
    let mut added = 0;
    for &value in &config.values {
        if config.force {
            if ring.is_full() {
                warn!("{} overwrites the oldest element", value);
            }
            ring.force_add(value);
        } else {
            if ring.is_full() {
                break;
            }
            // SAFETY: checked not full just above.
            unsafe { ring.add_unchecked(value) };
        }
        info!("{} added to the ring", value);
        added += 1;
    }
    added
}
