//! ringq - latency micro-benchmark
//!
//! Mengukur:
//! - add/get latency untuk backend single-owner dan concurrent
//! - Heap vs anonymous mmap backing
//! - Throughput SPSC lintas thread (satu producer, satu consumer)

use std::thread;
use std::time::{Duration, Instant};

use ringq::{Backing, Concurrent, Mode, Result, RingBuffer, SingleOwner, SpscRing};

const EXPONENT: u32 = 16;

fn main() {
    println!("🚀 ringq - Ring Buffer Benchmark");
    println!("================================\n");

    if let Err(e) = run() {
        eprintln!("❌ Benchmark error: {}", e);
        std::process::exit(1);
    }

    println!("\n✅ All benchmarks complete!");
    println!("\nWorker demo: cargo run --release --bin ringq_workers");
}

fn run() -> Result<()> {
    benchmark_mode::<SingleOwner>(Backing::Heap)?;
    benchmark_mode::<Concurrent>(Backing::Heap)?;
    benchmark_mode::<Concurrent>(Backing::Anonymous)?;
    benchmark_spsc()?;
    Ok(())
}

fn benchmark_mode<M: Mode>(backing: Backing) -> Result<()> {
    println!("📊 Ring Buffer ({}, {:?})", M::NAME, backing);
    println!("-----------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let mut rb: RingBuffer<u64, M> = RingBuffer::with_backing(EXPONENT, backing)?;

    // Warm up
    for i in 0..1000 {
        let _ = rb.add(i);
    }
    rb.clear();

    // Benchmark add
    let start = Instant::now();
    for i in 0..ITERATIONS {
        while !rb.add(i as u64) {
            rb.get();
        }
    }
    let add_duration = start.elapsed();

    // Drain
    rb.clear();

    // Benchmark get
    let mut filled = 0;
    while rb.add(filled) {
        filled += 1;
    }

    let start = Instant::now();
    let mut popped = 0usize;
    while rb.get().is_some() {
        popped += 1;
    }
    let get_duration = start.elapsed();

    let add_ns = add_duration.as_nanos() as f64 / ITERATIONS as f64;
    let get_ns = get_duration.as_nanos() as f64 / popped.max(1) as f64;

    println!("  Capacity: {} ({} usable)", rb.capacity(), rb.usable_capacity());
    println!("  Operations: {}", ITERATIONS);
    println!("  Add latency: {:.2} ns/op", add_ns);
    println!("  Get latency: {:.2} ns/op", get_ns);
    println!(
        "  Throughput:  {:.2} M ops/sec\n",
        ITERATIONS as f64 / add_duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}

fn benchmark_spsc() -> Result<()> {
    println!("📊 SPSC Cross-Thread Throughput");
    println!("-------------------------------");

    const MESSAGES: u64 = 10_000_000;
    let (mut producer, mut consumer) = SpscRing::<u64>::new(EXPONENT)?.split();

    let start = Instant::now();
    let sender = thread::spawn(move || {
        let mut full_hits = 0u64;
        for i in 0..MESSAGES {
            while !producer.add(i) {
                full_hits += 1;
                std::hint::spin_loop();
            }
        }
        full_hits
    });

    let mut expected = 0u64;
    let mut empty_hits = 0u64;
    while expected < MESSAGES {
        match consumer.get() {
            Some(v) => {
                if v != expected {
                    eprintln!("⚠️  Out of order: got {} expected {}", v, expected);
                }
                expected += 1;
            }
            None => {
                empty_hits += 1;
                std::hint::spin_loop();
            }
        }
    }
    let elapsed = start.elapsed();
    let full_hits = sender.join().unwrap_or(0);

    print_spsc(MESSAGES, elapsed, full_hits, empty_hits);
    Ok(())
}

fn print_spsc(messages: u64, elapsed: Duration, full_hits: u64, empty_hits: u64) {
    println!("  Messages: {}", messages);
    println!("  Elapsed:  {:.3} s", elapsed.as_secs_f64());
    println!(
        "  Throughput: {:.2} M msgs/sec",
        messages as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );
    println!(
        "  Latency:    {:.2} ns/msg",
        elapsed.as_nanos() as f64 / messages as f64
    );
    println!("  Producer saw full:  {}", full_hits);
    println!("  Consumer saw empty: {}", empty_hits);
}
