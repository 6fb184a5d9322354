//! MPMC queue throughput and wakeup-latency benchmark.
//!
//! Usage:
//!     cargo run --release --bin mpmc_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0  Pin producer to CPU 0 (default: 0)
//!     CONSUMER_CPU=2  Pin consumer to CPU 2 (default: 2)

use std::env;
use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use waitline::Queue;

const ITERATIONS: usize = 1 << 20;
const RTT_ITERATIONS: usize = 1 << 14;
const MPMC_PRODUCERS: usize = 4;
const MPMC_CONSUMERS: usize = 4;

type Payload = i64;

/// Sentinel telling a consumer the producers are done.
const DONE: Payload = -1;

fn get_cpu_affinity() -> (Option<usize>, Option<usize>) {
    let producer_cpu = env::var("PRODUCER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(0));
    let consumer_cpu = env::var("CONSUMER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(2));
    (producer_cpu, consumer_cpu)
}

fn pin_to_cpu(cpu: Option<usize>) {
    if let Some(id) = cpu {
        core_affinity::set_for_current(core_affinity::CoreId { id });
    }
}

fn bench_throughput(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let queue = Queue::new();
    let drain = queue.clone();

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();

    // Consumer thread
    let consumer_thread = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);

        // Signal ready
        ready_clone.store(true, Ordering::Release);

        for expected in 0..ITERATIONS as Payload {
            let value = drain.pop();
            if value != expected {
                panic!("Data corruption: expected {}, got {}", expected, value);
            }
        }
    });

    // Wait for consumer to be ready
    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }

    pin_to_cpu(producer_cpu);

    let start = Instant::now();

    for i in 0..ITERATIONS as Payload {
        queue.push(i);
    }

    consumer_thread.join().unwrap();
    let elapsed = start.elapsed();

    let ops_per_ms = ITERATIONS as u128 * 1_000_000 / elapsed.as_nanos();
    println!("{} ops/ms (1 producer, 1 consumer)", ops_per_ms);
}

fn bench_mpmc_throughput() {
    let queue = Queue::new();
    let per_producer = ITERATIONS / MPMC_PRODUCERS;

    let start = Instant::now();

    let producers: Vec<_> = (0..MPMC_PRODUCERS)
        .map(|_| {
            let q = queue.clone();
            std::thread::spawn(move || {
                for i in 0..per_producer as Payload {
                    q.push(i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..MPMC_CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            std::thread::spawn(move || {
                let mut popped = 0usize;
                while q.pop() != DONE {
                    popped += 1;
                }
                popped
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    // One sentinel per consumer terminates the drain.
    for _ in 0..MPMC_CONSUMERS {
        queue.push(DONE);
    }

    let mut total = 0;
    for c in consumers {
        total += c.join().unwrap();
    }
    let elapsed = start.elapsed();

    assert_eq!(total, per_producer * MPMC_PRODUCERS);

    let ops_per_ms = total as u128 * 1_000_000 / elapsed.as_nanos();
    println!(
        "{} ops/ms ({} producers, {} consumers)",
        ops_per_ms, MPMC_PRODUCERS, MPMC_CONSUMERS
    );
}

fn bench_wakeup_rtt(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let request = Queue::new();
    let response = Queue::new();

    let responder_rx = request.clone();
    let responder_tx = response.clone();

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();

    // Responder thread: every pop parks, every push wakes the other side.
    let responder = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);

        // Signal ready
        ready_clone.store(true, Ordering::Release);

        for _ in 0..RTT_ITERATIONS {
            let value = responder_rx.pop();
            responder_tx.push(value);
        }
    });

    // Wait for responder to be ready
    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }

    pin_to_cpu(producer_cpu);

    let start = Instant::now();

    for i in 0..RTT_ITERATIONS as Payload {
        request.push(i);
        let _ = response.pop();
    }

    let elapsed = start.elapsed();
    responder.join().unwrap();

    let rtt_ns = elapsed.as_nanos() / RTT_ITERATIONS as u128;
    println!("{} ns blocking round trip", rtt_ns);
}

fn main() {
    let (producer_cpu, consumer_cpu) = get_cpu_affinity();

    println!("waitline MPMC (iters={}):", ITERATIONS);
    bench_throughput(producer_cpu, consumer_cpu);
    bench_mpmc_throughput();
    bench_wakeup_rtt(producer_cpu, consumer_cpu);
}
