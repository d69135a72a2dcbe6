//! Latency percentile report for the matching core.
//!
//! Runs a mixed submit/cancel workload against a live book and prints
//! throughput plus an hdrhistogram latency breakdown. Exits 0 on success;
//! any invariant failure aborts with a nonzero status.

use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use matchbook::{OrderBook, OrderId, OrderType, Price, Side};

const WARMUP_OPS: usize = 10_000;
const ITERATIONS: usize = 1_000_000;

fn main() {
    println!("Preparing latency benchmark...");

    let book = OrderBook::new();
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000_000, 3)
        .expect("histogram bounds are static");

    // Seed both sides so the measured mix contains rests, fills and sweeps.
    for i in 0..1_000i64 {
        book.submit_passive(Price::from_ticks(9_900 - i % 50), 100, Side::Buy)
            .expect("seed bid");
        book.submit_passive(Price::from_ticks(10_100 + i % 50), 100, Side::Sell)
            .expect("seed ask");
    }

    println!("Warming up ({WARMUP_OPS} ops)...");
    let mut live: Vec<OrderId> = Vec::with_capacity(ITERATIONS);
    for step in 0..WARMUP_OPS {
        run_step(&book, step, &mut live);
    }

    println!("Running {ITERATIONS} iterations...");
    let mut total = Duration::ZERO;
    for step in 0..ITERATIONS {
        let start = Instant::now();
        std::hint::black_box(run_step(&book, step, &mut live));
        let elapsed = start.elapsed();
        total += elapsed;
        histogram
            .record(elapsed.as_nanos() as u64)
            .unwrap_or_default();
    }

    // The workload must have exercised the matcher, not just the rest path.
    assert!(book.total_trades() > 0, "no trades executed");
    assert!(book.total_volume() > 0, "no volume executed");
    let depth = book.depth(usize::MAX);
    let counted: u64 = depth
        .bids
        .iter()
        .chain(depth.asks.iter())
        .map(|level| u64::from(level.order_count))
        .sum();
    assert_eq!(counted as usize, book.len(), "depth and directory disagree");

    println!();
    println!("=== Latency Report (ns) ===");
    println!("Total ops:  {ITERATIONS}");
    println!(
        "Throughput: {:.2} ops/sec",
        ITERATIONS as f64 / total.as_secs_f64()
    );
    println!("---------------------------");
    println!("Min:    {:8} ns", histogram.min());
    println!("P50:    {:8} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:8} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:8} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:8} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:8} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:8} ns", histogram.max());
    println!("---------------------------");
    println!("Trades: {}  Volume: {}  Resting: {}", book.total_trades(), book.total_volume(), book.len());
}

/// One operation of the mixed workload: mostly submits around the touch,
/// with periodic cancels of older resters.
fn run_step(book: &OrderBook, step: usize, live: &mut Vec<OrderId>) -> usize {
    if step % 10 == 7 && !live.is_empty() {
        let id = live.swap_remove(step % live.len());
        return usize::from(book.cancel(id));
    }

    let side = if step % 2 == 0 { Side::Buy } else { Side::Sell };
    let offset = (step % 100) as i64;
    let price = match side {
        Side::Buy => Price::from_ticks(9_950 + offset),
        Side::Sell => Price::from_ticks(10_050 - offset),
    };
    let result = book
        .submit(price, 10 + (step % 90) as u64, side, OrderType::Limit)
        .expect("valid submission");
    if result.remaining_qty > 0 && result.rest_error.is_none() {
        live.push(result.order_id);
    }
    result.num_trades()
}
