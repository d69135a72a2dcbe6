//! Criterion latency benchmarks.
//!
//! Measures:
//! - Submit that rests (no matching)
//! - Submit that fully matches, at several book depths
//! - Cancel, at several book sizes
//! - Mixed workload

use std::collections::VecDeque;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use matchbook::{OrderBook, OrderId, OrderType, Price, Side};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn ticks(value: i64) -> Price {
    Price::from_ticks(value)
}

/// Submit that rests below the market.
fn bench_submit_no_match(c: &mut Criterion) {
    let book = OrderBook::new();

    c.bench_function("submit_no_match", |b| {
        b.iter(|| {
            let result = book.submit(ticks(9_000), 100, Side::Buy, OrderType::Limit);
            black_box(result)
        })
    });
}

/// Submit that fully matches against pre-populated asks.
fn bench_submit_full_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_full_match");

    for depth in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let book = OrderBook::new();
            for _ in 0..depth {
                book.submit_passive(ticks(10_000), 100, Side::Sell).unwrap();
            }

            b.iter(|| {
                let result = book.submit(ticks(10_000), 100, Side::Buy, OrderType::Limit);
                // Replenish the consumed maker.
                book.submit_passive(ticks(10_000), 100, Side::Sell).unwrap();
                black_box(result)
            })
        });
    }

    group.finish();
}

/// Cancel with varying numbers of resting orders.
fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");

    for book_size in [100i64, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(book_size),
            &book_size,
            |b, &book_size| {
                let book = OrderBook::new();
                let mut live: VecDeque<OrderId> = (0..book_size)
                    .map(|i| {
                        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                        let price = if i % 2 == 0 { 9_000 + i % 100 } else { 11_000 + i % 100 };
                        book.submit_passive(ticks(price), 100, side).unwrap()
                    })
                    .collect();

                b.iter(|| {
                    let id = live.pop_front().unwrap();
                    let ok = book.cancel(id);
                    // Replenish so the book size stays fixed.
                    let refill = book.submit_passive(ticks(9_050), 100, Side::Buy).unwrap();
                    live.push_back(refill);
                    black_box(ok)
                })
            },
        );
    }

    group.finish();
}

/// Realistic mix: 70% submit, 30% cancel.
fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");

    group.bench_function("70_submit_30_cancel", |b| {
        let book = OrderBook::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);
        let mut live: Vec<OrderId> = Vec::new();

        // Pre-populate.
        for _ in 0..1_000 {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            if let Some(id) = book.submit_passive(ticks(rng.gen_range(9_900..10_100)), 100, side) {
                live.push(id);
            }
        }

        b.iter(|| {
            if live.is_empty() || rng.gen_bool(0.7) {
                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                let result = book
                    .submit(
                        ticks(rng.gen_range(9_900..10_100)),
                        rng.gen_range(1..1_000),
                        side,
                        OrderType::Limit,
                    )
                    .unwrap();
                if result.remaining_qty > 0 {
                    live.push(result.order_id);
                }
                black_box(result.num_trades())
            } else {
                let idx = rng.gen_range(0..live.len());
                let id = live.swap_remove(idx);
                black_box(usize::from(book.cancel(id)))
            }
        })
    });

    group.finish();
}

/// Orders per second over a 1000-order batch.
fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("1000_orders", |b| {
        let book = OrderBook::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0xCAFEBABE);

        b.iter(|| {
            for _ in 0..1_000 {
                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                let result = book.submit(
                    ticks(rng.gen_range(9_900..10_100)),
                    rng.gen_range(1..1_000),
                    side,
                    OrderType::Limit,
                );
                black_box(result).ok();
            }
            book.clear();
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_no_match,
    bench_submit_full_match,
    bench_cancel,
    bench_mixed_workload,
    bench_throughput,
);

criterion_main!(benches);
