//! Price-time priority matching.
//!
//! The matcher walks the best bucket of the opposite side, consuming
//! resting orders FIFO-first. Trades execute at the resting (maker) price.
//! Price-time priority falls out of three facts: best-bucket selection by
//! map order, FIFO consumption within a bucket, and append-to-tail on
//! insertion. Timestamps never decide priority.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::OrderError;
use crate::order::{Order, OrderId, OrderStatus, OrderType, Side, Trade};
use crate::storage::Storage;

/// Outcome of matching one incoming order.
///
/// `filled_qty + remaining_qty` always equals the submitted quantity. When
/// a limit residual could not rest (exhausted fixed-capacity storage),
/// `rest_error` is set and the trades already executed remain committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    /// Id assigned to the submitted order.
    pub order_id: OrderId,
    /// Trades in the order resting liquidity was consumed.
    pub trades: Vec<Trade>,
    pub filled_qty: u64,
    pub remaining_qty: u64,
    pub fully_filled: bool,
    pub rest_error: Option<OrderError>,
}

impl MatchResult {
    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    pub fn num_trades(&self) -> usize {
        self.trades.len()
    }
}

/// The matching engine: the crossing loop plus trade-id generation and
/// statistics.
///
/// Counters are atomics with relaxed ordering; their values are identities
/// and tallies, not synchronization.
pub struct Matcher {
    next_trade_id: AtomicU64,
    trade_count: AtomicU64,
    total_volume: AtomicU64,
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            next_trade_id: AtomicU64::new(1),
            trade_count: AtomicU64::new(0),
            total_volume: AtomicU64::new(0),
        }
    }

    /// Matches `incoming` against the opposite side of `storage`.
    ///
    /// Mutates resting records in place, removes the ones it fills
    /// completely, and updates the incoming order's fill state and status.
    /// Residual handling (resting a limit remainder) is the caller's job.
    pub fn match_order<S: Storage>(&self, incoming: &mut Order, storage: &mut S) -> MatchResult {
        let mut result = MatchResult {
            order_id: incoming.order_id,
            trades: Vec::new(),
            filled_qty: 0,
            remaining_qty: incoming.quantity,
            fully_filled: false,
            rest_error: None,
        };

        let opposite = incoming.side.opposite();

        while result.remaining_qty > 0 {
            let Some(index) = storage.best(opposite) else {
                break;
            };
            let resting = *storage.order(index);

            // Market orders take any price; limit orders stop at the first
            // level that no longer crosses.
            if incoming.kind == OrderType::Limit && !incoming.can_match_with(&resting) {
                break;
            }

            let fill = result.remaining_qty.min(resting.remaining());
            assert!(fill > 0, "resting order with no remaining quantity at best");

            incoming.filled_quantity += fill;
            result.filled_qty += fill;
            result.remaining_qty -= fill;

            {
                let record = storage.order_mut(index);
                record.filled_quantity += fill;
                record.status = if record.is_fully_filled() {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
            }

            let (buy_order_id, sell_order_id) = match incoming.side {
                Side::Buy => (incoming.order_id, resting.order_id),
                Side::Sell => (resting.order_id, incoming.order_id),
            };
            result.trades.push(Trade::new(
                self.next_trade_id.fetch_add(1, Ordering::Relaxed),
                buy_order_id,
                sell_order_id,
                resting.price,
                fill,
            ));

            self.trade_count.fetch_add(1, Ordering::Relaxed);
            self.total_volume.fetch_add(fill, Ordering::Relaxed);

            if storage.order(index).is_fully_filled() {
                let removed = storage.remove(resting.order_id);
                debug_assert!(removed.is_ok(), "filled maker missing from directory");
            }
        }

        incoming.status = if incoming.is_fully_filled() {
            OrderStatus::Filled
        } else if result.filled_qty > 0 {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::New
        };
        result.fully_filled = result.remaining_qty == 0;

        result
    }

    pub fn total_trades(&self) -> u64 {
        self.trade_count.load(Ordering::Relaxed)
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume.load(Ordering::Relaxed)
    }

    pub fn reset_statistics(&self) {
        self.trade_count.store(0, Ordering::Relaxed);
        self.total_volume.store(0, Ordering::Relaxed);
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}
