//! Public order book surface.
//!
//! Every externally observable operation takes the book lock exactly once
//! and releases it before returning; that acquisition is the linearization
//! point. Id generation and matching statistics live outside the lock as
//! relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::depth::MarketDepth;
use crate::error::OrderError;
use crate::matching::{MatchResult, Matcher};
use crate::order::{Order, OrderId, OrderStatus, OrderType, Price, Side};
use crate::storage::{BoundedStorage, IntrusiveStorage, Storage};
use crate::sync::SpinLock;

/// Parameters of one order in a bulk submission.
#[derive(Clone, Copy, Debug)]
pub struct NewOrder {
    pub price: Price,
    pub quantity: u64,
    pub side: Side,
    pub kind: OrderType,
}

impl NewOrder {
    #[inline]
    pub const fn limit(price: Price, quantity: u64, side: Side) -> Self {
        Self {
            price,
            quantity,
            side,
            kind: OrderType::Limit,
        }
    }

    #[inline]
    pub const fn market(quantity: u64, side: Side) -> Self {
        Self {
            price: Price::ZERO,
            quantity,
            side,
            kind: OrderType::Market,
        }
    }
}

/// Single-symbol limit order book with price-time matching.
///
/// Generic over the storage strategy: the default grows without bound,
/// [`BoundedOrderBook`] holds a fixed number of slots and reports
/// exhaustion.
pub struct OrderBook<S: Storage = IntrusiveStorage> {
    storage: SpinLock<S>,
    matcher: Matcher,
    next_order_id: AtomicU64,
}

/// Book over fixed-capacity storage.
pub type BoundedOrderBook = OrderBook<BoundedStorage>;

impl OrderBook<IntrusiveStorage> {
    pub fn new() -> Self {
        Self::with_storage(IntrusiveStorage::new())
    }
}

impl Default for OrderBook<IntrusiveStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook<BoundedStorage> {
    /// A book that can hold at most `capacity` resting orders.
    pub fn bounded(capacity: u32) -> Self {
        Self::with_storage(BoundedStorage::with_capacity(capacity))
    }
}

impl<S: Storage> OrderBook<S> {
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage: SpinLock::new(storage),
            matcher: Matcher::new(),
            next_order_id: AtomicU64::new(1),
        }
    }

    #[inline]
    fn next_id(&self) -> OrderId {
        self.next_order_id.fetch_add(1, Ordering::Relaxed)
    }

    // ========================================================================
    // Order entry
    // ========================================================================

    /// Submits an order: matches against the opposite side, then rests any
    /// limit residual.
    ///
    /// `Err` is returned only for precondition violations, with the book
    /// untouched. A residual that cannot rest (fixed-capacity storage
    /// exhausted) is reported through [`MatchResult::rest_error`]; the
    /// executed trades remain committed. Market orders never rest.
    pub fn submit(
        &self,
        price: Price,
        quantity: u64,
        side: Side,
        kind: OrderType,
    ) -> Result<MatchResult, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }

        let mut order = Order::new(self.next_id(), price, quantity, side, kind);

        let mut storage = self.storage.lock();
        let mut result = self.matcher.match_order(&mut order, &mut *storage);
        if result.remaining_qty > 0 && kind == OrderType::Limit {
            if let Err(error) = storage.insert(order) {
                result.rest_error = Some(error);
            }
        }
        Ok(result)
    }

    /// Submits a market order (matches at any price, never rests).
    pub fn submit_market(&self, quantity: u64, side: Side) -> Result<MatchResult, OrderError> {
        self.submit(Price::ZERO, quantity, side, OrderType::Market)
    }

    /// Places a limit order directly in the book, skipping matching.
    ///
    /// Returns the assigned order id, or `None` if the order could not be
    /// placed.
    pub fn submit_passive(&self, price: Price, quantity: u64, side: Side) -> Option<OrderId> {
        if quantity == 0 {
            return None;
        }
        let order = Order::new(self.next_id(), price, quantity, side, OrderType::Limit);
        let order_id = order.order_id;
        self.storage.lock().insert(order).ok()?;
        Some(order_id)
    }

    /// Bulk submission; results are returned in input order.
    pub fn submit_batch(&self, orders: &[NewOrder]) -> Vec<Result<MatchResult, OrderError>> {
        orders
            .iter()
            .map(|o| self.submit(o.price, o.quantity, o.side, o.kind))
            .collect()
    }

    // ========================================================================
    // Cancel / modify
    // ========================================================================

    /// Cancels a resting order. Returns `false` (book unchanged) for an
    /// unknown id.
    pub fn cancel(&self, order_id: OrderId) -> bool {
        let mut storage = self.storage.lock();
        let Some(index) = storage.find(order_id) else {
            return false;
        };
        storage.order_mut(index).status = OrderStatus::Cancelled;
        storage.remove(order_id).is_ok()
    }

    /// Replaces a resting order's quantity, keeping its id, price and side.
    ///
    /// Implemented as cancel + re-add: the order is re-stamped and
    /// re-queued at the tail of its bucket, so time priority is lost.
    pub fn modify(&self, order_id: OrderId, new_quantity: u64) -> bool {
        if new_quantity == 0 {
            return false;
        }
        let mut storage = self.storage.lock();
        let Ok(previous) = storage.remove(order_id) else {
            return false;
        };
        let replacement = Order::new(order_id, previous.price, new_quantity, previous.side, previous.kind);
        // The freed slot guarantees the re-add cannot exhaust storage.
        storage.insert(replacement).is_ok()
    }

    // ========================================================================
    // Market data
    // ========================================================================

    /// Snapshot of a live order.
    pub fn find(&self, order_id: OrderId) -> Option<Order> {
        let storage = self.storage.lock();
        storage.find(order_id).map(|index| *storage.order(index))
    }

    /// Highest-priority resting buy order.
    pub fn best_bid(&self) -> Option<Order> {
        let storage = self.storage.lock();
        storage.best(Side::Buy).map(|index| *storage.order(index))
    }

    /// Highest-priority resting sell order.
    pub fn best_ask(&self) -> Option<Order> {
        let storage = self.storage.lock();
        storage.best(Side::Sell).map(|index| *storage.order(index))
    }

    pub fn best_bid_price(&self) -> Option<Price> {
        self.best_bid().map(|order| order.price)
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        self.best_ask().map(|order| order.price)
    }

    /// Best ask minus best bid, from one consistent snapshot.
    pub fn spread(&self) -> Option<Price> {
        let storage = self.storage.lock();
        let bid = storage.best(Side::Buy).map(|index| storage.order(index).price)?;
        let ask = storage.best(Side::Sell).map(|index| storage.order(index).price)?;
        Some(ask - bid)
    }

    /// Mean of the best prices, from one consistent snapshot.
    pub fn mid_price(&self) -> Option<f64> {
        let storage = self.storage.lock();
        let bid = storage.best(Side::Buy).map(|index| storage.order(index).price)?;
        let ask = storage.best(Side::Sell).map(|index| storage.order(index).price)?;
        Some((bid.to_f64() + ask.to_f64()) / 2.0)
    }

    /// Aggregated L2 snapshot of up to `max_levels` levels per side.
    pub fn depth(&self, max_levels: usize) -> MarketDepth {
        self.storage.lock().depth(max_levels)
    }

    /// FIFO snapshot of the orders resting at one price.
    pub fn orders_at(&self, side: Side, price: Price) -> Vec<Order> {
        self.storage.lock().orders_at(side, price)
    }

    // ========================================================================
    // Maintenance and counters
    // ========================================================================

    /// Destroys every resting order and empties both sides.
    pub fn clear(&self) {
        self.storage.lock().clear();
    }

    /// Number of live resting orders.
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trades executed since the last statistics reset.
    pub fn total_trades(&self) -> u64 {
        self.matcher.total_trades()
    }

    /// Quantity traded since the last statistics reset.
    pub fn total_volume(&self) -> u64 {
        self.matcher.total_volume()
    }

    pub fn reset_statistics(&self) {
        self.matcher.reset_statistics();
    }
}
