//! Book storage: price-indexed sides plus the order directory.
//!
//! Each side is an ordered map from price to [`Bucket`]; iterating bids
//! from the back and asks from the front yields prices in priority order.
//! The directory maps order ids to arena slots for O(1) lookup and cancel.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::depth::{MarketDepth, PriceLevel};
use crate::error::OrderError;
use crate::level::Bucket;
use crate::order::{Order, OrderId, Price, Side};
use crate::slab::{FixedSlab, GrowingSlab, SlotArena, SlotIndex, NIL};

/// The storage capability set the book and matcher operate against.
pub trait Storage {
    /// Places an order at the tail of its price bucket and in the
    /// directory. Fails on duplicate id or exhausted slots; the book is
    /// unchanged on failure.
    fn insert(&mut self, order: Order) -> Result<(), OrderError>;

    /// Unlinks an order, erases its bucket if now empty, reclaims its slot.
    /// Returns the removed record.
    fn remove(&mut self, order_id: OrderId) -> Result<Order, OrderError>;

    /// Slot of the highest-priority order on a side: head of the highest
    /// bid bucket, or head of the lowest ask bucket.
    fn best(&self, side: Side) -> Option<SlotIndex>;

    /// Slot of a live order by id.
    fn find(&self, order_id: OrderId) -> Option<SlotIndex>;

    fn order(&self, index: SlotIndex) -> &Order;

    fn order_mut(&mut self, index: SlotIndex) -> &mut Order;

    /// FIFO snapshot of the orders resting at one price.
    fn orders_at(&self, side: Side, price: Price) -> Vec<Order>;

    /// Aggregates up to `max_levels` buckets per side, best outward.
    fn depth(&self, max_levels: usize) -> MarketDepth;

    /// Releases every record and empties both sides and the directory.
    fn clear(&mut self);

    /// Number of live orders.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Intrusive storage over a slot arena.
///
/// Buckets and the directory hold only slot indices, never owning
/// references; the arena outlives both (fields drop in this order).
pub struct BookStorage<A> {
    directory: FxHashMap<OrderId, SlotIndex>,
    bids: BTreeMap<Price, Bucket>,
    asks: BTreeMap<Price, Bucket>,
    arena: A,
}

/// Storage backed by the growing arena; insertion fails only on duplicate
/// ids.
pub type IntrusiveStorage = BookStorage<GrowingSlab>;

/// Storage backed by the fixed arena; insertion also fails when capacity is
/// exhausted.
pub type BoundedStorage = BookStorage<FixedSlab>;

impl BookStorage<GrowingSlab> {
    pub fn new() -> Self {
        Self::with_arena(GrowingSlab::new())
    }
}

impl Default for BookStorage<GrowingSlab> {
    fn default() -> Self {
        Self::new()
    }
}

impl BookStorage<FixedSlab> {
    pub fn with_capacity(capacity: u32) -> Self {
        Self::with_arena(FixedSlab::with_capacity(capacity))
    }
}

impl<A: SlotArena> BookStorage<A> {
    pub fn with_arena(arena: A) -> Self {
        Self {
            directory: FxHashMap::default(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            arena,
        }
    }

    /// The backing arena, for capacity introspection.
    pub fn arena(&self) -> &A {
        &self.arena
    }

    /// Number of non-empty price levels across both sides.
    pub fn level_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    fn aggregate(&self, price: Price, bucket: &Bucket) -> PriceLevel {
        let total_quantity = bucket.iter(&self.arena).map(|order| order.remaining()).sum();
        PriceLevel {
            price,
            total_quantity,
            order_count: bucket.len(),
        }
    }
}

impl<A: SlotArena> Storage for BookStorage<A> {
    fn insert(&mut self, order: Order) -> Result<(), OrderError> {
        if self.directory.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateOrder(order.order_id));
        }

        let index = self.arena.allocate().ok_or(OrderError::StorageExhausted)?;

        let (id, side, price) = (order.order_id, order.side, order.price);
        *self.arena.get_mut(index) = Order {
            prev: NIL,
            next: NIL,
            ..order
        };

        let bucket = match side {
            Side::Buy => self.bids.entry(price).or_default(),
            Side::Sell => self.asks.entry(price).or_default(),
        };
        bucket.push_back(&mut self.arena, index);

        self.directory.insert(id, index);
        Ok(())
    }

    fn remove(&mut self, order_id: OrderId) -> Result<Order, OrderError> {
        let index = self
            .directory
            .remove(&order_id)
            .ok_or(OrderError::UnknownOrder(order_id))?;
        let record = *self.arena.get(index);

        let levels = match record.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        match levels.get_mut(&record.price) {
            Some(bucket) => {
                if bucket.unlink(&mut self.arena, index) {
                    levels.remove(&record.price);
                }
            }
            None => debug_assert!(false, "directory entry without a price bucket"),
        }

        self.arena.release(index);
        Ok(record)
    }

    fn best(&self, side: Side) -> Option<SlotIndex> {
        let bucket = match side {
            Side::Buy => self.bids.values().next_back(),
            Side::Sell => self.asks.values().next(),
        }?;
        debug_assert!(!bucket.is_empty(), "empty bucket stored in side map");
        Some(bucket.head())
    }

    fn find(&self, order_id: OrderId) -> Option<SlotIndex> {
        self.directory.get(&order_id).copied()
    }

    #[inline]
    fn order(&self, index: SlotIndex) -> &Order {
        self.arena.get(index)
    }

    #[inline]
    fn order_mut(&mut self, index: SlotIndex) -> &mut Order {
        self.arena.get_mut(index)
    }

    fn orders_at(&self, side: Side, price: Price) -> Vec<Order> {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels
            .get(&price)
            .map(|bucket| bucket.iter(&self.arena).copied().collect())
            .unwrap_or_default()
    }

    fn depth(&self, max_levels: usize) -> MarketDepth {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(max_levels)
            .map(|(price, bucket)| self.aggregate(*price, bucket))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(max_levels)
            .map(|(price, bucket)| self.aggregate(*price, bucket))
            .collect();
        MarketDepth::new(bids, asks)
    }

    fn clear(&mut self) {
        for (_, index) in self.directory.drain() {
            self.arena.release(index);
        }
        self.bids.clear();
        self.asks.clear();
    }

    fn len(&self) -> usize {
        self.directory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderType;

    fn order(id: OrderId, price: i64, qty: u64, side: Side) -> Order {
        Order::new(id, Price::from_ticks(price), qty, side, OrderType::Limit)
    }

    fn best_price<S: Storage>(storage: &S, side: Side) -> Option<Price> {
        storage.best(side).map(|idx| storage.order(idx).price)
    }

    #[test]
    fn empty_storage() {
        let storage = IntrusiveStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.best(Side::Buy), None);
        assert_eq!(storage.best(Side::Sell), None);
    }

    #[test]
    fn insert_indexes_both_structures() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();

        assert_eq!(storage.len(), 1);
        assert!(storage.find(1).is_some());
        assert_eq!(best_price(&storage, Side::Buy), Some(Price::from_ticks(10000)));
        assert_eq!(storage.best(Side::Sell), None);
    }

    #[test]
    fn duplicate_id_is_refused() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();
        assert_eq!(
            storage.insert(order(1, 10050, 50, Side::Buy)),
            Err(OrderError::DuplicateOrder(1))
        );
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn best_follows_price_priority() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();
        storage.insert(order(2, 10050, 100, Side::Buy)).unwrap();
        storage.insert(order(3, 9950, 100, Side::Buy)).unwrap();
        storage.insert(order(4, 10100, 100, Side::Sell)).unwrap();
        storage.insert(order(5, 10080, 100, Side::Sell)).unwrap();

        assert_eq!(best_price(&storage, Side::Buy), Some(Price::from_ticks(10050)));
        assert_eq!(best_price(&storage, Side::Sell), Some(Price::from_ticks(10080)));
    }

    #[test]
    fn remove_erases_empty_level_and_updates_best() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10050, 100, Side::Buy)).unwrap();
        storage.insert(order(2, 10000, 100, Side::Buy)).unwrap();

        let removed = storage.remove(1).unwrap();
        assert_eq!(removed.order_id, 1);
        assert_eq!(removed.price, Price::from_ticks(10050));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.level_count(), 1);
        assert_eq!(best_price(&storage, Side::Buy), Some(Price::from_ticks(10000)));

        assert!(matches!(storage.remove(1), Err(OrderError::UnknownOrder(1))));
    }

    #[test]
    fn remove_releases_slot_for_reuse() {
        let mut storage = BoundedStorage::with_capacity(1);
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();
        assert_eq!(
            storage.insert(order(2, 10000, 100, Side::Buy)),
            Err(OrderError::StorageExhausted)
        );

        storage.remove(1).unwrap();
        storage.insert(order(2, 10000, 100, Side::Buy)).unwrap();
        assert_eq!(storage.arena().allocated_count(), 1);
        assert!(matches!(storage.remove(404), Err(OrderError::UnknownOrder(404))));
    }

    #[test]
    fn exhaustion_leaves_book_unchanged() {
        let mut storage = BoundedStorage::with_capacity(1);
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();
        assert_eq!(
            storage.insert(order(2, 10100, 50, Side::Sell)),
            Err(OrderError::StorageExhausted)
        );
        assert_eq!(storage.len(), 1);
        assert!(storage.find(2).is_none());
        assert_eq!(storage.best(Side::Sell), None);
    }

    #[test]
    fn orders_at_returns_fifo_snapshot() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 5, Side::Buy)).unwrap();
        storage.insert(order(2, 10000, 7, Side::Buy)).unwrap();
        storage.insert(order(3, 10000, 9, Side::Buy)).unwrap();

        let snapshot = storage.orders_at(Side::Buy, Price::from_ticks(10000));
        let ids: Vec<OrderId> = snapshot.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert!(storage.orders_at(Side::Sell, Price::from_ticks(10000)).is_empty());
    }

    #[test]
    fn depth_orders_levels_best_first() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();
        storage.insert(order(2, 9950, 150, Side::Buy)).unwrap();
        storage.insert(order(3, 9900, 200, Side::Buy)).unwrap();
        storage.insert(order(4, 10100, 100, Side::Sell)).unwrap();
        storage.insert(order(5, 10150, 150, Side::Sell)).unwrap();

        let depth = storage.depth(2);

        let bid_prices: Vec<i64> = depth.bids.iter().map(|l| l.price.ticks()).collect();
        assert_eq!(bid_prices, vec![10000, 9950]);
        let ask_prices: Vec<i64> = depth.asks.iter().map(|l| l.price.ticks()).collect();
        assert_eq!(ask_prices, vec![10100, 10150]);

        assert_eq!(depth.bids[0].total_quantity, 100);
        assert_eq!(depth.bids[0].order_count, 1);
    }

    #[test]
    fn depth_sums_remaining_not_original_quantity() {
        let mut storage = IntrusiveStorage::new();
        storage.insert(order(1, 10000, 100, Side::Buy)).unwrap();

        let idx = storage.find(1).unwrap();
        storage.order_mut(idx).filled_quantity = 40;

        let depth = storage.depth(1);
        assert_eq!(depth.bids[0].total_quantity, 60);
    }

    #[test]
    fn clear_resets_everything() {
        let mut storage = IntrusiveStorage::new();
        for i in 0..10 {
            storage
                .insert(order(i + 1, 10000 + i as i64 * 10, 100, Side::Buy))
                .unwrap();
        }
        assert_eq!(storage.len(), 10);

        storage.clear();
        assert!(storage.is_empty());
        assert_eq!(storage.level_count(), 0);
        assert_eq!(storage.best(Side::Buy), None);
        assert_eq!(storage.arena().live(), 0);
    }
}
