//! Order record and market primitives.
//!
//! The order record is sized and aligned to a single cache line so that the
//! matching loop touches exactly one line per resting order. Linkage into a
//! price bucket lives inside the record (intrusive FIFO), as 32-bit slot
//! indices rather than pointers.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::slab::{SlotIndex, NIL};

/// Unique order identifier. Live orders never carry id 0.
pub type OrderId = u64;

/// Unique trade identifier.
pub type TradeId = u64;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Returns the side an incoming order matches against.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type: limit orders may rest, market orders never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    #[default]
    Limit = 0,
    Market = 1,
}

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    New = 0,
    PartiallyFilled = 1,
    Filled = 2,
    Cancelled = 3,
}

/// Fixed-point price in minimum tick units.
///
/// One tick is 0.01, so `Price(10050)` is 100.50. All book ordering and
/// equality is integer comparison on the tick count; floating point appears
/// only at the conversion boundary.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Price(i64);

impl Price {
    /// Ticks per whole currency unit (tick size 0.01).
    pub const TICKS_PER_UNIT: i64 = 100;

    pub const ZERO: Price = Price(0);

    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Price(ticks)
    }

    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Converts a boundary floating-point price, rejecting non-finite input.
    #[inline]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Price((value * Self::TICKS_PER_UNIT as f64).round() as i64))
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::TICKS_PER_UNIT as f64
    }
}

impl TryFrom<f64> for Price {
    type Error = crate::error::OrderError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Price::from_f64(value).ok_or(crate::error::OrderError::MalformedPrice)
    }
}

impl std::ops::Add for Price {
    type Output = Price;

    #[inline]
    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Price {
    type Output = Price;

    #[inline]
    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

/// A resting or incoming order - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field           | Type  | Offset | Size |
/// |-----------------|-------|--------|------|
/// | order_id        | u64   | 0      | 8    |
/// | timestamp_ns    | u64   | 8      | 8    |
/// | price           | i64   | 16     | 8    |
/// | quantity        | u64   | 24     | 8    |
/// | filled_quantity | u64   | 32     | 8    |
/// | prev            | u32   | 40     | 4    |
/// | next            | u32   | 44     | 4    |
/// | side            | u8    | 48     | 1    |
/// | kind            | u8    | 49     | 1    |
/// | status          | u8    | 50     | 1    |
/// | (padding)       | -     | 51     | 13   |
#[repr(C, align(64))]
#[derive(Clone, Copy, Debug)]
pub struct Order {
    pub order_id: OrderId,
    /// Wall-clock stamp taken at creation. Informational: FIFO position in
    /// the price bucket, not this stamp, decides priority between equal
    /// prices.
    pub timestamp_ns: u64,
    pub price: Price,
    /// Original quantity, always > 0 for a live order.
    pub quantity: u64,
    pub filled_quantity: u64,
    /// Slot index of the previous order in the same price bucket.
    pub(crate) prev: SlotIndex,
    /// Slot index of the next order in the same price bucket.
    pub(crate) next: SlotIndex,
    pub side: Side,
    pub kind: OrderType,
    pub status: OrderStatus,
}

const _: () = assert!(
    std::mem::size_of::<Order>() == 64,
    "Order must be exactly 64 bytes (one cache line)"
);

const _: () = assert!(
    std::mem::align_of::<Order>() == 64,
    "Order must be 64-byte aligned"
);

impl Order {
    /// Creates a new order stamped with the current wall clock.
    #[inline]
    pub fn new(order_id: OrderId, price: Price, quantity: u64, side: Side, kind: OrderType) -> Self {
        Self {
            order_id,
            timestamp_ns: timestamp_ns(),
            price,
            quantity,
            filled_quantity: 0,
            prev: NIL,
            next: NIL,
            side,
            kind,
            status: OrderStatus::New,
        }
    }

    /// An empty record for unoccupied slab slots.
    #[inline]
    pub(crate) const fn vacant() -> Self {
        Self {
            order_id: 0,
            timestamp_ns: 0,
            price: Price::ZERO,
            quantity: 0,
            filled_quantity: 0,
            prev: NIL,
            next: NIL,
            side: Side::Buy,
            kind: OrderType::Limit,
            status: OrderStatus::New,
        }
    }

    /// Unfilled quantity.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.quantity - self.filled_quantity
    }

    #[inline]
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    /// Whether two orders on opposite sides cross on price.
    #[inline]
    pub fn can_match_with(&self, other: &Order) -> bool {
        if self.side == other.side {
            return false;
        }
        match self.side {
            Side::Buy => self.price >= other.price,
            Side::Sell => self.price <= other.price,
        }
    }
}

/// An executed fill. Immutable once emitted.
///
/// `price` is the resting (maker) order's price at the time of the fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: u64,
    pub timestamp_ns: u64,
}

impl Trade {
    #[inline]
    pub fn new(
        trade_id: TradeId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: u64,
    ) -> Self {
        Self {
            trade_id,
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp_ns: timestamp_ns(),
        }
    }
}

/// Nanoseconds since the Unix epoch.
#[inline]
pub(crate) fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
