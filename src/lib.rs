//! # Matchbook
//!
//! A single-symbol, in-process limit order book and price-time matching
//! engine.
//!
//! ## Design Principles
//!
//! - **Price-time priority**: better price wins; within a price, earlier
//!   arrival wins (bucket FIFO position, never timestamps)
//! - **O(1) mutation**: insert, cancel and fill removal are constant time
//!   via intrusive links and an order-id directory
//! - **Cache-optimized**: 64-byte aligned order records, 32-bit slot
//!   indices, slab allocation with a lock-free free list
//! - **One lock**: every public operation serializes on a spinlock with
//!   exponential backoff; id and statistics counters stay lock-free
//!
//! ## Architecture
//!
//! ```text
//! submit/cancel/modify --> [OrderBook facade] --> [Matcher] --> trades
//!                                |                    |
//!                          [BookStorage]  <-----------+
//!                          bids/asks maps + directory + slot arena
//! ```
//!
//! Event streams fan out to consumers through the bounded SPSC [`ring`].

pub mod book;
pub mod depth;
pub mod error;
pub mod level;
pub mod matching;
pub mod order;
pub mod ring;
pub mod slab;
pub mod storage;
pub mod sync;

// Re-exports for convenience
pub use book::{BoundedOrderBook, NewOrder, OrderBook};
pub use depth::{MarketDepth, PriceLevel};
pub use error::OrderError;
pub use matching::{MatchResult, Matcher};
pub use order::{Order, OrderId, OrderStatus, OrderType, Price, Side, Trade, TradeId};
pub use ring::{ring, Consumer, Producer};
pub use slab::{FixedSlab, GrowingSlab, SlotArena, SlotIndex, NIL};
pub use storage::{BookStorage, BoundedStorage, IntrusiveStorage, Storage};
pub use sync::{SpinGuard, SpinLock};
