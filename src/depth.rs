//! Aggregated L2 market-data views.

use serde::{Deserialize, Serialize};

use crate::order::Price;

/// One aggregated price level: total remaining quantity and order count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub total_quantity: u64,
    pub order_count: u32,
}

/// Snapshot of the top of the book.
///
/// Bids are ordered best-first (descending price), asks best-first
/// (ascending price).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MarketDepth {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl MarketDepth {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }

    pub fn best_bid_price(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// Best ask minus best bid, when both sides are present.
    pub fn spread(&self) -> Option<Price> {
        Some(self.best_ask_price()? - self.best_bid_price()?)
    }

    /// Arithmetic mean of the best prices, when both sides are present.
    pub fn mid_price(&self) -> Option<f64> {
        let bid = self.best_bid_price()?;
        let ask = self.best_ask_price()?;
        Some((bid.to_f64() + ask.to_f64()) / 2.0)
    }
}
