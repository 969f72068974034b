//! Local order book kept in sync from snapshots and incremental updates.

use crate::{OrderBook, PriceLevel};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while applying a frame to [`OrderBookState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("invalid size {size:?} at price {price}")]
    InvalidSize { price: String, size: String },
}

/// Bids and asks keyed by numeric price, best level first on both sides.
///
/// A frame is validated as a whole before it is applied, so a frame with a
/// bad level leaves the book untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBookState {
    /// Descending by price.
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Ascending by price.
    asks: BTreeMap<Decimal, PriceLevel>,
}

/// A parsed level. `None` removes the price.
type Change = (Decimal, Option<PriceLevel>);

impl OrderBookState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book. Zero-size levels in a snapshot are skipped.
    pub fn apply_snapshot(&mut self, book: &OrderBook) -> Result<(), BookError> {
        let bids = parse_side(&book.bids)?;
        let asks = parse_side(&book.asks)?;
        self.clear();
        merge(&mut self.bids, bids, Reverse);
        merge(&mut self.asks, asks, |price| price);
        Ok(())
    }

    /// Upsert each level. A size of `0` (in any decimal spelling) or an
    /// empty size deletes the price.
    pub fn apply_update(&mut self, book: &OrderBook) -> Result<(), BookError> {
        let bids = parse_side(&book.bids)?;
        let asks = parse_side(&book.asks)?;
        merge(&mut self.bids, bids, Reverse);
        merge(&mut self.asks, asks, |price| price);
        Ok(())
    }

    /// Highest bid.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first_key_value().map(|(_, level)| level)
    }

    /// Lowest ask.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first_key_value().map(|(_, level)| level)
    }

    /// Best bid and ask, only when both sides have liquidity.
    pub fn top_of_book(&self) -> Option<(&PriceLevel, &PriceLevel)> {
        Some((self.best_bid()?, self.best_ask()?))
    }

    /// Bids from highest to lowest price.
    pub fn bids(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Asks from lowest to highest price.
    pub fn asks(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Current book in wire order, best levels first.
    pub fn to_order_book(&self) -> OrderBook {
        OrderBook {
            bids: self.bids().cloned().collect(),
            asks: self.asks().cloned().collect(),
        }
    }
}

fn parse_side(levels: &[PriceLevel]) -> Result<Vec<Change>, BookError> {
    levels.iter().map(parse_level).collect()
}

fn parse_level(level: &PriceLevel) -> Result<Change, BookError> {
    let price = Decimal::from_str(level.price.trim())
        .map_err(|_| BookError::InvalidPrice(level.price.to_string()))?;

    let size = level.size.trim();
    if size.is_empty() {
        return Ok((price, None));
    }
    let amount = Decimal::from_str(size).map_err(|_| BookError::InvalidSize {
        price: level.price.to_string(),
        size: level.size.to_string(),
    })?;
    if amount.is_zero() {
        return Ok((price, None));
    }
    Ok((price, Some(level.clone())))
}

fn merge<K: Ord>(
    side: &mut BTreeMap<K, PriceLevel>,
    changes: Vec<Change>,
    key: impl Fn(Decimal) -> K,
) {
    for (price, level) in changes {
        match level {
            Some(level) => {
                side.insert(key(price), level);
            }
            None => {
                side.remove(&key(price));
            }
        }
    }
}
