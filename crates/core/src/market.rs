//! Market data payloads carried by stream frames.
//!
//! Prices and sizes stay as decimal strings exactly as the exchange sends
//! them; nothing here does arithmetic on them.

use crate::MarketIndex;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Single price level in an order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    #[serde(default = "zero", deserialize_with = "decimal::required")]
    pub price: CompactString,
    #[serde(default = "zero", deserialize_with = "decimal::required")]
    pub size: CompactString,
}

impl PriceLevel {
    pub fn new(price: &str, size: &str) -> Self {
        Self {
            price: CompactString::new(price),
            size: CompactString::new(size),
        }
    }
}

/// Order book sides as sent on the wire. Best levels come first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best bid and ask, only when both sides have liquidity.
    pub fn top_of_book(&self) -> Option<(&PriceLevel, &PriceLevel)> {
        Some((self.best_bid()?, self.best_ask()?))
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Aggressor side of a trade.
///
/// Sides other than `buy` and `sell` keep their raw text so they can be shown
/// as received. A missing side is `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CompactString", into = "CompactString")]
pub enum TradeSide {
    Buy,
    Sell,
    Other(CompactString),
    #[default]
    Unknown,
}

impl TradeSide {
    pub fn as_str(&self) -> &str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
            TradeSide::Other(raw) => raw,
            TradeSide::Unknown => "unknown",
        }
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

impl From<CompactString> for TradeSide {
    fn from(side: CompactString) -> Self {
        match side.as_str() {
            "buy" => TradeSide::Buy,
            "sell" => TradeSide::Sell,
            "" | "unknown" => TradeSide::Unknown,
            _ => TradeSide::Other(side),
        }
    }
}

impl From<TradeSide> for CompactString {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Other(raw) => raw,
            side => CompactString::new(side.as_str()),
        }
    }
}

/// Executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default)]
    pub side: TradeSide,
    #[serde(default = "zero", deserialize_with = "decimal::required")]
    pub price: CompactString,
    #[serde(default = "zero", deserialize_with = "decimal::required")]
    pub size: CompactString,
}

impl Trade {
    pub fn new(side: TradeSide, price: &str, size: &str) -> Self {
        Self {
            side,
            price: CompactString::new(price),
            size: CompactString::new(size),
        }
    }
}

/// Rolling market statistics. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Present on every entry of the all-markets channel.
    #[serde(default, alias = "market_id")]
    pub market_index: Option<MarketIndex>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub last_price: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub mark_price: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub index_price: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub high_24h: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub low_24h: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub volume_24h: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub quote_volume_24h: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub price_change_24h: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub price_change_pct: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub open_interest: Option<CompactString>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub funding_rate: Option<CompactString>,
    #[serde(default)]
    pub next_funding_time: Option<i64>,
}

fn zero() -> CompactString {
    CompactString::new("0")
}

/// Decimal fields are normally strings, but numeric JSON values are accepted
/// and kept in their textual form.
mod decimal {
    use compact_str::CompactString;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(CompactString),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    impl Raw {
        fn into_text(self) -> CompactString {
            match self {
                Raw::Text(text) => text,
                Raw::Unsigned(n) => compact_str::format_compact!("{}", n),
                Raw::Signed(n) => compact_str::format_compact!("{}", n),
                Raw::Float(n) => compact_str::format_compact!("{}", n),
            }
        }
    }

    pub fn required<'de, D>(deserializer: D) -> Result<CompactString, D::Error>
    where
        D: Deserializer<'de>,
    {
        Raw::deserialize(deserializer).map(Raw::into_text)
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<CompactString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Raw>::deserialize(deserializer)?.map(Raw::into_text))
    }
}
