//! Stream topics, market identifiers and channel names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Public data topic that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    OrderBook,
    Trade,
    MarketStats,
}

impl Topic {
    /// All topics, in wire-name matching order.
    pub const ALL: [Topic; 3] = [Topic::OrderBook, Topic::Trade, Topic::MarketStats];

    /// Wire name used in channel strings and message types.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::OrderBook => "order_book",
            Topic::Trade => "trade",
            Topic::MarketStats => "market_stats",
        }
    }

    /// Exact lookup by wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.as_str() == name)
    }

    /// Topic whose wire name prefixes `channel`, e.g. `trade:0` -> `Trade`.
    pub fn from_channel_prefix(channel: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|topic| channel.starts_with(topic.as_str()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| ChannelParseError::UnknownTopic(s.to_string()))
    }
}

/// Integer identifier of a tradable instrument (0 = ETH-USD on mainnet).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MarketIndex(pub u16);

impl MarketIndex {
    #[inline]
    pub fn id(self) -> u16 {
        self.0
    }
}

impl From<u16> for MarketIndex {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for MarketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MarketIndex {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map(MarketIndex)
            .map_err(|_| ChannelParseError::InvalidMarket(s.to_string()))
    }
}

/// Which markets a channel covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    Market(MarketIndex),
    /// Every market at once. Only `market_stats` is served this way.
    All,
}

impl ChannelTarget {
    pub fn market(self) -> Option<MarketIndex> {
        match self {
            ChannelTarget::Market(market) => Some(market),
            ChannelTarget::All => None,
        }
    }
}

impl From<MarketIndex> for ChannelTarget {
    fn from(market: MarketIndex) -> Self {
        ChannelTarget::Market(market)
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::Market(market) => write!(f, "{}", market),
            ChannelTarget::All => f.write_str("all"),
        }
    }
}

impl FromStr for ChannelTarget {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "all" {
            return Ok(ChannelTarget::All);
        }
        s.parse().map(ChannelTarget::Market)
    }
}

/// A subscription channel: topic plus market, e.g. `trade/0` or
/// `market_stats/all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    pub topic: Topic,
    pub target: ChannelTarget,
}

impl Channel {
    pub fn new(topic: Topic, market: MarketIndex) -> Self {
        Self {
            topic,
            target: ChannelTarget::Market(market),
        }
    }

    /// Channel covering every market, e.g. `market_stats/all`.
    pub fn all(topic: Topic) -> Self {
        Self {
            topic,
            target: ChannelTarget::All,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.target)
    }
}

/// Parses both the outbound form (`trade/0`) and the form the server echoes
/// back on data frames (`trade:0`).
impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (topic, target) = s
            .split_once(['/', ':'])
            .ok_or_else(|| ChannelParseError::MissingSeparator(s.to_string()))?;
        Ok(Self {
            topic: topic.parse()?,
            target: target.parse()?,
        })
    }
}

/// Errors produced while parsing topics, markets or channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelParseError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("invalid market index: {0}")]
    InvalidMarket(String),

    #[error("channel has no topic/market separator: {0}")]
    MissingSeparator(String),
}
