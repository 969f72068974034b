//! Wire message types for the stream protocol.
//!
//! Inbound frames are JSON objects with a `type` string, an optional
//! `channel` and a topic-specific payload. They are decoded once into
//! [`InboundMessage`] so the read loop can dispatch on a closed set of
//! variants, with [`InboundMessage::Unknown`] keeping unrecognised types
//! visible instead of silently dropping them.

use crate::StreamError;
use lighter_core::{Channel, MarketStats, OrderBook, Topic, Trade};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SNAPSHOT_PREFIX: &str = "subscribed/";
const UPDATE_PREFIX: &str = "update/";

/// Outbound client requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Pong,
}

impl OutboundMessage {
    pub fn subscribe(channel: Channel) -> Self {
        OutboundMessage::Subscribe {
            channel: channel.to_string(),
        }
    }

    pub fn unsubscribe(channel: Channel) -> Self {
        OutboundMessage::Unsubscribe {
            channel: channel.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, StreamError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Whether a market frame carries full state or a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Full state sent once a subscription is accepted (`subscribed/*`).
    Snapshot,
    /// Incremental change (`update/*`).
    Update,
}

/// Decoded market data payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    OrderBook {
        channel: Option<String>,
        book: OrderBook,
    },
    Trades {
        channel: Option<String>,
        trades: Vec<Trade>,
    },
    /// One entry on a single-market channel, one per market on
    /// `market_stats:all`.
    MarketStats {
        channel: Option<String>,
        stats: Vec<MarketStats>,
    },
}

impl MarketEvent {
    pub fn topic(&self) -> Topic {
        match self {
            MarketEvent::OrderBook { .. } => Topic::OrderBook,
            MarketEvent::Trades { .. } => Topic::Trade,
            MarketEvent::MarketStats { .. } => Topic::MarketStats,
        }
    }

    /// Channel name as echoed by the server, e.g. `order_book:0`.
    pub fn channel(&self) -> Option<&str> {
        match self {
            MarketEvent::OrderBook { channel, .. }
            | MarketEvent::Trades { channel, .. }
            | MarketEvent::MarketStats { channel, .. } => channel.as_deref(),
        }
    }

    fn decode(topic: Topic, envelope: Envelope) -> Result<Self, StreamError> {
        let Envelope {
            channel,
            data,
            order_book,
            ..
        } = envelope;

        let event = match topic {
            Topic::OrderBook => MarketEvent::OrderBook {
                channel,
                book: decode_object(order_book.or(data))?,
            },
            Topic::Trade => MarketEvent::Trades {
                channel,
                trades: decode_one_or_many(data)?,
            },
            Topic::MarketStats => MarketEvent::MarketStats {
                channel,
                stats: decode_one_or_many(data)?,
            },
        };
        Ok(event)
    }
}

/// Error reported by the server. The session stays open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default = "unknown_error")]
    pub message: String,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Default for ServerError {
    fn default() -> Self {
        Self {
            code: None,
            message: unknown_error(),
            channel: None,
        }
    }
}

impl From<ServerError> for StreamError {
    fn from(err: ServerError) -> Self {
        StreamError::Application {
            code: err.code,
            message: err.message,
        }
    }
}

fn unknown_error() -> String {
    "Unknown error".to_string()
}

/// Inbound frame after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Session greeting sent right after the upgrade.
    Connected,
    /// Application-level keep-alive; must be answered with a pong.
    Ping,
    Snapshot(MarketEvent),
    Update(MarketEvent),
    Error(ServerError),
    /// Any other `type` (empty when the field is missing).
    Unknown { kind: String },
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    order_book: Option<Value>,
}

impl InboundMessage {
    /// Decode one text frame.
    ///
    /// Exact `type` matches win. A frame whose type is not recognised but
    /// whose `channel` starts with a known topic name is treated as a
    /// snapshot of that topic; everything else becomes `Unknown`.
    pub fn decode(text: &str) -> Result<Self, StreamError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        match envelope.kind.as_str() {
            "connected" => return Ok(InboundMessage::Connected),
            "ping" => return Ok(InboundMessage::Ping),
            "error" => {
                let err = decode_object::<ServerError>(envelope.data)?;
                return Ok(InboundMessage::Error(err));
            }
            _ => {}
        }

        if let Some(topic) = typed_topic(&envelope.kind, SNAPSHOT_PREFIX) {
            return Ok(InboundMessage::Snapshot(MarketEvent::decode(topic, envelope)?));
        }
        if let Some(topic) = typed_topic(&envelope.kind, UPDATE_PREFIX) {
            return Ok(InboundMessage::Update(MarketEvent::decode(topic, envelope)?));
        }

        let fallback = envelope
            .channel
            .as_deref()
            .and_then(Topic::from_channel_prefix);
        match fallback {
            Some(topic) => Ok(InboundMessage::Snapshot(MarketEvent::decode(topic, envelope)?)),
            None => Ok(InboundMessage::Unknown {
                kind: envelope.kind,
            }),
        }
    }

    /// Message type label for logs.
    pub fn label(&self) -> String {
        match self {
            InboundMessage::Connected => "connected".to_string(),
            InboundMessage::Ping => "ping".to_string(),
            InboundMessage::Snapshot(event) => format!("{}{}", SNAPSHOT_PREFIX, event.topic()),
            InboundMessage::Update(event) => format!("{}{}", UPDATE_PREFIX, event.topic()),
            InboundMessage::Error(_) => "error".to_string(),
            InboundMessage::Unknown { kind } => kind.clone(),
        }
    }
}

fn typed_topic(kind: &str, prefix: &str) -> Option<Topic> {
    kind.strip_prefix(prefix).and_then(Topic::from_wire)
}

/// Missing or null payloads decode to the type's default.
fn decode_object<T>(value: Option<Value>) -> Result<T, StreamError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Payloads that may be a single object or an array of them.
fn decode_one_or_many<T>(value: Option<Value>) -> Result<Vec<T>, StreamError>
where
    T: for<'de> Deserialize<'de>,
{
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(StreamError::from))
            .collect(),
        Some(value @ Value::Object(_)) => Ok(vec![serde_json::from_value(value)?]),
        Some(other) => Err(StreamError::Protocol(format!(
            "expected object or array payload, got {}",
            other
        ))),
    }
}
