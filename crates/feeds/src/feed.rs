//! Market data handler seam and frame dispatch.

use crate::{FrameKind, InboundMessage, MarketEvent, OutboundMessage, ServerError};
use lighter_core::{MarketStats, OrderBook, Topic, Trade};
use tracing::{debug, info, warn};

/// Receiver for decoded market data.
///
/// Every method defaults to a no-op so handlers only implement the topics
/// they subscribe to. Control frames (`connected`, `ping`, `error`, unknown
/// types) never reach the handler.
pub trait StreamHandler {
    fn on_order_book(&mut self, _kind: FrameKind, _channel: Option<&str>, _book: &OrderBook) {}

    /// `trades` holds every entry of the frame in wire order.
    fn on_trades(&mut self, _kind: FrameKind, _channel: Option<&str>, _trades: &[Trade]) {}

    /// `stats` has one entry per market; several only on `market_stats:all`.
    fn on_market_stats(
        &mut self,
        _kind: FrameKind,
        _channel: Option<&str>,
        _stats: &[MarketStats],
    ) {
    }
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_order_book(&mut self, kind: FrameKind, channel: Option<&str>, book: &OrderBook) {
        (**self).on_order_book(kind, channel, book)
    }

    fn on_trades(&mut self, kind: FrameKind, channel: Option<&str>, trades: &[Trade]) {
        (**self).on_trades(kind, channel, trades)
    }

    fn on_market_stats(&mut self, kind: FrameKind, channel: Option<&str>, stats: &[MarketStats]) {
        (**self).on_market_stats(kind, channel, stats)
    }
}

/// Handler that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl StreamHandler for NoopHandler {}

/// Outcome of dispatching one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Frame must be answered before the next read. Nothing reached the handler.
    Reply(OutboundMessage),
    /// Market data handed to the handler.
    Delivered(Topic),
    /// Server reported an error. Logged, the session continues.
    ServerError(ServerError),
    /// Logged only.
    Ignored,
}

/// Route a decoded frame to the handler or answer it.
pub fn dispatch<H>(message: InboundMessage, handler: &mut H) -> Dispatch
where
    H: StreamHandler + ?Sized,
{
    match message {
        InboundMessage::Connected => {
            info!("Stream session established");
            Dispatch::Ignored
        }
        InboundMessage::Ping => {
            debug!("Ping received, replying with pong");
            Dispatch::Reply(OutboundMessage::Pong)
        }
        InboundMessage::Snapshot(event) => deliver(FrameKind::Snapshot, &event, handler),
        InboundMessage::Update(event) => deliver(FrameKind::Update, &event, handler),
        InboundMessage::Error(err) => {
            match (&err.code, &err.channel) {
                (Some(code), Some(channel)) => {
                    warn!("Server error {} on {}: {}", code, channel, err.message)
                }
                (Some(code), None) => warn!("Server error {}: {}", code, err.message),
                (None, Some(channel)) => warn!("Server error on {}: {}", channel, err.message),
                (None, None) => warn!("Server error: {}", err.message),
            }
            Dispatch::ServerError(err)
        }
        InboundMessage::Unknown { kind } if kind.is_empty() => {
            debug!("Ignoring frame without a type");
            Dispatch::Ignored
        }
        InboundMessage::Unknown { kind } => {
            info!("Unknown message type: {}", kind);
            Dispatch::Ignored
        }
    }
}

fn deliver<H>(kind: FrameKind, event: &MarketEvent, handler: &mut H) -> Dispatch
where
    H: StreamHandler + ?Sized,
{
    match event {
        MarketEvent::OrderBook { channel, book } => {
            handler.on_order_book(kind, channel.as_deref(), book)
        }
        MarketEvent::Trades { channel, trades } => {
            handler.on_trades(kind, channel.as_deref(), trades)
        }
        MarketEvent::MarketStats { channel, stats } => {
            handler.on_market_stats(kind, channel.as_deref(), stats)
        }
    }
    Dispatch::Delivered(event.topic())
}
