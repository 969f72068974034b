//! Streaming market data client for the Lighter exchange.
//!
//! This crate holds one WebSocket session against the public stream
//! endpoint, subscribes to order book, trade and market stats channels and
//! hands decoded payloads to a [`StreamHandler`].
//!
//! ## Architecture
//!
//! - `manager` - Endpoint configuration and connection state
//! - `message` - Wire types (`OutboundMessage`, `InboundMessage`, `MarketEvent`)
//! - `feed` - Handler trait and frame dispatch
//! - `subscription` - Requested channel bookkeeping
//! - `websocket` - `StreamClient` read loop

pub mod error;
pub mod feed;
pub mod manager;
pub mod message;
pub mod subscription;
pub mod websocket;

pub use error::*;
pub use feed::*;
pub use manager::*;
pub use message::*;
pub use subscription::*;
pub use websocket::*;
