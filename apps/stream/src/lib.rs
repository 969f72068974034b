//! Console programs for the Lighter public stream.
//!
//! - `orderbook-stream` - order book summaries, optionally with trades and stats
//! - `trade-stream` - colored trade table

pub mod driver;
pub mod printer;
