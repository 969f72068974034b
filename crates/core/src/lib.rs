//! Shared market data types for the stream client.

pub mod book;
pub mod market;
pub mod topic;

pub use book::*;
pub use market::*;
pub use topic::*;
