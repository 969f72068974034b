//! Console renderers for market data.

use console::Style;
use lighter_core::{Channel, MarketStats, OrderBook, OrderBookState, PriceLevel, Trade};
use lighter_feeds::{FrameKind, StreamHandler};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

const NOT_AVAILABLE: &str = "N/A";

fn emit<W: Write>(out: &mut W, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{}", line) {
        debug!("Failed to write output: {}", e);
    }
}

fn emit_best<W: Write>(out: &mut W, bid: &PriceLevel, ask: &PriceLevel) {
    emit(
        out,
        format_args!(
            "  Best Bid: {} @ {} | Best Ask: {} @ {}",
            bid.size, bid.price, ask.size, ask.price
        ),
    );
}

/// One-line summaries of order book, trade and stats frames.
///
/// Keeps a local book per echoed channel so updates can report the merged
/// best bid and ask.
pub struct BookPrinter<W: Write> {
    out: W,
    books: HashMap<String, OrderBookState>,
}

impl<W: Write> BookPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            books: HashMap::new(),
        }
    }

    /// Local book for an echoed channel name (empty when the frame had none).
    pub fn book(&self, channel: &str) -> Option<&OrderBookState> {
        self.books.get(channel)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StreamHandler for BookPrinter<W> {
    fn on_order_book(&mut self, kind: FrameKind, channel: Option<&str>, book: &OrderBook) {
        let key = channel.unwrap_or_default();
        let state = self.books.entry(key.to_string()).or_default();

        match kind {
            FrameKind::Snapshot => {
                if let Err(e) = state.apply_snapshot(book) {
                    warn!("Order book snapshot on {} not applied: {}", key, e);
                }
                emit(
                    &mut self.out,
                    format_args!(
                        "Order Book Snapshot: {} bids, {} asks",
                        book.bids.len(),
                        book.asks.len()
                    ),
                );
                if let Some((bid, ask)) = book.top_of_book() {
                    emit_best(&mut self.out, bid, ask);
                }
            }
            FrameKind::Update => {
                emit(
                    &mut self.out,
                    format_args!(
                        "Order Book Update: {} bid updates, {} ask updates",
                        book.bids.len(),
                        book.asks.len()
                    ),
                );
                if let Err(e) = state.apply_update(book) {
                    warn!("Order book update on {} not applied: {}", key, e);
                    return;
                }
                if let Some((bid, ask)) = state.top_of_book() {
                    emit_best(&mut self.out, bid, ask);
                }
            }
        }
    }

    fn on_trades(&mut self, _kind: FrameKind, _channel: Option<&str>, trades: &[Trade]) {
        for trade in trades {
            emit(
                &mut self.out,
                format_args!(
                    "Trade: {} @ {} ({})",
                    trade.size,
                    trade.price,
                    trade.side.as_str()
                ),
            );
        }
    }

    fn on_market_stats(&mut self, _kind: FrameKind, _channel: Option<&str>, stats: &[MarketStats]) {
        for entry in stats {
            emit(
                &mut self.out,
                format_args!(
                    "Market Stats: Last: {} Mark: {} 24h Vol: {}",
                    or_na(&entry.last_price),
                    or_na(&entry.mark_price),
                    or_na(&entry.volume_24h)
                ),
            );
        }
    }
}

fn or_na<S: AsRef<str>>(value: &Option<S>) -> &str {
    value.as_ref().map_or(NOT_AVAILABLE, |text| text.as_ref())
}

/// Multi-line block per market, one per entry of a stats frame.
pub struct StatsPrinter<W: Write> {
    out: W,
}

impl<W: Write> StatsPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn block(&mut self, market: &str, stats: &MarketStats) {
        let change = match &stats.price_change_pct {
            Some(pct) => format!("{}%", pct),
            None => NOT_AVAILABLE.to_string(),
        };
        let out = &mut self.out;
        emit(out, format_args!("Market {}:", market));
        emit(out, format_args!("  Last Price:    {}", or_na(&stats.last_price)));
        emit(out, format_args!("  Mark Price:    {}", or_na(&stats.mark_price)));
        emit(out, format_args!("  Index Price:   {}", or_na(&stats.index_price)));
        emit(out, format_args!("  24h High:      {}", or_na(&stats.high_24h)));
        emit(out, format_args!("  24h Low:       {}", or_na(&stats.low_24h)));
        emit(out, format_args!("  24h Volume:    {}", or_na(&stats.volume_24h)));
        emit(out, format_args!("  24h Change:    {}", change));
        emit(out, format_args!("  Open Interest: {}", or_na(&stats.open_interest)));
        emit(out, format_args!("  Funding Rate:  {}", or_na(&stats.funding_rate)));
        emit(out, format_args!(""));
    }
}

impl<W: Write> StreamHandler for StatsPrinter<W> {
    fn on_market_stats(&mut self, _kind: FrameKind, channel: Option<&str>, stats: &[MarketStats]) {
        // Single-market frames may omit the index; the echoed channel names it.
        let echoed = channel
            .and_then(|name| name.parse::<Channel>().ok())
            .and_then(|channel| channel.target.market());

        for entry in stats {
            let market = match entry.market_index.or(echoed) {
                Some(market) => market.to_string(),
                None => "?".to_string(),
            };
            self.block(&market, entry);
        }
    }
}

/// Fixed-width trade table, buys in green and everything else in red.
pub struct TradeTablePrinter<W: Write> {
    out: W,
    colored: bool,
}

impl<W: Write> TradeTablePrinter<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self { out, colored }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self) {
        emit(
            &mut self.out,
            format_args!("{:>10}{:>15}{:>15}", "Side", "Price", "Size"),
        );
        emit(&mut self.out, format_args!("{}", "-".repeat(40)));
    }

    fn row(&mut self, trade: &Trade) {
        let line = format!(
            "{:>10}{:>15}{:>15}",
            trade.side.as_str(),
            trade.price,
            trade.size
        );
        if !self.colored {
            emit(&mut self.out, format_args!("{}", line));
            return;
        }

        let style = if trade.side.is_buy() {
            Style::new().green()
        } else {
            Style::new().red()
        };
        emit(
            &mut self.out,
            format_args!("{}", style.force_styling(true).apply_to(line)),
        );
    }
}

impl<W: Write> StreamHandler for TradeTablePrinter<W> {
    fn on_trades(&mut self, kind: FrameKind, _channel: Option<&str>, trades: &[Trade]) {
        if kind == FrameKind::Snapshot {
            emit(
                &mut self.out,
                format_args!("Trade snapshot: {} recent trades", trades.len()),
            );
            self.header();
        }
        for trade in trades {
            self.row(trade);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lighter_core::{MarketIndex, TradeSide};
    use pretty_assertions::assert_eq;

    fn lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn book(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> OrderBook {
        OrderBook {
            bids: bids.iter().map(|(p, s)| PriceLevel::new(p, s)).collect(),
            asks: asks.iter().map(|(p, s)| PriceLevel::new(p, s)).collect(),
        }
    }

    #[test]
    fn test_order_book_snapshot_summary() {
        let mut printer = BookPrinter::new(Vec::new());
        let snapshot = book(
            &[("1999.5", "3.1"), ("1999.0", "1")],
            &[("2000.0", "0.4"), ("2000.5", "2"), ("2001", "7")],
        );
        printer.on_order_book(FrameKind::Snapshot, Some("order_book:0"), &snapshot);

        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Order Book Snapshot: 2 bids, 3 asks",
                "  Best Bid: 3.1 @ 1999.5 | Best Ask: 0.4 @ 2000.0",
            ]
        );
    }

    #[test]
    fn test_one_sided_snapshot_has_no_best_line() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_order_book(FrameKind::Snapshot, None, &book(&[("1", "1")], &[]));
        assert_eq!(
            lines(printer.into_inner()),
            vec!["Order Book Snapshot: 1 bids, 0 asks"]
        );
    }

    #[test]
    fn test_order_book_update_counts() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_order_book(
            FrameKind::Update,
            None,
            &book(&[("1", "0")], &[("2", "1"), ("3", "0")]),
        );
        assert_eq!(
            lines(printer.into_inner()),
            vec!["Order Book Update: 1 bid updates, 2 ask updates"]
        );
    }

    #[test]
    fn test_update_prints_merged_best_levels() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_order_book(
            FrameKind::Snapshot,
            Some("order_book:0"),
            &book(&[("1999.5", "3"), ("1999", "1")], &[("2000", "0.4"), ("2001", "2")]),
        );
        printer.on_order_book(
            FrameKind::Update,
            Some("order_book:0"),
            &book(&[("1999.5", "0"), ("1999.75", "2")], &[("2000", "0")]),
        );

        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Order Book Snapshot: 2 bids, 2 asks",
                "  Best Bid: 3 @ 1999.5 | Best Ask: 0.4 @ 2000",
                "Order Book Update: 2 bid updates, 1 ask updates",
                "  Best Bid: 2 @ 1999.75 | Best Ask: 2 @ 2001",
            ]
        );
    }

    #[test]
    fn test_books_are_kept_per_channel() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_order_book(
            FrameKind::Snapshot,
            Some("order_book:0"),
            &book(&[("100", "1")], &[("101", "1")]),
        );
        printer.on_order_book(
            FrameKind::Snapshot,
            Some("order_book:1"),
            &book(&[("5", "1")], &[("6", "1")]),
        );
        printer.on_order_book(
            FrameKind::Update,
            Some("order_book:1"),
            &book(&[("5.5", "2")], &[]),
        );

        let first = printer.book("order_book:0").unwrap();
        assert_eq!(first.best_bid(), Some(&PriceLevel::new("100", "1")));
        let second = printer.book("order_book:1").unwrap();
        assert_eq!(second.best_bid(), Some(&PriceLevel::new("5.5", "2")));
        assert_eq!(second.depth(), (2, 1));
    }

    #[test]
    fn test_invalid_update_skips_best_line() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_order_book(
            FrameKind::Snapshot,
            None,
            &book(&[("100", "1")], &[("101", "1")]),
        );
        printer.on_order_book(FrameKind::Update, None, &book(&[("bad", "1")], &[]));

        let best = printer.book("").unwrap().best_bid().cloned();
        assert_eq!(best, Some(PriceLevel::new("100", "1")));
        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Order Book Snapshot: 1 bids, 1 asks",
                "  Best Bid: 1 @ 100 | Best Ask: 1 @ 101",
                "Order Book Update: 1 bid updates, 0 ask updates",
            ]
        );
    }

    #[test]
    fn test_trade_and_stats_lines() {
        let mut printer = BookPrinter::new(Vec::new());
        printer.on_trades(
            FrameKind::Update,
            None,
            &[
                Trade::new(TradeSide::Buy, "2000.5", "1.2"),
                Trade::new(TradeSide::Unknown, "0", "0"),
                Trade::new(TradeSide::Other("liquidation".into()), "1999", "3"),
            ],
        );
        let stats = MarketStats {
            last_price: Some("2000.1".into()),
            mark_price: Some("2000.0".into()),
            ..Default::default()
        };
        printer.on_market_stats(FrameKind::Update, None, &[stats]);

        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Trade: 1.2 @ 2000.5 (buy)",
                "Trade: 0 @ 0 (unknown)",
                "Trade: 3 @ 1999 (liquidation)",
                "Market Stats: Last: 2000.1 Mark: 2000.0 24h Vol: N/A",
            ]
        );
    }

    #[test]
    fn test_trade_table_snapshot() {
        let mut printer = TradeTablePrinter::new(Vec::new(), false);
        printer.on_trades(
            FrameKind::Snapshot,
            Some("trade:0"),
            &[
                Trade::new(TradeSide::Buy, "2000.5", "1.2"),
                Trade::new(TradeSide::Sell, "2001.0", "0.5"),
            ],
        );

        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Trade snapshot: 2 recent trades".to_string(),
                "      Side          Price           Size".to_string(),
                "-".repeat(40),
                "       buy         2000.5            1.2".to_string(),
                "      sell         2001.0            0.5".to_string(),
            ]
        );
    }

    #[test]
    fn test_trade_table_update_has_one_line_per_trade() {
        let mut printer = TradeTablePrinter::new(Vec::new(), false);
        let trades: Vec<Trade> = ["1", "2", "3", "4"]
            .iter()
            .map(|price| Trade::new(TradeSide::Sell, price, "1"))
            .collect();
        printer.on_trades(FrameKind::Update, None, &trades);

        let out = lines(printer.into_inner());
        assert_eq!(out.len(), 4);
        assert!(out[0].ends_with("1              1"));
        assert!(out[3].ends_with("4              1"));
    }

    #[test]
    fn test_trade_table_colors() {
        let mut printer = TradeTablePrinter::new(Vec::new(), true);
        printer.on_trades(
            FrameKind::Update,
            None,
            &[
                Trade::new(TradeSide::Buy, "1", "1"),
                Trade::new(TradeSide::Sell, "1", "1"),
                Trade::new(TradeSide::Unknown, "1", "1"),
                Trade::new(TradeSide::Other("adl".into()), "1", "1"),
            ],
        );

        let out = lines(printer.into_inner());
        assert!(out[0].starts_with("\u{1b}[32m"));
        assert!(out[1].starts_with("\u{1b}[31m"));
        assert!(out[2].starts_with("\u{1b}[31m"));
        assert!(out[3].starts_with("\u{1b}[31m"));
        assert!(out[3].contains("       adl"));
        assert!(out.iter().all(|line| line.ends_with("\u{1b}[0m")));
    }

    #[test]
    fn test_trade_table_ignores_other_topics() {
        let mut printer = TradeTablePrinter::new(Vec::new(), false);
        printer.on_order_book(FrameKind::Snapshot, None, &book(&[("1", "1")], &[("2", "1")]));
        printer.on_market_stats(FrameKind::Update, None, &[MarketStats::default()]);
        assert!(printer.into_inner().is_empty());
    }

    #[test]
    fn test_trade_table_shows_raw_side() {
        let mut printer = TradeTablePrinter::new(Vec::new(), false);
        printer.on_trades(
            FrameKind::Update,
            None,
            &[Trade::new(TradeSide::Other("liquidation".into()), "2000", "1")],
        );
        assert_eq!(
            lines(printer.into_inner()),
            vec!["liquidation           2000              1"]
        );
    }

    #[test]
    fn test_stats_block_per_market() {
        let mut printer = StatsPrinter::new(Vec::new());
        let stats = [
            MarketStats {
                market_index: Some(MarketIndex(0)),
                last_price: Some("2000.1".into()),
                mark_price: Some("2000.0".into()),
                index_price: Some("1999.9".into()),
                high_24h: Some("2100".into()),
                low_24h: Some("1900".into()),
                volume_24h: Some("12345.6".into()),
                price_change_pct: Some("-1.25".into()),
                open_interest: Some("500".into()),
                funding_rate: Some("0.0001".into()),
                ..Default::default()
            },
            MarketStats {
                market_index: Some(MarketIndex(1)),
                last_price: Some("65000".into()),
                ..Default::default()
            },
        ];
        printer.on_market_stats(FrameKind::Update, Some("market_stats:all"), &stats);

        assert_eq!(
            lines(printer.into_inner()),
            vec![
                "Market 0:",
                "  Last Price:    2000.1",
                "  Mark Price:    2000.0",
                "  Index Price:   1999.9",
                "  24h High:      2100",
                "  24h Low:       1900",
                "  24h Volume:    12345.6",
                "  24h Change:    -1.25%",
                "  Open Interest: 500",
                "  Funding Rate:  0.0001",
                "",
                "Market 1:",
                "  Last Price:    65000",
                "  Mark Price:    N/A",
                "  Index Price:   N/A",
                "  24h High:      N/A",
                "  24h Low:       N/A",
                "  24h Volume:    N/A",
                "  24h Change:    N/A",
                "  Open Interest: N/A",
                "  Funding Rate:  N/A",
                "",
            ]
        );
    }

    #[test]
    fn test_stats_market_falls_back_to_channel() {
        let mut printer = StatsPrinter::new(Vec::new());
        printer.on_market_stats(
            FrameKind::Snapshot,
            Some("market_stats:7"),
            &[MarketStats::default()],
        );
        printer.on_market_stats(FrameKind::Update, None, &[MarketStats::default()]);

        let out = lines(printer.into_inner());
        assert_eq!(out[0], "Market 7:");
        assert_eq!(out[11], "Market ?:");
    }
}
