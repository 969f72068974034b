//! Order book stream for one market.

use clap::Parser;
use lighter_core::Topic;
use lighter_stream::driver::{self, StreamArgs};
use lighter_stream::printer::BookPrinter;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "orderbook-stream")]
#[command(about = "Stream Lighter order book updates", long_about = None)]
struct Args {
    #[command(flatten)]
    stream: StreamArgs,

    /// Also subscribe to trades
    #[arg(long, default_value_t = false)]
    with_trades: bool,

    /// Also subscribe to market stats
    #[arg(long, default_value_t = false)]
    with_stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    driver::init_logging(&args.stream.log_level);

    let mut topics = vec![Topic::OrderBook];
    if args.with_trades {
        topics.push(Topic::Trade);
    }
    if args.with_stats {
        topics.push(Topic::MarketStats);
    }

    driver::print_banner("Lighter Order Book Stream", &args.stream.config());

    let shutdown = CancellationToken::new();
    driver::setup_signal_handlers(shutdown.clone());

    let mut printer = BookPrinter::new(std::io::stdout());
    let channels = args.stream.channels(&topics);
    let result = driver::run_session(&args.stream, &channels, &mut printer, &shutdown).await;
    driver::finish(result)
}
