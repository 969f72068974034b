//! Market statistics for one market, or every market with `--all`.

use clap::Parser;
use lighter_core::{Channel, Topic};
use lighter_stream::driver::{self, StreamArgs};
use lighter_stream::printer::StatsPrinter;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "market-stats-stream")]
#[command(about = "Stream Lighter market statistics", long_about = None)]
struct Args {
    #[command(flatten)]
    stream: StreamArgs,

    /// Subscribe to every market at once (market_stats/all)
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    driver::init_logging(&args.stream.log_level);

    let channels = if args.all {
        vec![Channel::all(Topic::MarketStats)]
    } else {
        args.stream.channels(&[Topic::MarketStats])
    };

    driver::print_banner("Lighter Market Stats Stream", &args.stream.config());
    println!("Waiting for updates...");
    println!();

    let shutdown = CancellationToken::new();
    driver::setup_signal_handlers(shutdown.clone());

    let mut printer = StatsPrinter::new(std::io::stdout());
    let result = driver::run_session(&args.stream, &channels, &mut printer, &shutdown).await;
    driver::finish(result)
}
