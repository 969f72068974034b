//! Trade tape for one market.

use clap::Parser;
use lighter_core::Topic;
use lighter_stream::driver::{self, StreamArgs};
use lighter_stream::printer::TradeTablePrinter;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "trade-stream")]
#[command(about = "Stream Lighter trades as a colored table", long_about = None)]
struct Args {
    #[command(flatten)]
    stream: StreamArgs,

    /// Disable ANSI colors
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    driver::init_logging(&args.stream.log_level);

    driver::print_banner("Lighter Trade Stream", &args.stream.config());
    println!("Waiting for trades...");
    println!();

    let shutdown = CancellationToken::new();
    driver::setup_signal_handlers(shutdown.clone());

    let colored = !args.no_color && console::colors_enabled();
    let mut printer = TradeTablePrinter::new(std::io::stdout(), colored);
    let channels = args.stream.channels(&[Topic::Trade]);
    let result = driver::run_session(&args.stream, &channels, &mut printer, &shutdown).await;
    driver::finish(result)
}
