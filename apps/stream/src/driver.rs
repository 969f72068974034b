//! Shared startup, session and shutdown logic for the stream binaries.

use clap::Args;
use lighter_core::{Channel, MarketIndex, Topic};
use lighter_feeds::{
    StopReason, StreamClient, StreamConfig, StreamError, StreamHandler, DEFAULT_HOST,
    DEFAULT_PATH, DEFAULT_PORT, DEFAULT_READ_TIMEOUT_SECS,
};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Connection flags common to every binary.
#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    /// Market index to stream (0 = ETH-USD)
    #[arg(default_value_t = 0)]
    pub market: u16,

    /// Stream host
    #[arg(long, env = "LIGHTER_WS_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Stream port
    #[arg(long, env = "LIGHTER_WS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Endpoint path
    #[arg(long, default_value = DEFAULT_PATH)]
    pub path: String,

    /// Use plain ws:// instead of wss://
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    /// Seconds without a frame before giving up (0 disables)
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    pub read_timeout: u64,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl StreamArgs {
    pub fn market_index(&self) -> MarketIndex {
        MarketIndex(self.market)
    }

    /// One channel per topic on the configured market.
    pub fn channels(&self, topics: &[Topic]) -> Vec<Channel> {
        topics
            .iter()
            .map(|&topic| Channel::new(topic, self.market_index()))
            .collect()
    }

    pub fn config(&self) -> StreamConfig {
        let config = if self.insecure {
            StreamConfig::insecure(self.host.clone(), self.port)
        } else {
            StreamConfig::new(self.host.clone()).with_port(self.port)
        };
        let read_timeout = (self.read_timeout > 0).then(|| Duration::from_secs(self.read_timeout));
        config
            .with_path(self.path.clone())
            .with_read_timeout(read_timeout)
    }
}

/// How a session that got past startup ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// SIGINT or SIGTERM.
    Shutdown,
    /// Server sent a close frame.
    PeerClosed,
    /// Socket failure or read timeout.
    Lost(StreamError),
}

/// Install the log subscriber. Logs go to stderr so stdout carries only
/// market data.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Cancel `shutdown` on SIGINT, and on SIGTERM where supported.
pub fn setup_signal_handlers(shutdown: CancellationToken) {
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install SIGINT handler: {}", e);
            return;
        }
        info!("Received SIGINT");
        on_interrupt.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("Received SIGTERM");
                    shutdown.cancel();
                }
                Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
            }
        });
    }
}

/// Connect, subscribe to `channels` in order and stream into `handler` until
/// shutdown or the session ends.
///
/// Errors are startup failures only. Anything that ends an established
/// session is reported through [`SessionEnd`].
pub async fn run_session<H>(
    args: &StreamArgs,
    channels: &[Channel],
    handler: &mut H,
    shutdown: &CancellationToken,
) -> Result<SessionEnd, StreamError>
where
    H: StreamHandler + ?Sized,
{
    let mut client = StreamClient::new(args.config());
    client.connect().await?;

    for &channel in channels {
        if let Err(e) = client.subscribe_channel(channel).await {
            client.close().await;
            return Err(e);
        }
    }

    let end = match client.run(handler, shutdown).await {
        Ok(StopReason::Cancelled) => {
            info!("Shutting down...");
            SessionEnd::Shutdown
        }
        Ok(StopReason::PeerClosed) => SessionEnd::PeerClosed,
        Err(e) => {
            warn!("Stream ended: {}", e);
            SessionEnd::Lost(e)
        }
    };

    client.close().await;
    Ok(end)
}

/// Map a session result to the process exit status.
pub fn finish(result: Result<SessionEnd, StreamError>) -> ExitCode {
    match result {
        Ok(end) => {
            info!("Session ended: {:?}", end);
            println!("Disconnected");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Startup banner shared by the binaries.
pub fn print_banner(title: &str, config: &StreamConfig) {
    println!("{}", title);
    println!("Connecting to {}", config.display_url());
    println!("Press Ctrl+C to exit");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lighter_feeds::NoopHandler;
    use pretty_assertions::assert_eq;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        stream: StreamArgs,
    }

    fn parse(args: &[&str]) -> StreamArgs {
        let mut argv = vec!["test"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().stream
    }

    #[test]
    fn test_defaults_target_mainnet() {
        let args = parse(&["--host", DEFAULT_HOST]);
        assert_eq!(args.market_index(), MarketIndex(0));

        let config = args.config();
        assert_eq!(config.port, 443);
        assert!(config.secure);
        assert_eq!(
            config.url().unwrap().as_str(),
            "wss://mainnet.zklighter.elliot.ai/stream"
        );
        assert_eq!(
            config.read_timeout,
            Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_local_overrides() {
        let args = parse(&[
            "3",
            "--host",
            "127.0.0.1",
            "--port",
            "9001",
            "--insecure",
            "--read-timeout",
            "0",
            "--path",
            "/ws",
        ]);
        assert_eq!(args.market_index(), MarketIndex(3));

        let config = args.config();
        assert_eq!(config.url().unwrap().as_str(), "ws://127.0.0.1:9001/ws");
        assert_eq!(config.read_timeout, None);
    }

    #[test]
    fn test_channels_use_selected_market() {
        let args = parse(&["5"]);
        let names: Vec<String> = args
            .channels(&[Topic::OrderBook, Topic::Trade])
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["order_book/5", "trade/5"]);
    }

    #[test]
    fn test_rejects_negative_market() {
        assert!(Cli::try_parse_from(["test", "--", "-1"]).is_err());
        assert!(Cli::try_parse_from(["test", "eth"]).is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_startup_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let port = port.to_string();
        let args = parse(&["--host", "127.0.0.1", "--port", &port, "--insecure"]);
        let result = run_session(
            &args,
            &args.channels(&[Topic::OrderBook]),
            &mut NoopHandler,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StreamError::Connection(_))));
    }
}
