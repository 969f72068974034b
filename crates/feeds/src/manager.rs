//! Connection configuration and lifecycle state.

use crate::StreamError;
use std::time::Duration;
use url::Url;

/// Mainnet stream host.
pub const DEFAULT_HOST: &str = "mainnet.zklighter.elliot.ai";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_PATH: &str = "/stream";
pub const DEFAULT_USER_AGENT: &str = "lighter-rust-client/1.0";
/// The server pings roughly every minute, so a silent socket for longer than
/// this is treated as dead.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection state of a stream session.
///
/// `Disconnected -> Connecting -> Connected -> Streaming -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// At least one subscription has been sent.
    Streaming,
    Closed,
}

impl ConnectionState {
    /// Transition to connecting state.
    pub fn connect(self) -> Self {
        ConnectionState::Connecting
    }

    /// Transition to connected state.
    pub fn connected(self) -> Self {
        ConnectionState::Connected
    }

    /// First subscription moves a connected session to streaming.
    pub fn streaming(self) -> Self {
        match self {
            ConnectionState::Connected | ConnectionState::Streaming => ConnectionState::Streaming,
            other => other,
        }
    }

    /// Failed connect attempt.
    pub fn disconnect(self) -> Self {
        ConnectionState::Disconnected
    }

    /// Terminal state, reachable from anywhere.
    pub fn close(self) -> Self {
        ConnectionState::Closed
    }

    /// Check if a session is open for reads and writes.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Streaming)
    }
}

/// Connection target and transport settings. Immutable once handed to a client.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// `wss` when true, plain `ws` otherwise.
    pub secure: bool,
    /// Sent as the `User-Agent` header of the upgrade request.
    pub user_agent: String,
    /// Maximum silence between frames before the read loop gives up.
    pub read_timeout: Option<Duration>,
    /// Bound on TCP connect + TLS + upgrade.
    pub connect_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            secure: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            read_timeout: Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)),
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
        }
    }
}

impl StreamConfig {
    /// Config for the given host with every other setting at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Plain-text `ws://` config, for local endpoints.
    pub fn insecure(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// `None` disables the read timeout.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Full endpoint URL, e.g. `wss://mainnet.zklighter.elliot.ai:443/stream`.
    pub fn url(&self) -> Result<Url, StreamError> {
        self.validate()?;
        let url = Url::parse(&format!(
            "{}://{}:{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.path
        ))?;
        Ok(url)
    }

    /// Display form without the port, as printed in startup banners.
    pub fn display_url(&self) -> String {
        format!("{}://{}{}", self.scheme(), self.host, self.path)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.host.trim().is_empty() {
            return Err(StreamError::Connection("host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(StreamError::Connection("port cannot be 0".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(StreamError::Connection(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_state_transitions() {
        let state = ConnectionState::Disconnected;
        let state = state.connect();
        assert_eq!(state, ConnectionState::Connecting);
        assert!(!state.is_open());

        let state = state.connected();
        assert!(state.is_open());

        let state = state.streaming();
        assert_eq!(state, ConnectionState::Streaming);
        assert!(state.is_open());

        let state = state.close();
        assert_eq!(state, ConnectionState::Closed);
        assert!(!state.is_open());
    }

    #[test]
    fn test_streaming_requires_open_session() {
        assert_eq!(
            ConnectionState::Disconnected.streaming(),
            ConnectionState::Disconnected
        );
        assert_eq!(ConnectionState::Closed.streaming(), ConnectionState::Closed);
    }

    #[test]
    fn test_failed_connect_returns_to_disconnected() {
        let state = ConnectionState::Disconnected.connect().disconnect();
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 443);
        assert_eq!(config.path, "/stream");
        assert!(config.secure);
        assert_eq!(
            config.read_timeout,
            Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_config_url() {
        let config = StreamConfig::new("testnet.zklighter.elliot.ai");
        assert_eq!(
            config.url().unwrap().as_str(),
            "wss://testnet.zklighter.elliot.ai/stream"
        );
        assert_eq!(
            config.display_url(),
            "wss://testnet.zklighter.elliot.ai/stream"
        );

        let local = StreamConfig::insecure("127.0.0.1", 9001).with_path("/ws");
        assert_eq!(local.url().unwrap().as_str(), "ws://127.0.0.1:9001/ws");
    }

    #[test]
    fn test_config_builder() {
        let config = StreamConfig::new("example.com")
            .with_port(8443)
            .with_user_agent("probe/0.1")
            .with_read_timeout(None)
            .with_connect_timeout(Some(Duration::from_secs(3)));

        assert_eq!(config.port, 8443);
        assert_eq!(config.user_agent, "probe/0.1");
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_config_validate() {
        assert!(StreamConfig::default().validate().is_ok());
        assert!(StreamConfig::new("").validate().is_err());
        assert!(StreamConfig::new("example.com").with_port(0).validate().is_err());
        assert!(StreamConfig::new("example.com")
            .with_path("stream")
            .validate()
            .is_err());
    }
}
