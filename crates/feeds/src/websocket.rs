//! WebSocket client for the public stream endpoint.

use crate::{
    dispatch, ConnectionState, Dispatch, InboundMessage, OutboundMessage, StreamConfig,
    StreamError, StreamHandler, SubscriptionTracker,
};
use futures_util::{SinkExt, StreamExt};
use lighter_core::{Channel, MarketIndex, Topic};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why [`StreamClient::run`] returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token fired. The session is still open.
    Cancelled,
    /// The server sent a close frame.
    PeerClosed,
}

/// Client for one stream session.
///
/// A single owner drives every read and write through `&mut self`, so
/// subscribe requests and pong replies are never interleaved on the socket.
pub struct StreamClient {
    config: StreamConfig,
    state: ConnectionState,
    ws: Option<WsStream>,
    subscriptions: SubscriptionTracker,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            ws: None,
            subscriptions: SubscriptionTracker::new(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.ws.is_some() && self.state.is_open()
    }

    /// Channels requested on the current session.
    pub fn subscriptions(&self) -> &SubscriptionTracker {
        &self.subscriptions
    }

    /// Open the TCP connection, complete TLS and the WebSocket upgrade.
    ///
    /// Certificates are verified against the platform trust store and SNI is
    /// set to the configured host. No retry is attempted on failure.
    pub async fn connect(&mut self) -> Result<(), StreamError> {
        if self.ws.is_some() {
            return Err(StreamError::AlreadyConnected);
        }

        let url = self.config.url()?;
        self.state = self.state.connect();
        info!("Connecting to {}", self.config.display_url());

        match self.handshake(url).await {
            Ok(ws) => {
                self.ws = Some(ws);
                self.subscriptions = SubscriptionTracker::new();
                self.state = self.state.connected();
                info!("Connected to {}", self.config.display_url());
                Ok(())
            }
            Err(e) => {
                self.state = self.state.disconnect();
                error!("Connection to {} failed: {}", self.config.display_url(), e);
                Err(e)
            }
        }
    }

    async fn handshake(&self, url: Url) -> Result<WsStream, StreamError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| StreamError::Connection(e.to_string()))?;
        let user_agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|e| StreamError::Connection(format!("invalid user agent: {}", e)))?;
        request.headers_mut().insert(USER_AGENT, user_agent);

        let upgrade = connect_async(request);
        let result = match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, upgrade)
                .await
                .map_err(|_| StreamError::Timeout(limit))?,
            None => upgrade.await,
        };
        let (ws, response) = result.map_err(|e| StreamError::Connection(e.to_string()))?;
        debug!("Upgrade complete (status: {:?})", response.status());
        Ok(ws)
    }

    /// Request a channel. Fire-and-forget: the snapshot that follows is the
    /// only acknowledgment.
    pub async fn subscribe(&mut self, topic: Topic, market: MarketIndex) -> Result<(), StreamError> {
        self.subscribe_channel(Channel::new(topic, market)).await
    }

    /// Market statistics for every market on one channel (`market_stats/all`).
    pub async fn subscribe_all_market_stats(&mut self) -> Result<(), StreamError> {
        self.subscribe_channel(Channel::all(Topic::MarketStats)).await
    }

    pub async fn subscribe_channel(&mut self, channel: Channel) -> Result<(), StreamError> {
        self.send(&OutboundMessage::subscribe(channel)).await?;
        if !self.subscriptions.request(channel) {
            debug!("Repeated subscription to {}", channel);
        }
        self.state = self.state.streaming();
        info!("Subscribed to {}", channel);
        Ok(())
    }

    pub async fn unsubscribe(
        &mut self,
        topic: Topic,
        market: MarketIndex,
    ) -> Result<(), StreamError> {
        self.unsubscribe_channel(Channel::new(topic, market)).await
    }

    pub async fn unsubscribe_channel(&mut self, channel: Channel) -> Result<(), StreamError> {
        self.send(&OutboundMessage::unsubscribe(channel)).await?;
        if !self.subscriptions.remove(channel) {
            debug!("Unsubscribed from untracked channel {}", channel);
        }
        info!("Unsubscribed from {}", channel);
        Ok(())
    }

    /// Read and dispatch frames until `shutdown` fires or the session ends.
    ///
    /// Malformed frames and server error frames are logged and skipped.
    /// A close frame ends the loop with [`StopReason::PeerClosed`]; a socket
    /// failure, end of stream or read timeout ends it with an error. In both
    /// cases the client is left `Closed`.
    pub async fn run<H>(
        &mut self,
        handler: &mut H,
        shutdown: &CancellationToken,
    ) -> Result<StopReason, StreamError>
    where
        H: StreamHandler + ?Sized,
    {
        let read_timeout = self.config.read_timeout;

        loop {
            let ws = self.ws.as_mut().ok_or(StreamError::NotConnected)?;
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, leaving read loop");
                    return Ok(StopReason::Cancelled);
                }
                next = read_frame(ws, read_timeout) => next,
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    error!("Stream ended without a close frame");
                    self.terminate();
                    return Err(StreamError::TransportClosed("stream ended".to_string()));
                }
                Err(e) => {
                    error!("Read failed: {}", e);
                    self.terminate();
                    return Err(e);
                }
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Dropping non UTF-8 binary frame: {}", e);
                        continue;
                    }
                },
                Message::Close(frame) => {
                    match &frame {
                        Some(frame) => info!(
                            "Server closed the stream: {} {}",
                            u16::from(frame.code),
                            frame.reason
                        ),
                        None => info!("Server closed the stream"),
                    }
                    if let Some(mut ws) = self.ws.take() {
                        // Flushes the close reply queued by the protocol layer.
                        let _ = ws.close(None).await;
                    }
                    self.state = self.state.close();
                    return Ok(StopReason::PeerClosed);
                }
                // Protocol pings are answered by tungstenite on the next read.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match self.handle_text(&text, handler).await {
                Ok(()) => {}
                Err(e @ StreamError::Protocol(_)) => warn!("Skipping frame: {}", e),
                Err(e) if !e.is_fatal() => debug!("Continuing after {}", e),
                Err(e) => {
                    error!("Failed to answer server: {}", e);
                    self.terminate();
                    return Err(e);
                }
            }
        }
    }

    /// Decode, track and dispatch one text frame.
    ///
    /// Malformed frames come back as `Protocol` and server error frames as
    /// `Application`; neither is fatal.
    async fn handle_text<H>(&mut self, text: &str, handler: &mut H) -> Result<(), StreamError>
    where
        H: StreamHandler + ?Sized,
    {
        let message = InboundMessage::decode(text)?;
        debug!("Received {}", message.label());

        if let InboundMessage::Snapshot(event) = &message {
            for channel in self.subscriptions.confirm(event) {
                info!("Subscription active: {}", channel);
            }
        }

        match dispatch(message, handler) {
            Dispatch::Reply(reply) => self.send(&reply).await,
            Dispatch::ServerError(err) => Err(err.into()),
            Dispatch::Delivered(_) | Dispatch::Ignored => Ok(()),
        }
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<(), StreamError> {
        let ws = self.ws.as_mut().ok_or(StreamError::NotConnected)?;
        let text = message.to_json()?;
        debug!("Sending {}", text);
        ws.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a normal close frame and drop the session.
    ///
    /// Errors are logged and swallowed. Calling it again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut ws) = self.ws.take() else {
            self.state = self.state.close();
            return;
        };

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = ws.close(Some(frame)).await {
            debug!("Close handshake failed: {}", e);
        }
        self.state = self.state.close();
        info!("Connection closed");
    }

    fn terminate(&mut self) {
        self.ws = None;
        self.state = self.state.close();
    }
}

async fn read_frame(
    ws: &mut WsStream,
    limit: Option<Duration>,
) -> Result<Option<Message>, StreamError> {
    let next = match limit {
        Some(limit) => tokio::time::timeout(limit, ws.next())
            .await
            .map_err(|_| StreamError::Timeout(limit))?,
        None => ws.next().await,
    };
    Ok(next.transpose()?)
}
