//! Bidirectional message channel to the auction server.
//!
//! The client talks to a [`Transport`] and never to a socket directly. Which
//! implementation it gets is decided by [`negotiate`]: the preferred kinds are
//! tried in order and the first one that opens wins.

mod polling;
mod websocket;

pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

use crate::types::{AuctionError, Result, TRANSPORT_POLLING, TRANSPORT_WEBSOCKET};
use async_trait::async_trait;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebSocket => TRANSPORT_WEBSOCKET,
            Self::Polling => TRANSPORT_POLLING,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transport stopped delivering messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server ended the session on purpose (e.g. token revoked)
    ServerInitiated,
    /// This client closed the transport
    ClientInitiated,
    /// The connection dropped without a close handshake
    TransportClose,
    /// Reading or writing failed
    TransportError(String),
    /// A heartbeat went unanswered for a full interval
    HeartbeatTimeout,
}

impl DisconnectReason {
    /// Only a server-initiated disconnect ends the session; everything else is retried
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, Self::ServerInitiated)
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerInitiated => f.write_str("io server disconnect"),
            Self::ClientInitiated => f.write_str("io client disconnect"),
            Self::TransportClose => f.write_str("transport close"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::HeartbeatTimeout => f.write_str("ping timeout"),
        }
    }
}

/// Something a transport delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed(DisconnectReason),
}

/// What a transport needs to reach the server
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub ws_url: Url,
    pub http_url: Url,
    pub auth_token: String,
    pub auction_id: String,
}

/// A connected, bidirectional text message channel.
///
/// `recv` must be cancel-safe: the connection loop polls it inside
/// `tokio::select!` alongside the outbound queue.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, message: String) -> Result<()>;

    /// Next event, or `None` once the transport is exhausted
    async fn recv(&mut self) -> Option<TransportEvent>;

    async fn close(&mut self) -> Result<()>;

    fn kind(&self) -> TransportKind;
}

/// Opens transports of the kinds it supports
#[async_trait]
pub trait TransportFactory: Send + Sync {
    fn capabilities(&self) -> &[TransportKind];

    async fn open(&self, kind: TransportKind, endpoint: &Endpoint) -> Result<Box<dyn Transport>>;
}

/// Opens the first preferred transport kind the factory supports.
///
/// A terminal error (rejected token, session ended by the server) stops
/// negotiation immediately: the other transports would get the same answer.
pub async fn negotiate(
    factory: &dyn TransportFactory,
    endpoint: &Endpoint,
    preferred: &[TransportKind],
) -> Result<Box<dyn Transport>> {
    let mut last_error = None;

    for kind in preferred
        .iter()
        .filter(|kind| factory.capabilities().contains(kind))
    {
        tracing::debug!("Trying {} transport", kind);
        match factory.open(*kind, endpoint).await {
            Ok(transport) => {
                tracing::info!("Opened {} transport", kind);
                return Ok(transport);
            }
            Err(e) if e.is_terminal() => return Err(e),
            Err(e) => {
                tracing::warn!("{} transport failed to open: {}", kind, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AuctionError::Config("no supported transport in the preferred list".to_string())
    }))
}

/// Default factory: persistent WebSocket first, long-polling as fallback
pub struct DefaultTransportFactory {
    capabilities: Vec<TransportKind>,
}

impl DefaultTransportFactory {
    pub fn new() -> Self {
        Self {
            capabilities: vec![TransportKind::WebSocket, TransportKind::Polling],
        }
    }
}

impl Default for DefaultTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportFactory for DefaultTransportFactory {
    fn capabilities(&self) -> &[TransportKind] {
        &self.capabilities
    }

    async fn open(&self, kind: TransportKind, endpoint: &Endpoint) -> Result<Box<dyn Transport>> {
        match kind {
            TransportKind::WebSocket => Ok(Box::new(WebSocketTransport::connect(endpoint).await?)),
            TransportKind::Polling => Ok(Box::new(PollingTransport::connect(endpoint).await?)),
        }
    }
}
