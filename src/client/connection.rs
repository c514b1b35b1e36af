use crate::transport::DisconnectReason;
use crate::types::{AuctionError, AuctionMessage, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc, watch};

/// Lifecycle of the auction connection.
///
/// `Offline` and `Error` are terminal: only an explicit retry leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not started, or torn down
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    /// The server ended the session or reconnects ran out
    Offline,
    /// Authentication failed or the initial state never arrived
    Error,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Offline | Self::Error)
    }

    /// Whether a connection is open or being worked on
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands for the task that owns the live transport
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(String),
    Close(DisconnectReason),
}

/// Owns the single live connection.
///
/// The transport itself lives in the connection task; this holds the queue
/// into that task. Every attach bumps the generation, so events from a
/// replaced transport can be recognised and ignored.
pub struct ConnectionManager {
    outbound: RwLock<Option<mpsc::UnboundedSender<Outbound>>>,
    state: watch::Sender<ConnectionState>,
    generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            outbound: RwLock::new(None),
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Installs the queue of a freshly opened transport, returning its generation
    pub(crate) async fn attach(&self, sender: mpsc::UnboundedSender<Outbound>) -> u64 {
        let mut outbound = self.outbound.write().await;
        *outbound = Some(sender);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Drops the queue. The connection task drains what is left, closes the
    /// transport and exits; its disconnect is ignored as stale.
    pub(crate) async fn detach(&self) {
        let mut outbound = self.outbound.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *outbound = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `generation` still identifies the live transport
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Gets the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Sets the connection state. Returns true when it changed.
    pub fn set_state(&self, new_state: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == new_state {
                false
            } else {
                *state = new_state;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Checks if currently connected
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Queues a message on the live transport
    pub async fn send_message(&self, message: &AuctionMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        let outbound = self.outbound.read().await;
        let sender = outbound.as_ref().ok_or(AuctionError::NotConnected)?;
        sender
            .send(Outbound::Frame(json))
            .map_err(|_| AuctionError::NotConnected)
    }

    /// Asks the connection task to close the transport with `reason`
    pub async fn close(&self, reason: DisconnectReason) {
        let outbound = self.outbound.read().await;
        if let Some(sender) = outbound.as_ref()
            && sender.send(Outbound::Close(reason)).is_err()
        {
            tracing::debug!("Connection task already gone");
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
