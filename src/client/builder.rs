use super::{
    AuctionClient, ClientState, ConnectionConfig, ConnectionManager, ConnectionState,
    backoff_mode_from_env,
};
use crate::infrastructure::{AuthCheck, BackoffMode, HttpAuthCheck};
use crate::transport::{DefaultTransportFactory, Endpoint, TransportFactory, TransportKind};
use crate::types::{
    AuctionError, DEFAULT_EVENT_CHANNEL_CAPACITY, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS,
    Result, SNAPSHOT_TIMEOUT,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct AuctionClientOptions {
    /// Session token, checked before connecting and passed to the transport
    pub auth_token: String,
    /// Auction whose room is joined
    pub auction_id: String,
    /// Sent along with `join_room` when known
    pub user_id: Option<String>,
    /// Heartbeat interval (milliseconds)
    pub heartbeat_interval: u64,
    /// Wait for the first auction state after joining (milliseconds)
    pub snapshot_timeout: u64,
    pub max_reconnect_attempts: u32,
    /// Defaults to the `AUCTION_BACKOFF_MODE` environment variable
    pub backoff_mode: BackoffMode,
    /// Transport kinds in order of preference
    pub transports: Vec<TransportKind>,
    /// Capacity of each notification receiver
    pub event_channel_capacity: usize,
}

impl Default for AuctionClientOptions {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            auction_id: String::new(),
            user_id: None,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            snapshot_timeout: SNAPSHOT_TIMEOUT,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            backoff_mode: backoff_mode_from_env(),
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for AuctionClient that handles initialization
pub struct AuctionClientBuilder {
    endpoint: Endpoint,
    options: AuctionClientOptions,
    auth: Arc<dyn AuthCheck>,
    transports: Arc<dyn TransportFactory>,
}

impl AuctionClientBuilder {
    /// Create a new builder
    pub fn new(config: ConnectionConfig, options: AuctionClientOptions) -> Result<Self> {
        if options.auth_token.is_empty() {
            return Err(AuctionError::Authentication(
                "auth token is required".to_string(),
            ));
        }
        if options.auction_id.is_empty() {
            return Err(AuctionError::Config("auction id is required".to_string()));
        }
        if options.transports.is_empty() {
            return Err(AuctionError::Config(
                "at least one transport kind is required".to_string(),
            ));
        }
        if options.event_channel_capacity == 0 {
            return Err(AuctionError::Config(
                "event channel capacity must be positive".to_string(),
            ));
        }

        let endpoint = Endpoint {
            ws_url: config.ws_url()?,
            http_url: config.http_url()?,
            auth_token: options.auth_token.clone(),
            auction_id: options.auction_id.clone(),
        };

        Ok(Self {
            endpoint,
            options,
            auth: Arc::new(HttpAuthCheck::new(config.auth_check_url()?)),
            transports: Arc::new(DefaultTransportFactory::new()),
        })
    }

    /// Replaces the pre-flight authentication check
    pub fn auth_check(mut self, auth: Arc<dyn AuthCheck>) -> Self {
        self.auth = auth;
        self
    }

    /// Replaces the transport factory
    pub fn transport_factory(mut self, transports: Arc<dyn TransportFactory>) -> Self {
        self.transports = transports;
        self
    }

    /// Build the client and spawn the reconnect watcher.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> AuctionClient {
        let client_state = ClientState::new(
            self.options.backoff_mode,
            self.options.max_reconnect_attempts,
        );
        let connection = ConnectionManager::new();
        let state_rx = connection.subscribe();

        let client = AuctionClient {
            endpoint: Arc::new(self.endpoint),
            options: Arc::new(self.options),
            connection: Arc::new(connection),
            state: Arc::new(RwLock::new(client_state)),
            auth: self.auth,
            transports: self.transports,
        };

        // Spawn reconnection watcher task. It holds only a weak handle so it
        // ends together with the client.
        let weak_client = client.downgrade();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                if state != ConnectionState::Reconnecting {
                    continue;
                }

                let Some(client) = weak_client.upgrade() else {
                    break;
                };
                tracing::info!("State watcher detected disconnect, attempting reconnection...");
                client.try_reconnect().await;
            }
            tracing::info!("Reconnection watcher task finished");
        });

        client
    }
}
