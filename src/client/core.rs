use super::connection::Outbound;
use super::{
    AuctionClientBuilder, AuctionClientOptions, ClientState, ConnectionConfig, ConnectionManager,
    ConnectionState,
};
use crate::auction::{AuctionView, BidRejection, BidRequest, validate_bid};
use crate::infrastructure::{AuthCheck, HeartbeatManager, now_millis};
use crate::messaging::{AuctionNotification, MessageRouter, RouteOutcome};
use crate::transport::{
    DisconnectReason, Endpoint, Transport, TransportEvent, TransportFactory, negotiate,
};
use crate::types::{AuctionError, AuctionMessage, Result, outbound_events};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, watch};

const SERVER_ENDED_MESSAGE: &str = "The server ended the session. Please reload the page.";

/// Realtime client for one auction room.
///
/// `AuctionClient` owns at most one live transport at a time. It checks the
/// auth token before connecting, joins the auction room, keeps a local
/// projection of the auction up to date from server pushes, estimates the
/// server clock offset and reconnects with bounded backoff when the
/// connection drops.
///
/// Cloning is cheap; all clones share the same connection and state. Call
/// [`teardown()`](Self::teardown) when the auction view goes away.
///
/// # Example
///
/// ```no_run
/// use auction_realtime::{AuctionClient, AuctionClientOptions, ConnectionConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AuctionClient::new(
///     ConnectionConfig::from_env(),
///     AuctionClientOptions {
///         auth_token: "session-token".to_string(),
///         auction_id: "auction-42".to_string(),
///         ..Default::default()
///     },
/// )?;
///
/// let mut notifications = client.on_notification().await;
/// client.connect().await?;
///
/// while let Some(notification) = notifications.recv().await {
///     if let Some(message) = notification.user_message() {
///         println!("{message}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuctionClient {
    pub(crate) endpoint: Arc<Endpoint>,
    pub(crate) options: Arc<AuctionClientOptions>,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    pub(crate) auth: Arc<dyn AuthCheck>,
    pub(crate) transports: Arc<dyn TransportFactory>,
}

/// Non-owning handle used by background tasks that must not keep the client alive
pub(crate) struct WeakAuctionClient {
    endpoint: Arc<Endpoint>,
    options: Arc<AuctionClientOptions>,
    connection: Weak<ConnectionManager>,
    state: Weak<RwLock<ClientState>>,
    auth: Arc<dyn AuthCheck>,
    transports: Arc<dyn TransportFactory>,
}

impl WeakAuctionClient {
    pub(crate) fn upgrade(&self) -> Option<AuctionClient> {
        Some(AuctionClient {
            endpoint: Arc::clone(&self.endpoint),
            options: Arc::clone(&self.options),
            connection: self.connection.upgrade()?,
            state: self.state.upgrade()?,
            auth: Arc::clone(&self.auth),
            transports: Arc::clone(&self.transports),
        })
    }
}

impl AuctionClient {
    /// Creates a client with the default auth check and transports.
    ///
    /// Does not connect; call [`connect()`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns an error if the options lack a token or auction id, or the
    /// configured origin is not a valid http(s) URL.
    pub fn new(config: ConnectionConfig, options: AuctionClientOptions) -> Result<Self> {
        AuctionClientBuilder::new(config, options).map(|builder| builder.build())
    }

    pub(crate) fn downgrade(&self) -> WeakAuctionClient {
        WeakAuctionClient {
            endpoint: Arc::clone(&self.endpoint),
            options: Arc::clone(&self.options),
            connection: Arc::downgrade(&self.connection),
            state: Arc::downgrade(&self.state),
            auth: Arc::clone(&self.auth),
            transports: Arc::clone(&self.transports),
        }
    }

    /// Set connection state and notify listeners
    async fn set_state(&self, new_state: ConnectionState) {
        if self.connection.set_state(new_state) {
            tracing::info!("Connection state: {}", new_state);
            self.notify(AuctionNotification::ConnectionStateChanged(new_state))
                .await;
        }
    }

    /// Same as `set_state` for callers already holding the state lock
    fn set_state_locked(&self, state: &mut ClientState, new_state: ConnectionState) {
        if self.connection.set_state(new_state) {
            tracing::info!("Connection state: {}", new_state);
            state.notify(AuctionNotification::ConnectionStateChanged(new_state));
        }
    }

    async fn notify(&self, notification: AuctionNotification) {
        self.state.write().await.notify(notification);
    }

    /// Opens the connection to the auction room.
    ///
    /// The auth token is checked first. A rejected token moves the client to
    /// [`ConnectionState::Error`] and is returned as an error; it is never
    /// retried. A transport that fails to open is handed to the reconnect
    /// procedure instead, and this returns `Ok` while that runs in the
    /// background. Does nothing if a connection is already open or in progress.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionError::Authentication`] when the token is rejected,
    /// or the pre-flight error when the auth endpoint could not be reached.
    pub async fn connect(&self) -> Result<()> {
        if self.connection.state().is_active() {
            return Ok(());
        }
        self.state.write().await.torn_down = false;
        self.set_state(ConnectionState::Connecting).await;

        if let Err(e) = self.auth.check(&self.options.auth_token).await {
            self.fail(&e).await;
            return Err(e);
        }

        match self.open_transport().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_terminal() => {
                self.fail(&e).await;
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Connection failed, starting reconnect: {}", e);
                self.set_state(ConnectionState::Reconnecting).await;
                Ok(())
            }
        }
    }

    /// Leaves a terminal state and connects again with a fresh attempt budget
    pub async fn retry(&self) -> Result<()> {
        if self.connection.state().is_active() {
            return Ok(());
        }
        tracing::info!("Retrying connection on request");
        self.state.write().await.reconnect.reset();
        self.set_state(ConnectionState::Idle).await;
        self.connect().await
    }

    /// Moves to a terminal state with the message matching `error`
    async fn fail(&self, error: &AuctionError) {
        tracing::error!("Connection failed: {}", error);

        let (state, notification) = if error.is_auth_failure() {
            (
                ConnectionState::Error,
                AuctionNotification::AuthenticationExpired {
                    message: error.to_string(),
                },
            )
        } else if matches!(error, AuctionError::ServerDisconnect) {
            (
                ConnectionState::Offline,
                AuctionNotification::ConnectionLost {
                    message: SERVER_ENDED_MESSAGE.to_string(),
                },
            )
        } else {
            (
                ConnectionState::Error,
                AuctionNotification::ConnectionLost {
                    message: "Could not reach the auction server. Please reload the page."
                        .to_string(),
                },
            )
        };
        self.set_state(state).await;
        self.notify(notification).await;
    }

    /// Reconnect procedure, run by the state watcher on `Reconnecting`
    pub(crate) async fn try_reconnect(&self) {
        loop {
            if self.connection.state() != ConnectionState::Reconnecting {
                tracing::info!("No longer reconnecting, stopping reconnection attempts");
                return;
            }

            let (attempt, delay) = {
                let mut state = self.state.write().await;
                let attempt = state.reconnect.attempts() + 1;
                (attempt, state.reconnect.next_delay())
            };

            let Some(delay) = delay else {
                tracing::error!("Giving up after {} reconnect attempts", attempt - 1);
                let mut state = self.state.write().await;
                if self.connection.state() == ConnectionState::Reconnecting {
                    self.set_state_locked(&mut state, ConnectionState::Offline);
                    state.notify(AuctionNotification::ConnectionLost {
                        message: "Connection lost. Please reload the page.".to_string(),
                    });
                }
                return;
            };

            tracing::info!("Reconnect attempt {} in {:?}", attempt, delay);
            self.notify(AuctionNotification::Reconnecting { attempt, delay })
                .await;
            tokio::time::sleep(delay).await;

            if self.connection.state() != ConnectionState::Reconnecting {
                return;
            }

            match self.open_transport().await {
                Ok(()) => {
                    tracing::info!("Reconnected successfully");
                    return;
                }
                Err(e) if e.is_terminal() => {
                    self.fail(&e).await;
                    return;
                }
                Err(e) => {
                    tracing::error!("Reconnection attempt failed: {}", e);
                }
            }
        }
    }

    async fn open_transport(&self) -> Result<()> {
        let transport = negotiate(
            self.transports.as_ref(),
            &self.endpoint,
            &self.options.transports,
        )
        .await?;
        self.attach_transport(transport).await;
        Ok(())
    }

    /// Makes `transport` the live one, releasing whatever was live before
    async fn attach_transport(&self, mut transport: Box<dyn Transport>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.state.write().await;
        if state.torn_down {
            drop(state);
            tracing::debug!("Torn down while connecting, dropping new transport");
            if let Err(e) = transport.close().await {
                tracing::debug!("Failed to close unused transport: {}", e);
            }
            return;
        }

        state.connection_tasks.abort_all();
        if let Some(reader) = state.reader.take() {
            reader.abort();
        }

        let generation = self.connection.attach(tx).await;
        state.reconnect.reset();
        state.pending_heartbeat = None;
        state.awaiting_initial_state = true;
        tracing::info!(
            "Connected over {} (generation {})",
            transport.kind(),
            generation
        );

        let client = self.clone();
        state.reader = Some(tokio::spawn(client.run_connection(
            transport,
            rx,
            generation,
        )));

        let join = AuctionMessage::new(
            outbound_events::JOIN_ROOM,
            serde_json::json!({
                "auction_id": self.options.auction_id,
                "user_id": self.options.user_id,
            }),
        );
        if let Err(e) = self.connection.send_message(&join).await {
            tracing::error!("Failed to queue join_room: {}", e);
        }

        let heartbeat = HeartbeatManager::new(
            Arc::downgrade(&self.connection),
            Arc::downgrade(&self.state),
            generation,
        )
        .with_interval(Duration::from_millis(self.options.heartbeat_interval));
        state.connection_tasks.spawn(heartbeat.run());

        let client = self.clone();
        state
            .connection_tasks
            .spawn(async move { client.await_initial_state(generation).await });

        self.set_state_locked(&mut state, ConnectionState::Connected);
    }

    /// Owns the transport: forwards queued frames and routes incoming ones
    /// until either side closes.
    async fn run_connection(
        self,
        mut transport: Box<dyn Transport>,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        generation: u64,
    ) {
        let router = MessageRouter::new_with_state(Arc::clone(&self.state));
        tracing::info!("Starting read task");

        let reason = loop {
            tokio::select! {
                command = outbound.recv() => match command {
                    Some(Outbound::Frame(text)) => {
                        tracing::debug!("Sending message: {}", text);
                        if let Err(e) = transport.send(text).await {
                            tracing::error!("Failed to send message: {}", e);
                            break DisconnectReason::TransportError(e.to_string());
                        }
                    }
                    Some(Outbound::Close(reason)) => {
                        close_quietly(transport.as_mut()).await;
                        break reason;
                    }
                    None => {
                        close_quietly(transport.as_mut()).await;
                        break DisconnectReason::ClientInitiated;
                    }
                },
                event = transport.recv() => match event {
                    Some(TransportEvent::Message(text)) => {
                        if let RouteOutcome::Disconnect(reason) = router.route_text(&text).await {
                            close_quietly(transport.as_mut()).await;
                            break reason;
                        }
                    }
                    Some(TransportEvent::Closed(reason)) => break reason,
                    None => break DisconnectReason::TransportClose,
                },
            }
        };

        tracing::info!("Read task finished: {}", reason);
        self.handle_disconnect(generation, reason).await;
    }

    /// Decides what a lost transport means for the session
    async fn handle_disconnect(&self, generation: u64, reason: DisconnectReason) {
        let mut state = self.state.write().await;
        if !self.connection.is_current(generation) {
            tracing::debug!("Ignoring disconnect of replaced connection: {}", reason);
            return;
        }
        if state.torn_down {
            return;
        }

        state.connection_tasks.abort_all();
        state.pending_heartbeat = None;
        state.awaiting_initial_state = false;
        if state.bids.clear().is_some() {
            state.notify(AuctionNotification::BidRejected(BidRejection::ConnectionLost));
        }
        self.connection.detach().await;

        if self.connection.state().is_terminal() {
            return;
        }

        if reason.should_reconnect() {
            tracing::warn!("Disconnected ({}), will reconnect", reason);
            self.set_state_locked(&mut state, ConnectionState::Reconnecting);
        } else {
            tracing::warn!("Disconnected by server, not reconnecting");
            self.set_state_locked(&mut state, ConnectionState::Offline);
            state.notify(AuctionNotification::ConnectionLost {
                message: SERVER_ENDED_MESSAGE.to_string(),
            });
        }
    }

    /// Fails the load when no auction state arrives in time
    async fn await_initial_state(self, generation: u64) {
        tokio::time::sleep(Duration::from_millis(self.options.snapshot_timeout)).await;

        let mut state = self.state.write().await;
        if !state.awaiting_initial_state || !self.connection.is_current(generation) {
            return;
        }
        state.awaiting_initial_state = false;

        tracing::error!(
            "No auction state within {}ms of joining",
            self.options.snapshot_timeout
        );
        state.pending_heartbeat = None;
        self.connection.detach().await;
        // This task is one of the connection tasks: no awaits past this point
        state.connection_tasks.abort_all();
        self.set_state_locked(&mut state, ConnectionState::Error);
        state.notify(AuctionNotification::LoadTimeout);
    }

    /// Releases the connection and every task tied to it.
    ///
    /// Sends `leave_room` if a transport is live, closes it, stops the
    /// heartbeat and countdown, and returns the client to
    /// [`ConnectionState::Idle`]. No reconnect follows.
    pub async fn teardown(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.torn_down && self.connection.state() == ConnectionState::Idle {
                return Ok(());
            }
            state.torn_down = true;
            state.connection_tasks.abort_all();
            state.stop_countdown();
            state.bids.clear();
            state.pending_heartbeat = None;
            state.awaiting_initial_state = false;
            // The reader drains the queue and closes the transport on its own
            state.reader = None;
        }

        tracing::info!("Tearing down auction connection");
        let leave = AuctionMessage::new(
            outbound_events::LEAVE_ROOM,
            serde_json::json!({ "auction_id": self.options.auction_id }),
        );
        if let Err(e) = self.connection.send_message(&leave).await {
            tracing::debug!("leave_room not sent: {}", e);
        }
        self.connection.detach().await;

        self.set_state(ConnectionState::Idle).await;
        Ok(())
    }

    /// Submits a bid on the current lot.
    ///
    /// The bid is checked locally first; the returned request only means it
    /// was sent. Acceptance or rejection arrives later as
    /// [`AuctionNotification::BidAccepted`] or
    /// [`AuctionNotification::BidRejected`].
    ///
    /// # Errors
    ///
    /// [`AuctionError::NotConnected`] when not connected, and
    /// [`AuctionError::BidRejected`] when local validation fails or another
    /// bid is still waiting for its result.
    pub async fn place_bid(&self, amount: u64) -> Result<BidRequest> {
        if !self.connection.is_connected() {
            return Err(AuctionError::NotConnected);
        }

        let request = {
            let mut state = self.state.write().await;
            validate_bid(&state.view, amount)?;
            let lot_id = state
                .view
                .current_lot_id()
                .ok_or(BidRejection::NoOpenLot)?
                .to_string();
            let request = BidRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                auction_id: self.options.auction_id.clone(),
                lot_id,
                amount,
            };
            state.bids.begin(request.clone())?;
            request
        };

        let message =
            AuctionMessage::new(outbound_events::PLACE_BID, serde_json::to_value(&request)?);
        if let Err(e) = self.connection.send_message(&message).await {
            self.state.write().await.bids.clear();
            return Err(e);
        }

        tracing::info!("Placed bid of {} on lot {}", amount, request.lot_id);
        Ok(request)
    }

    /// Sends a chat line to the auction room. Blank messages are ignored.
    pub async fn send_chat(&self, message: &str) -> Result<()> {
        if !self.connection.is_connected() {
            return Err(AuctionError::NotConnected);
        }
        let message = message.trim();
        if message.is_empty() {
            return Ok(());
        }

        self.connection
            .send_message(&AuctionMessage::new(
                outbound_events::SEND_CHAT,
                serde_json::json!({
                    "auction_id": self.options.auction_id,
                    "message": message,
                }),
            ))
            .await
    }

    /// Subscribes to notifications. Each call returns an independent receiver.
    pub async fn on_notification(&self) -> mpsc::Receiver<AuctionNotification> {
        self.state
            .write()
            .await
            .subscribe(self.options.event_channel_capacity)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Receiver that observes every connection state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Copy of the local auction projection
    pub async fn view(&self) -> AuctionView {
        self.state.read().await.view.clone()
    }

    pub async fn is_bidding(&self) -> bool {
        self.state.read().await.bids.is_bidding()
    }

    /// The bid still waiting for its `bid_result`, if any
    pub async fn pending_bid(&self) -> Option<BidRequest> {
        self.state.read().await.bids.pending().cloned()
    }

    /// Current estimate of `server time - client time`
    pub async fn server_offset_ms(&self) -> i64 {
        self.state.read().await.clock.offset_ms()
    }

    /// Whole seconds left on the current lot, if it has a deadline
    pub async fn remaining_seconds(&self) -> Option<u64> {
        self.remaining_seconds_at(now_millis()).await
    }

    /// Whole seconds left on the current lot as of `client_now_ms`
    pub async fn remaining_seconds_at(&self, client_now_ms: i64) -> Option<u64> {
        let state = self.state.read().await;
        let deadline = state.view.current_lot.as_ref()?.timer_ends_at?;
        Some(state.clock.remaining_seconds(deadline, client_now_ms))
    }

    pub fn auction_id(&self) -> &str {
        &self.options.auction_id
    }
}

async fn close_quietly(transport: &mut dyn Transport) {
    if let Err(e) = transport.close().await {
        tracing::debug!("Error while closing transport: {}", e);
    }
}
