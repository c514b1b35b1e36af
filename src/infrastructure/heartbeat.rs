use super::now_millis;
use crate::client::{ClientState, ConnectionManager, ConnectionState};
use crate::transport::DisconnectReason;
use crate::types::{AuctionMessage, HEARTBEAT_INTERVAL, outbound_events};
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time;

/// Periodic heartbeat for one connection.
///
/// Each heartbeat carries the client timestamp; the server answers with its
/// own clock in `heartbeat_ack`, which feeds the offset estimate. A heartbeat
/// still unanswered when the next one is due closes the transport.
pub struct HeartbeatManager {
    interval: Duration,
    generation: u64,
    connection: Weak<ConnectionManager>,
    state: Weak<RwLock<ClientState>>,
}

impl HeartbeatManager {
    pub fn new(
        connection: Weak<ConnectionManager>,
        state: Weak<RwLock<ClientState>>,
        generation: u64,
    ) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            generation,
            connection,
            state,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until the connection it belongs to is replaced or times out
    pub async fn run(self) {
        let mut interval_timer = time::interval(self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            // Client dropped, exit heartbeat task
            let (Some(connection), Some(state)) = (self.connection.upgrade(), self.state.upgrade())
            else {
                break;
            };

            if !connection.is_current(self.generation) {
                break;
            }
            if connection.state() != ConnectionState::Connected {
                continue;
            }

            let mut state = state.write().await;
            if let Some(sent_at) = state.pending_heartbeat.take() {
                drop(state);
                tracing::warn!(
                    "Heartbeat sent at {} was never acknowledged, closing connection",
                    sent_at
                );
                connection.close(DisconnectReason::HeartbeatTimeout).await;
                break;
            }

            let timestamp = now_millis();
            let message = AuctionMessage::new(
                outbound_events::HEARTBEAT,
                serde_json::json!({ "timestamp": timestamp }),
            );

            match connection.send_message(&message).await {
                Ok(()) => {
                    state.pending_heartbeat = Some(timestamp);
                    tracing::debug!("Sent heartbeat at {}", timestamp);
                }
                Err(e) => {
                    tracing::error!("Failed to send heartbeat: {}", e);
                }
            }
        }
    }
}
