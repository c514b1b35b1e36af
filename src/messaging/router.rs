use super::{AuctionEvent, AuctionNotification};
use crate::auction::{
    AuctionSnapshot, AuctionStatus, BidRejection, BidResult, ChatMessage, HeartbeatAck, LotUpdate,
    PresenceChanges, PresenceEntry,
};
use crate::client::ClientState;
use crate::infrastructure::now_millis;
use crate::transport::DisconnectReason;
use crate::types::AuctionMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What the connection loop should do after a message was routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Continue,
    Disconnect(DisconnectReason),
}

/// Applies incoming server events to the client state.
///
/// Every handler takes the state write lock once, applies the event and
/// emits its notifications before releasing it, so listeners observe events
/// in the order the transport delivered them.
pub struct MessageRouter {
    state: Arc<RwLock<ClientState>>,
}

impl MessageRouter {
    pub fn new_with_state(state: Arc<RwLock<ClientState>>) -> Self {
        Self { state }
    }

    /// Parses a raw frame and routes it. Malformed frames are logged and dropped.
    pub async fn route_text(&self, text: &str) -> RouteOutcome {
        match serde_json::from_str::<AuctionMessage>(text) {
            Ok(message) => {
                tracing::debug!("Parsed message: event={}", message.event);
                self.route(message).await
            }
            Err(e) => {
                tracing::error!("Failed to parse message: {} - Raw: {}", e, text);
                RouteOutcome::Continue
            }
        }
    }

    /// Routes a message to its handler
    pub async fn route(&self, message: AuctionMessage) -> RouteOutcome {
        let AuctionMessage { event, payload } = message;

        match event {
            AuctionEvent::AuctionSnapshot => self.handle_snapshot(payload).await,
            AuctionEvent::AuctionState => self.handle_auction_state(payload).await,
            AuctionEvent::LotUpdate => self.handle_lot_update(payload).await,
            AuctionEvent::BidResult => self.handle_bid_result(payload).await,
            AuctionEvent::ChatMessage => self.handle_chat(payload).await,
            AuctionEvent::PresenceList => self.handle_presence_list(payload).await,
            AuctionEvent::UserPresence => self.handle_user_presence(payload).await,
            AuctionEvent::AuctionPaused => {
                self.handle_status(AuctionStatus::Paused, AuctionNotification::AuctionPaused)
                    .await
            }
            AuctionEvent::AuctionResumed => {
                self.handle_status(AuctionStatus::Live, AuctionNotification::AuctionResumed)
                    .await
            }
            AuctionEvent::AuctionEnded => self.handle_ended().await,
            AuctionEvent::HeartbeatAck => self.handle_heartbeat_ack(payload).await,
            AuctionEvent::ConnectionStatus => {
                tracing::debug!("Connection status from server: {}", payload);
            }
            AuctionEvent::Disconnect => {
                tracing::warn!("Server requested disconnect: {}", payload);
                return RouteOutcome::Disconnect(DisconnectReason::ServerInitiated);
            }
            other => {
                tracing::debug!("Ignoring event {}", other);
            }
        }

        RouteOutcome::Continue
    }

    async fn handle_snapshot(&self, payload: Value) {
        let snapshot = match AuctionSnapshot::parse(&payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Rejected auction snapshot: {}", e);
                self.state
                    .write()
                    .await
                    .notify(AuctionNotification::SnapshotError {
                        message: snapshot_error_message(e),
                    });
                return;
            }
        };

        let mut state = self.state.write().await;
        let previous_lot = state.view.current_lot_id().map(str::to_string);

        if let Some(server_time) = snapshot.server_time {
            state.clock.recalibrate(server_time, now_millis());
            tracing::debug!("Clock offset recalibrated to {}ms", state.clock.offset_ms());
        }
        let presence = state.view.apply_snapshot(snapshot);
        self.after_full_state(&mut state, previous_lot, presence);
    }

    async fn handle_auction_state(&self, payload: Value) {
        let update = match AuctionSnapshot::parse_state(&payload) {
            Ok(update) => update,
            Err(e) => {
                tracing::error!("Rejected auction state: {}", e);
                self.state
                    .write()
                    .await
                    .notify(AuctionNotification::SnapshotError {
                        message: snapshot_error_message(e),
                    });
                return;
            }
        };

        let mut state = self.state.write().await;
        let previous_lot = state.view.current_lot_id().map(str::to_string);

        if let Some(server_time) = update.server_time
            && state.clock.observe(server_time, now_millis())
        {
            tracing::debug!("Clock offset moved to {}ms", state.clock.offset_ms());
        }
        let presence = state.view.apply_auction_state(update);
        self.after_full_state(&mut state, previous_lot, presence);
    }

    /// Shared tail of snapshot and auction state handling
    fn after_full_state(
        &self,
        state: &mut ClientState,
        previous_lot: Option<String>,
        presence: PresenceChanges,
    ) {
        if state.awaiting_initial_state {
            tracing::info!("Initial auction state received");
            state.awaiting_initial_state = false;
        }

        if previous_lot.as_deref() != state.view.current_lot_id() {
            self.drop_stale_bid(state);
        }

        state.notify(AuctionNotification::StateUpdated);
        if !presence.is_empty() {
            state.notify(AuctionNotification::PresenceChanged(presence));
        }
        state.sync_countdown(Arc::downgrade(&self.state));
    }

    async fn handle_lot_update(&self, payload: Value) {
        let Some(update) = decode::<LotUpdate>("lot_update", payload) else {
            return;
        };
        let lot = update.into_lot();

        let mut state = self.state.write().await;
        if state.view.apply_lot_update(lot.clone()) {
            tracing::info!("Current lot is now {}", lot.id);
            self.drop_stale_bid(&mut state);
        }
        state.notify(AuctionNotification::LotUpdated(lot));
        state.sync_countdown(Arc::downgrade(&self.state));
    }

    async fn handle_bid_result(&self, payload: Value) {
        let Some(result) = decode::<BidResult>("bid_result", payload) else {
            return;
        };

        let mut state = self.state.write().await;
        let Some(request) = state.bids.resolve(&result) else {
            tracing::debug!(
                "Ignoring bid result with no matching pending bid (request_id={:?})",
                result.request_id
            );
            return;
        };

        if result.success {
            let amount = result.amount.unwrap_or(request.amount);
            tracing::info!("Bid of {} on lot {} accepted", amount, request.lot_id);
            state.notify(AuctionNotification::BidAccepted {
                lot_id: request.lot_id,
                amount,
            });
        } else {
            let rejection = BidRejection::from(&result);
            tracing::info!("Bid on lot {} rejected: {}", request.lot_id, rejection);
            state.notify(AuctionNotification::BidRejected(rejection));
        }
    }

    async fn handle_chat(&self, payload: Value) {
        let Some(message) = decode::<ChatMessage>("chat_message", payload) else {
            return;
        };
        let mut state = self.state.write().await;
        state.view.push_chat(message.clone());
        state.notify(AuctionNotification::ChatReceived(message));
    }

    async fn handle_presence_list(&self, payload: Value) {
        // Either a bare array or wrapped in `users` / `presence`
        let list = match payload {
            Value::Array(_) => payload,
            Value::Object(mut map) => map
                .remove("users")
                .or_else(|| map.remove("presence"))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
        let Some(entries) = decode::<Vec<PresenceEntry>>("presence_list", list) else {
            return;
        };

        let mut state = self.state.write().await;
        let changes = state.view.apply_presence_list(entries);
        if !changes.is_empty() {
            state.notify(AuctionNotification::PresenceChanged(changes));
        }
    }

    async fn handle_user_presence(&self, payload: Value) {
        let Some(entry) = decode::<PresenceEntry>("user_presence", payload) else {
            return;
        };

        let mut state = self.state.write().await;
        let changes = state.view.apply_user_presence(entry);
        if !changes.is_empty() {
            state.notify(AuctionNotification::PresenceChanged(changes));
        }
    }

    async fn handle_status(&self, status: AuctionStatus, notification: AuctionNotification) {
        tracing::info!("Auction status is now {:?}", status);
        let mut state = self.state.write().await;
        state.view.set_auction_status(status);
        state.notify(notification);
    }

    async fn handle_ended(&self) {
        tracing::info!("Auction ended");
        let mut state = self.state.write().await;
        state.view.set_auction_status(AuctionStatus::Ended);
        state.stop_countdown();
        self.drop_stale_bid(&mut state);
        state.notify(AuctionNotification::AuctionEnded);
    }

    async fn handle_heartbeat_ack(&self, payload: Value) {
        let received_at = now_millis();
        let ack = decode::<HeartbeatAck>("heartbeat_ack", payload);

        let mut state = self.state.write().await;
        state.pending_heartbeat = None;

        if let Some(ack) = ack
            && state.clock.observe(ack.server_time, received_at)
        {
            tracing::debug!("Clock offset moved to {}ms", state.clock.offset_ms());
        }
    }

    /// A pending bid cannot be confirmed once its lot is gone
    fn drop_stale_bid(&self, state: &mut ClientState) {
        if let Some(request) = state.bids.clear() {
            tracing::info!("Dropping pending bid on lot {}", request.lot_id);
            state.notify(AuctionNotification::BidRejected(BidRejection::LotChanged));
        }
    }
}

fn decode<T: DeserializeOwned>(event: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Dropping malformed {} payload: {}", event, e);
            None
        }
    }
}

fn snapshot_error_message(error: crate::types::AuctionError) -> String {
    match error {
        crate::types::AuctionError::Snapshot(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::{BidRequest, LotStatus};
    use crate::types::inbound_events;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn router() -> (MessageRouter, mpsc::Receiver<AuctionNotification>) {
        let mut state = ClientState::new(Default::default(), 10);
        let rx = state.subscribe(32);
        (
            MessageRouter::new_with_state(Arc::new(RwLock::new(state))),
            rx,
        )
    }

    fn snapshot_payload(lot_id: &str) -> Value {
        json!({
            "auction": {"id": "auc-1", "status": "live"},
            "current_lot": {"id": lot_id, "status": "open", "current_bid": 10},
            "user_state": {"budget_remaining": 100, "slots_filled": 1, "slots_total": 15},
            "participants": [{"user_id": "u1"}],
            "presence": [{"user_id": "u1"}],
            "server_time": now_millis()
        })
    }

    async fn send(router: &MessageRouter, event: &str, payload: Value) -> RouteOutcome {
        router.route(AuctionMessage::new(event, payload)).await
    }

    #[tokio::test]
    async fn snapshot_error_leaves_view_untouched() {
        let (router, mut rx) = router();
        send(&router, inbound_events::AUCTION_SNAPSHOT, snapshot_payload("lot-1")).await;
        let before = router.state.read().await.view.clone();

        let mut bad = snapshot_payload("lot-2");
        bad["error"] = json!("auction unavailable");
        send(&router, inbound_events::AUCTION_SNAPSHOT, bad).await;

        assert_eq!(router.state.read().await.view, before);
        let mut saw_error = false;
        while let Ok(n) = rx.try_recv() {
            if let AuctionNotification::SnapshotError { message } = n {
                assert_eq!(message, "auction unavailable");
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn first_state_clears_initial_wait() {
        let (router, _rx) = router();
        router.state.write().await.awaiting_initial_state = true;
        send(
            &router,
            inbound_events::AUCTION_STATE,
            json!({"current_lot": {"id": "lot-1", "status": "pending"}}),
        )
        .await;
        assert!(!router.state.read().await.awaiting_initial_state);
    }

    #[tokio::test]
    async fn bid_result_resolves_pending_bid() {
        let (router, mut rx) = router();
        send(&router, inbound_events::AUCTION_SNAPSHOT, snapshot_payload("lot-1")).await;
        router
            .state
            .write()
            .await
            .bids
            .begin(BidRequest {
                request_id: "req-1".into(),
                auction_id: "auc-1".into(),
                lot_id: "lot-1".into(),
                amount: 20,
            })
            .unwrap();
        while rx.try_recv().is_ok() {}

        send(
            &router,
            inbound_events::BID_RESULT,
            json!({"success": false, "error": "Outbid", "reason": "bid_too_low", "request_id": "req-1"}),
        )
        .await;

        assert!(!router.state.read().await.bids.is_bidding());
        assert!(matches!(
            rx.try_recv(),
            Ok(AuctionNotification::BidRejected(BidRejection::Server { message, .. })) if message == "Outbid"
        ));
    }

    #[tokio::test]
    async fn lot_change_drops_pending_bid() {
        let (router, mut rx) = router();
        send(&router, inbound_events::AUCTION_SNAPSHOT, snapshot_payload("lot-1")).await;
        router
            .state
            .write()
            .await
            .bids
            .begin(BidRequest {
                request_id: "req-1".into(),
                auction_id: "auc-1".into(),
                lot_id: "lot-1".into(),
                amount: 20,
            })
            .unwrap();
        while rx.try_recv().is_ok() {}

        send(
            &router,
            inbound_events::LOT_UPDATE,
            json!({"lot": {"id": "lot-2", "status": "pending"}}),
        )
        .await;

        assert_eq!(
            rx.try_recv().ok(),
            Some(AuctionNotification::BidRejected(BidRejection::LotChanged))
        );
        let state = router.state.read().await;
        assert_eq!(state.view.current_lot.as_ref().unwrap().status, LotStatus::Pending);
        assert!(!state.bids.is_bidding());
    }

    #[tokio::test]
    async fn heartbeat_acks_within_deadband_keep_offset() {
        let (router, _rx) = router();
        router.state.write().await.pending_heartbeat = Some(1);

        for skew in [100, -120, 140] {
            send(
                &router,
                inbound_events::HEARTBEAT_ACK,
                json!({"server_time": now_millis() + skew}),
            )
            .await;
        }

        let state = router.state.read().await;
        assert_eq!(state.clock.offset_ms(), 0);
        assert_eq!(state.pending_heartbeat, None);
    }

    #[tokio::test]
    async fn extreme_server_times_leave_clock_alone() {
        let (router, mut rx) = router();
        send(&router, inbound_events::AUCTION_SNAPSHOT, snapshot_payload("lot-1")).await;
        let offset = router.state.read().await.clock.offset_ms();
        let view = router.state.read().await.view.clone();
        while rx.try_recv().is_ok() {}

        for server_time in [json!(i64::MIN), json!(i64::MAX), json!(-1), json!(1e300)] {
            router.state.write().await.pending_heartbeat = Some(1);
            let outcome = send(
                &router,
                inbound_events::HEARTBEAT_ACK,
                json!({ "server_time": server_time.clone() }),
            )
            .await;
            assert_eq!(outcome, RouteOutcome::Continue);
            assert_eq!(router.state.read().await.pending_heartbeat, None);

            let mut snapshot = snapshot_payload("lot-2");
            snapshot["server_time"] = server_time.clone();
            send(&router, inbound_events::AUCTION_SNAPSHOT, snapshot).await;
            send(
                &router,
                inbound_events::AUCTION_STATE,
                json!({ "server_time": server_time }),
            )
            .await;
        }

        let state = router.state.read().await;
        assert_eq!(state.clock.offset_ms(), offset);
        assert_eq!(state.view, view);
        drop(state);

        let mut errors = 0;
        while let Ok(n) = rx.try_recv() {
            assert!(matches!(n, AuctionNotification::SnapshotError { .. }));
            errors += 1;
        }
        assert_eq!(errors, 8);
    }

    #[tokio::test]
    async fn disconnect_event_is_server_initiated() {
        let (router, _rx) = router();
        assert_eq!(
            send(&router, inbound_events::DISCONNECT, json!({})).await,
            RouteOutcome::Disconnect(DisconnectReason::ServerInitiated)
        );
        assert_eq!(
            router.route_text("not json").await,
            RouteOutcome::Continue
        );
    }

    #[tokio::test]
    async fn presence_list_accepts_wrapped_form() {
        let (router, mut rx) = router();
        send(
            &router,
            inbound_events::PRESENCE_LIST,
            json!({"users": [{"user_id": "u1"}, {"user_id": "u2", "status": "away"}]}),
        )
        .await;

        assert_eq!(router.state.read().await.view.presence.online_count(), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(AuctionNotification::PresenceChanged(changes)) if changes.joins == vec!["u1".to_string()]
        ));
    }
}
