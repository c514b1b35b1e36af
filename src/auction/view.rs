use std::collections::VecDeque;

use super::{
    AuctionMeta, AuctionSnapshot, AuctionStatus, ChatMessage, Lot, Participant, Presence,
    PresenceChanges, PresenceEntry, UserBudget,
};
use crate::types::MAX_CHAT_HISTORY;
use serde::Serialize;

/// The client's local projection of the auction.
///
/// Nothing in here is authoritative. Every field is overwritten by server
/// pushes; the client never edits it on its own after sending a bid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuctionView {
    pub auction: Option<AuctionMeta>,
    pub current_lot: Option<Lot>,
    pub user: Option<UserBudget>,
    pub participants: Vec<Participant>,
    pub presence: Presence,
    pub chat: VecDeque<ChatMessage>,
    /// Server time of the last full state that was applied
    pub synced_at: Option<i64>,
}

impl AuctionView {
    pub fn current_lot_id(&self) -> Option<&str> {
        self.current_lot.as_ref().map(|lot| lot.id.as_str())
    }

    /// Replaces auction, lot, user, participants and presence in one step.
    ///
    /// The chat log is not part of a snapshot and is left alone.
    pub fn apply_snapshot(&mut self, snapshot: AuctionSnapshot) -> PresenceChanges {
        self.auction = snapshot.auction;
        self.current_lot = snapshot.current_lot;
        self.user = snapshot.user_state;
        self.participants = snapshot.participants;
        self.synced_at = snapshot.server_time;
        self.presence.sync_list(snapshot.presence)
    }

    /// Applies an `auction_state` push.
    ///
    /// Parts the payload leaves out keep their current value. An empty
    /// participant or presence list counts as left out, since the connected
    /// user is always in both.
    pub fn apply_auction_state(&mut self, state: AuctionSnapshot) -> PresenceChanges {
        if state.auction.is_some() {
            self.auction = state.auction;
        }
        if state.current_lot.is_some() {
            self.current_lot = state.current_lot;
        }
        if state.user_state.is_some() {
            self.user = state.user_state;
        }
        if !state.participants.is_empty() {
            self.participants = state.participants;
        }
        if state.server_time.is_some() {
            self.synced_at = state.server_time;
        }
        if state.presence.is_empty() {
            PresenceChanges::default()
        } else {
            self.presence.sync_list(state.presence)
        }
    }

    /// Replaces the current lot. Returns true when a different lot took its place.
    pub fn apply_lot_update(&mut self, lot: Lot) -> bool {
        let lot_changed = match &self.current_lot {
            Some(previous) if previous.id == lot.id => {
                if !previous.status.can_transition_to(lot.status) {
                    tracing::debug!(
                        "Lot {} moved {:?} -> {:?} outside the usual lifecycle",
                        lot.id,
                        previous.status,
                        lot.status
                    );
                }
                false
            }
            _ => true,
        };
        self.current_lot = Some(lot);
        lot_changed
    }

    pub fn set_auction_status(&mut self, status: AuctionStatus) {
        if let Some(auction) = self.auction.as_mut() {
            auction.status = status;
        }
    }

    pub fn apply_presence_list(&mut self, entries: Vec<PresenceEntry>) -> PresenceChanges {
        self.presence.sync_list(entries)
    }

    pub fn apply_user_presence(&mut self, entry: PresenceEntry) -> PresenceChanges {
        self.presence.apply_user(entry)
    }

    pub fn push_chat(&mut self, message: ChatMessage) {
        if self.chat.len() == MAX_CHAT_HISTORY {
            self.chat.pop_front();
        }
        self.chat.push_back(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::{LotStatus, PresenceStatus};
    use serde_json::json;

    fn snapshot() -> AuctionSnapshot {
        AuctionSnapshot::parse(&json!({
            "auction": {"id": "auc-1", "status": "live"},
            "current_lot": {"id": "lot-1", "status": "open", "current_bid": 5, "timer_ends_at": 50_000},
            "user_state": {"budget_remaining": 200, "slots_filled": 0, "slots_total": 15},
            "participants": [{"user_id": "u1"}],
            "presence": [{"user_id": "u1"}],
            "server_time": 20_000
        }))
        .unwrap()
    }

    fn lot(id: &str, status: LotStatus, bid: u64) -> Lot {
        Lot {
            id: id.to_string(),
            player_id: None,
            player_name: None,
            status,
            current_bid: bid,
            top_bidder: None,
            timer_ends_at: Some(60_000),
        }
    }

    #[test]
    fn applying_same_snapshot_twice_is_idempotent() {
        let mut view = AuctionView::default();
        view.apply_snapshot(snapshot());
        let once = view.clone();
        view.apply_snapshot(snapshot());
        assert_eq!(view, once);
    }

    #[test]
    fn snapshot_replaces_rather_than_merges() {
        let mut view = AuctionView::default();
        view.apply_snapshot(snapshot());
        view.apply_user_presence(PresenceEntry {
            user_id: "u9".into(),
            status: PresenceStatus::Online,
            display_name: None,
        });
        view.apply_lot_update(lot("lot-0", LotStatus::Sold, 99));

        view.apply_snapshot(snapshot());
        assert_eq!(view.current_lot_id(), Some("lot-1"));
        assert_eq!(view.presence.list().len(), 1);
        assert_eq!(view.synced_at, Some(20_000));
    }

    #[test]
    fn auction_state_keeps_omitted_parts() {
        let mut view = AuctionView::default();
        view.apply_snapshot(snapshot());

        let update = AuctionSnapshot::parse_state(&json!({
            "current_lot": {"id": "lot-2", "status": "open", "current_bid": 1}
        }))
        .unwrap();
        view.apply_auction_state(update);

        assert_eq!(view.current_lot_id(), Some("lot-2"));
        assert_eq!(view.auction.as_ref().unwrap().id, "auc-1");
        assert_eq!(view.user.as_ref().unwrap().budget_remaining, 200);
        assert_eq!(view.participants.len(), 1);
    }

    #[test]
    fn lot_update_reports_lot_change() {
        let mut view = AuctionView::default();
        assert!(view.apply_lot_update(lot("lot-1", LotStatus::Open, 1)));
        assert!(!view.apply_lot_update(lot("lot-1", LotStatus::GoingOnce, 2)));
        assert!(view.apply_lot_update(lot("lot-2", LotStatus::Pending, 0)));
        assert_eq!(view.current_lot.as_ref().unwrap().current_bid, 0);
    }

    #[test]
    fn chat_history_is_bounded() {
        let mut view = AuctionView::default();
        for i in 0..(MAX_CHAT_HISTORY + 5) {
            view.push_chat(ChatMessage {
                user_id: "u1".into(),
                display_name: None,
                message: format!("msg {i}"),
                sent_at: None,
            });
        }
        assert_eq!(view.chat.len(), MAX_CHAT_HISTORY);
        assert_eq!(view.chat.front().unwrap().message, "msg 5");
    }

    #[test]
    fn status_change_without_auction_is_noop() {
        let mut view = AuctionView::default();
        view.set_auction_status(AuctionStatus::Paused);
        assert!(view.auction.is_none());
    }
}
