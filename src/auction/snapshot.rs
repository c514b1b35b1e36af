use super::{AuctionMeta, Lot, Participant, PresenceEntry, UserBudget, wire};
use crate::types::{AuctionError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Full auction state pushed by the server.
///
/// Carried by both `auction_snapshot` (sent after every join, with the server
/// clock) and `auction_state`. Always applied as a whole: a payload that fails
/// to parse or signals an error never reaches the projection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuctionSnapshot {
    #[serde(default)]
    pub auction: Option<AuctionMeta>,
    #[serde(default)]
    pub current_lot: Option<Lot>,
    #[serde(default, alias = "user")]
    pub user_state: Option<UserBudget>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub presence: Vec<PresenceEntry>,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub server_time: Option<i64>,
}

impl AuctionSnapshot {
    /// Decodes and checks a snapshot payload
    pub fn parse(payload: &Value) -> Result<Self> {
        let snapshot = Self::parse_state(payload)?;

        if snapshot.auction.is_none() {
            return Err(AuctionError::Snapshot(
                "snapshot is missing auction metadata".to_string(),
            ));
        }

        Ok(snapshot)
    }

    /// Decodes an `auction_state` payload, which may omit parts it did not change
    pub fn parse_state(payload: &Value) -> Result<Self> {
        if let Some(message) = error_message(payload.get("error")) {
            return Err(AuctionError::Snapshot(message));
        }

        serde_json::from_value(payload.clone())
            .map_err(|e| AuctionError::Snapshot(format!("malformed snapshot: {e}")))
    }
}

fn error_message(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "auction": {"id": "auc-1", "name": "Sunday League", "status": "live"},
            "current_lot": {
                "id": "lot-9",
                "player_name": "B. Saka",
                "status": "open",
                "current_bid": 25,
                "top_bidder": "u2",
                "timer_ends_at": 1_000_030_000i64
            },
            "user_state": {"budget_remaining": 180, "slots_filled": 3, "slots_total": 15},
            "participants": [{"user_id": "u1"}, {"user_id": "u2", "display_name": "Kev"}],
            "presence": [{"user_id": "u1", "status": "online"}],
            "server_time": 1_000_000_000i64
        })
    }

    #[test]
    fn parses_full_snapshot() {
        let snapshot = AuctionSnapshot::parse(&sample_payload()).unwrap();
        assert_eq!(snapshot.auction.as_ref().unwrap().id, "auc-1");
        assert_eq!(snapshot.participants.len(), 2);
        assert_eq!(snapshot.server_time, Some(1_000_000_000));
        assert_eq!(
            snapshot.current_lot.unwrap().timer_ends_at,
            Some(1_000_030_000)
        );
    }

    #[test]
    fn error_field_rejects_snapshot() {
        let mut payload = sample_payload();
        payload["error"] = json!("auction not found");
        match AuctionSnapshot::parse(&payload) {
            Err(AuctionError::Snapshot(msg)) => assert_eq!(msg, "auction not found"),
            other => panic!("expected snapshot error, got {other:?}"),
        }

        let object_error = json!({"error": {"code": 404, "message": "gone"}});
        assert!(matches!(
            AuctionSnapshot::parse(&object_error),
            Err(AuctionError::Snapshot(msg)) if msg == "gone"
        ));
    }

    #[test]
    fn null_error_field_is_ignored() {
        let mut payload = sample_payload();
        payload["error"] = Value::Null;
        assert!(AuctionSnapshot::parse(&payload).is_ok());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let payload = json!({"auction": {"id": "a"}, "participants": "nope"});
        assert!(matches!(
            AuctionSnapshot::parse(&payload),
            Err(AuctionError::Snapshot(_))
        ));
    }

    #[test]
    fn state_update_may_omit_auction() {
        let payload = json!({"current_lot": {"id": "lot-2", "status": "pending"}});
        let state = AuctionSnapshot::parse_state(&payload).unwrap();
        assert!(state.auction.is_none());
        assert_eq!(state.current_lot.unwrap().id, "lot-2");
        assert!(AuctionSnapshot::parse(&payload).is_err());
    }

    #[test]
    fn out_of_range_server_time_rejects_snapshot() {
        let mut payload = sample_payload();
        payload["server_time"] = json!(i64::MIN);
        assert!(matches!(
            AuctionSnapshot::parse(&payload),
            Err(AuctionError::Snapshot(_))
        ));

        let mut payload = sample_payload();
        payload["current_lot"]["timer_ends_at"] = json!(i64::MAX);
        assert!(AuctionSnapshot::parse_state(&payload).is_err());
    }
}
