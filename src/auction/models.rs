use super::wire;
use serde::{Deserialize, Serialize};

/// Overall auction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Waiting,
    Live,
    Paused,
    Ended,
    #[serde(other)]
    Unknown,
}

/// Auction metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionMeta {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: AuctionStatus,
}

/// Budget and roster slots of the connected user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBudget {
    pub budget_remaining: u64,
    #[serde(default)]
    pub slots_filled: u32,
    #[serde(default)]
    pub slots_total: u32,
}

impl UserBudget {
    pub fn can_afford(&self, amount: u64) -> bool {
        amount <= self.budget_remaining
    }

    pub fn slots_open(&self) -> u32 {
        self.slots_total.saturating_sub(self.slots_filled)
    }
}

/// A manager taking part in the auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(deserialize_with = "wire::id")]
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub budget_remaining: Option<u64>,
    #[serde(default)]
    pub slots_filled: Option<u32>,
}

/// A chat line in the auction room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(deserialize_with = "wire::id")]
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub message: String,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub sent_at: Option<i64>,
}

/// Payload of a `bid_result` acknowledgment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BidResult {
    pub success: bool,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    /// Machine-readable reason code (`bid_too_low`, `insufficient_budget`, ...)
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub lot_id: Option<String>,
}

/// Payload of a `heartbeat_ack` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HeartbeatAck {
    #[serde(deserialize_with = "wire::timestamp")]
    pub server_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_auction_status_does_not_fail() {
        let meta: AuctionMeta =
            serde_json::from_str(r#"{"id": 3, "status": "drafting"}"#).unwrap();
        assert_eq!(meta.status, AuctionStatus::Unknown);
        assert_eq!(meta.id, "3");
    }

    #[test]
    fn budget_checks() {
        let budget = UserBudget {
            budget_remaining: 40,
            slots_filled: 14,
            slots_total: 15,
        };
        assert!(budget.can_afford(40));
        assert!(!budget.can_afford(41));
        assert_eq!(budget.slots_open(), 1);
    }

    #[test]
    fn bid_result_failure_shape() {
        let result: BidResult = serde_json::from_str(
            r#"{"success": false, "error": "Bid too low", "reason": "bid_too_low"}"#,
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.reason.as_deref(), Some("bid_too_low"));
        assert_eq!(result.request_id, None);
    }
}
