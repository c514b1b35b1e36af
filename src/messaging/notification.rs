use crate::auction::{BidRejection, ChatMessage, Lot, PresenceChanges};
use crate::client::ConnectionState;
use std::time::Duration;

/// Everything the UI layer needs to react to.
///
/// Connection problems, bid problems and data problems are separate variants
/// because the user has to do something different for each.
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionNotification {
    ConnectionStateChanged(ConnectionState),
    /// The token was rejected; the user must log in again
    AuthenticationExpired { message: String },
    /// The connection is gone for good; the user must reload
    ConnectionLost { message: String },
    /// A reconnect attempt is scheduled
    Reconnecting { attempt: u32, delay: Duration },
    /// The first auction state never arrived
    LoadTimeout,
    /// A snapshot signalled an error and was not applied
    SnapshotError { message: String },
    /// Auction, lot, budget, participants or presence were replaced
    StateUpdated,
    LotUpdated(Lot),
    TimerTick { lot_id: String, remaining_secs: u64 },
    BidAccepted { lot_id: String, amount: u64 },
    BidRejected(BidRejection),
    ChatReceived(ChatMessage),
    PresenceChanged(PresenceChanges),
    AuctionPaused,
    AuctionResumed,
    AuctionEnded,
}

impl AuctionNotification {
    /// Text to show the user, for notifications that need one
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::AuthenticationExpired { .. } => {
                Some("Your session has expired. Please log in again.".to_string())
            }
            Self::ConnectionLost { message } => Some(message.clone()),
            Self::Reconnecting { attempt, .. } => Some(format!(
                "Connection lost. Reconnecting (attempt {})...",
                attempt
            )),
            Self::LoadTimeout => Some("Failed to load auction data.".to_string()),
            Self::SnapshotError { message } => {
                Some(format!("Could not refresh auction state: {}", message))
            }
            Self::BidRejected(rejection) => Some(format!("Bid failed: {}", rejection)),
            Self::BidAccepted { amount, .. } => Some(format!("Bid of {} placed.", amount)),
            Self::AuctionPaused => Some("The auction has been paused.".to_string()),
            Self::AuctionResumed => Some("The auction has resumed.".to_string()),
            Self::AuctionEnded => Some("The auction has ended.".to_string()),
            _ => None,
        }
    }
}
