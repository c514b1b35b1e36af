use crate::types::constants::{inbound_events, outbound_events};
use serde::{Deserialize, Serialize};

/// Type-safe auction channel events, in both directions.
///
/// Serialized as the bare event name so unknown server events survive a
/// round trip as [`AuctionEvent::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuctionEvent {
    // Outbound
    JoinRoom,
    LeaveRoom,
    PlaceBid,
    SendChat,
    Heartbeat,

    // Inbound
    ConnectionStatus,
    AuctionSnapshot,
    AuctionState,
    LotUpdate,
    BidResult,
    ChatMessage,
    PresenceList,
    UserPresence,
    AuctionPaused,
    AuctionResumed,
    AuctionEnded,
    HeartbeatAck,
    Disconnect,

    /// Any event this client does not know about
    Custom(String),
}

impl AuctionEvent {
    /// Parse an event name
    pub fn parse(s: &str) -> Self {
        match s {
            outbound_events::JOIN_ROOM => Self::JoinRoom,
            outbound_events::LEAVE_ROOM => Self::LeaveRoom,
            outbound_events::PLACE_BID => Self::PlaceBid,
            outbound_events::SEND_CHAT => Self::SendChat,
            outbound_events::HEARTBEAT => Self::Heartbeat,
            inbound_events::CONNECTION_STATUS => Self::ConnectionStatus,
            inbound_events::AUCTION_SNAPSHOT => Self::AuctionSnapshot,
            inbound_events::AUCTION_STATE => Self::AuctionState,
            inbound_events::LOT_UPDATE => Self::LotUpdate,
            inbound_events::BID_RESULT => Self::BidResult,
            inbound_events::CHAT_MESSAGE => Self::ChatMessage,
            inbound_events::PRESENCE_LIST => Self::PresenceList,
            inbound_events::USER_PRESENCE => Self::UserPresence,
            inbound_events::AUCTION_PAUSED => Self::AuctionPaused,
            inbound_events::AUCTION_RESUMED => Self::AuctionResumed,
            inbound_events::AUCTION_ENDED => Self::AuctionEnded,
            inbound_events::HEARTBEAT_ACK => Self::HeartbeatAck,
            inbound_events::DISCONNECT => Self::Disconnect,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Convert event to its wire name
    pub fn as_str(&self) -> &str {
        match self {
            Self::JoinRoom => outbound_events::JOIN_ROOM,
            Self::LeaveRoom => outbound_events::LEAVE_ROOM,
            Self::PlaceBid => outbound_events::PLACE_BID,
            Self::SendChat => outbound_events::SEND_CHAT,
            Self::Heartbeat => outbound_events::HEARTBEAT,
            Self::ConnectionStatus => inbound_events::CONNECTION_STATUS,
            Self::AuctionSnapshot => inbound_events::AUCTION_SNAPSHOT,
            Self::AuctionState => inbound_events::AUCTION_STATE,
            Self::LotUpdate => inbound_events::LOT_UPDATE,
            Self::BidResult => inbound_events::BID_RESULT,
            Self::ChatMessage => inbound_events::CHAT_MESSAGE,
            Self::PresenceList => inbound_events::PRESENCE_LIST,
            Self::UserPresence => inbound_events::USER_PRESENCE,
            Self::AuctionPaused => inbound_events::AUCTION_PAUSED,
            Self::AuctionResumed => inbound_events::AUCTION_RESUMED,
            Self::AuctionEnded => inbound_events::AUCTION_ENDED,
            Self::HeartbeatAck => inbound_events::HEARTBEAT_ACK,
            Self::Disconnect => inbound_events::DISCONNECT,
            Self::Custom(s) => s,
        }
    }
}

impl From<&str> for AuctionEvent {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for AuctionEvent {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<AuctionEvent> for String {
    fn from(event: AuctionEvent) -> Self {
        event.as_str().to_string()
    }
}

impl std::fmt::Display for AuctionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
