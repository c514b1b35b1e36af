// Auction module - local projection of server-pushed auction state
mod bid;
mod lot;
mod models;
mod presence;
mod snapshot;
mod view;
pub mod wire;

pub use bid::{BidRejection, BidRequest, BidTracker, validate_bid};
pub use lot::{Lot, LotStatus, LotUpdate};
pub use models::{
    AuctionMeta, AuctionStatus, BidResult, ChatMessage, HeartbeatAck, Participant, UserBudget,
};
pub use presence::{Presence, PresenceChanges, PresenceEntry, PresenceStatus};
pub use snapshot::AuctionSnapshot;
pub use view::AuctionView;
