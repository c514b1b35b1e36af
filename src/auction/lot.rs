use super::wire;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single lot.
///
/// `pending → open → going_once → going_twice → sold | unsold`. A late bid may
/// send a lot back to `open` (the server extends the timer), so the backward
/// edges from the "going" states are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Pending,
    Open,
    GoingOnce,
    GoingTwice,
    Sold,
    Unsold,
}

impl LotStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sold | Self::Unsold)
    }

    /// Whether bids are accepted and the countdown is shown
    pub fn is_biddable(self) -> bool {
        matches!(self, Self::Open | Self::GoingOnce | Self::GoingTwice)
    }

    pub fn can_transition_to(self, next: LotStatus) -> bool {
        use LotStatus::*;

        if self == next {
            return !self.is_terminal();
        }
        match self {
            Pending => matches!(next, Open | Unsold),
            Open => matches!(next, GoingOnce | Sold | Unsold),
            GoingOnce => matches!(next, Open | GoingTwice | Sold | Unsold),
            GoingTwice => matches!(next, Open | Sold | Unsold),
            Sold | Unsold => false,
        }
    }
}

/// An auctionable item with its own bidding timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub player_id: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    pub status: LotStatus,
    #[serde(default)]
    pub current_bid: u64,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub top_bidder: Option<String>,
    /// Absolute server deadline in epoch milliseconds
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub timer_ends_at: Option<i64>,
}

impl Lot {
    pub fn is_biddable(&self) -> bool {
        self.status.is_biddable()
    }
}

/// Payload of a `lot_update` event.
///
/// Servers send either `{ "lot": {...}, "timer_ends_at": ... }` or the lot
/// fields directly; a top-level deadline wins over the nested one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LotUpdate {
    Wrapped {
        lot: Lot,
        #[serde(default, deserialize_with = "wire::opt_timestamp")]
        timer_ends_at: Option<i64>,
    },
    Bare(Lot),
}

impl LotUpdate {
    pub fn into_lot(self) -> Lot {
        match self {
            Self::Wrapped { mut lot, timer_ends_at } => {
                if timer_ends_at.is_some() {
                    lot.timer_ends_at = timer_ends_at;
                }
                lot
            }
            Self::Bare(lot) => lot,
        }
    }
}
