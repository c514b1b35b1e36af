use super::{AuctionView, BidResult};
use serde::Serialize;
use thiserror::Error;

/// Why a bid was not accepted, either locally or by the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidRejection {
    #[error("there is no lot open for bidding")]
    NoOpenLot,
    #[error("bid of {offered} must be higher than the current bid of {current}")]
    TooLow { current: u64, offered: u64 },
    #[error("bid of {offered} exceeds your remaining budget of {budget}")]
    OverBudget { budget: u64, offered: u64 },
    #[error("a bid is already waiting for confirmation")]
    AlreadyPending,
    #[error("the connection dropped before the bid was confirmed")]
    ConnectionLost,
    #[error("the lot closed before the bid was confirmed")]
    LotChanged,
    #[error("{message}")]
    Server {
        reason: Option<String>,
        message: String,
    },
}

/// An outbound bid. `request_id` is echoed back in `bid_result` by servers
/// that support correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidRequest {
    pub request_id: String,
    pub auction_id: String,
    pub lot_id: String,
    pub amount: u64,
}

/// Client-side pre-validation. The server still has the final say.
pub fn validate_bid(view: &AuctionView, amount: u64) -> Result<(), BidRejection> {
    let lot = view
        .current_lot
        .as_ref()
        .filter(|lot| lot.is_biddable())
        .ok_or(BidRejection::NoOpenLot)?;

    if amount <= lot.current_bid {
        return Err(BidRejection::TooLow {
            current: lot.current_bid,
            offered: amount,
        });
    }

    if let Some(user) = &view.user
        && !user.can_afford(amount)
    {
        return Err(BidRejection::OverBudget {
            budget: user.budget_remaining,
            offered: amount,
        });
    }

    Ok(())
}

/// Tracks the single bid waiting for its `bid_result`.
#[derive(Debug, Default)]
pub struct BidTracker {
    pending: Option<BidRequest>,
}

impl BidTracker {
    /// Whether the bidding spinner should show
    pub fn is_bidding(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&BidRequest> {
        self.pending.as_ref()
    }

    pub fn begin(&mut self, request: BidRequest) -> Result<(), BidRejection> {
        if self.pending.is_some() {
            return Err(BidRejection::AlreadyPending);
        }
        self.pending = Some(request);
        Ok(())
    }

    /// Matches a result to the pending bid and clears it.
    ///
    /// A result that echoes a `request_id` only resolves the bid with that id.
    /// Without one, it resolves whatever bid is pending.
    pub fn resolve(&mut self, result: &BidResult) -> Option<BidRequest> {
        let matches = match (&self.pending, &result.request_id) {
            (None, _) => false,
            (Some(pending), Some(id)) => &pending.request_id == id,
            (Some(_), None) => true,
        };
        if matches { self.pending.take() } else { None }
    }

    /// Drops the pending bid, e.g. when the lot changes or the connection drops
    pub fn clear(&mut self) -> Option<BidRequest> {
        self.pending.take()
    }
}

impl From<&BidResult> for BidRejection {
    fn from(result: &BidResult) -> Self {
        let message = result
            .error
            .clone()
            .or_else(|| result.reason.clone())
            .unwrap_or_else(|| "bid was not accepted".to_string());
        Self::Server {
            reason: result.reason.clone(),
            message,
        }
    }
}
