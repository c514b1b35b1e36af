use serde::{Deserialize, Serialize};

use crate::AuctionEvent;

/// A single frame on the auction channel: an event name plus its JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuctionMessage {
    pub event: AuctionEvent,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl AuctionMessage {
    pub fn new(event: impl Into<AuctionEvent>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}
