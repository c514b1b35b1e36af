// Messaging module - wire events, routing and user-facing notifications
pub mod event;
pub mod notification;
pub mod router;

pub use event::AuctionEvent;
pub use notification::AuctionNotification;
pub use router::{MessageRouter, RouteOutcome};
