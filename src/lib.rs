//! # Auction Realtime
//!
//! Realtime client for a live auction room: one authenticated connection per
//! auction view, server-pushed state applied to a local projection, a server
//! clock offset for countdowns, and bounded reconnect with backoff.
//!
//! ## Example
//!
//! ```no_run
//! use auction_realtime::{AuctionClient, AuctionClientOptions, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AuctionClient::new(
//!         ConnectionConfig::from_env(),
//!         AuctionClientOptions {
//!             auth_token: "session-token".to_string(),
//!             auction_id: "auction-42".to_string(),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     client.connect().await?;
//!     client.place_bid(25).await?;
//!     client.teardown().await?;
//!     Ok(())
//! }
//! ```

pub mod auction;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod transport;
pub mod types;

pub use auction::{AuctionView, BidRejection, BidRequest, Lot, LotStatus};
pub use client::{
    AuctionClient, AuctionClientBuilder, AuctionClientOptions, ConnectionConfig, ConnectionState,
};
pub use infrastructure::{AuthCheck, BackoffMode, HttpAuthCheck};
pub use messaging::{AuctionEvent, AuctionNotification};
pub use transport::{
    DisconnectReason, Endpoint, Transport, TransportEvent, TransportFactory, TransportKind,
};
pub use types::{AuctionError, AuctionMessage, Result};
