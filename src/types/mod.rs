pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{AuctionError, Result};
pub use message::AuctionMessage;
