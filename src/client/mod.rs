// Module declarations
mod builder;
mod config;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{AuctionClientBuilder, AuctionClientOptions};
pub use config::{
    BACKOFF_MODE_VAR, ConnectionConfig, ORIGIN_VARS, PATH_VARS, backoff_mode_from_env,
    backoff_mode_from_lookup, ws_to_http_endpoint,
};
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::AuctionClient;
pub use state::ClientState;
