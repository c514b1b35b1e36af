/// Outbound event names (client → server)
pub mod outbound_events {
    pub const JOIN_ROOM: &str = "join_room";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const PLACE_BID: &str = "place_bid";
    pub const SEND_CHAT: &str = "send_chat";
    pub const HEARTBEAT: &str = "heartbeat";
}

/// Inbound event names (server → client)
pub mod inbound_events {
    pub const CONNECTION_STATUS: &str = "connection_status";
    pub const AUCTION_SNAPSHOT: &str = "auction_snapshot";
    pub const AUCTION_STATE: &str = "auction_state";
    pub const LOT_UPDATE: &str = "lot_update";
    pub const BID_RESULT: &str = "bid_result";
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const PRESENCE_LIST: &str = "presence_list";
    pub const USER_PRESENCE: &str = "user_presence";
    pub const AUCTION_PAUSED: &str = "auction_paused";
    pub const AUCTION_RESUMED: &str = "auction_resumed";
    pub const AUCTION_ENDED: &str = "auction_ended";
    pub const HEARTBEAT_ACK: &str = "heartbeat_ack";
    pub const DISCONNECT: &str = "disconnect";
}

/// Transport names used during negotiation
pub const TRANSPORT_WEBSOCKET: &str = "websocket";
pub const TRANSPORT_POLLING: &str = "polling";

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30_000;

/// How long to wait for the first auction state after joining (milliseconds)
pub const SNAPSHOT_TIMEOUT: u64 = 15_000;

/// Countdown display cadence (milliseconds)
pub const COUNTDOWN_TICK: u64 = 1_000;

/// Offset changes smaller than this are treated as jitter (milliseconds)
pub const OFFSET_DEADBAND_MS: i64 = 150;

/// Latest accepted wire timestamp, 9999-12-31T23:59:59.999Z (epoch milliseconds)
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Reconnect backoff (milliseconds)
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const RECONNECT_BASE_DELAY: u64 = 1_000;
pub const RECONNECT_MAX_DELAY: u64 = 10_000;
pub const RECONNECT_MAX_JITTER: u64 = 1_000;
pub const DETERMINISTIC_STEP_DELAY: u64 = 50;
pub const DETERMINISTIC_MAX_DELAY: u64 = 200;

/// Notification channel capacity
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Chat messages kept in the local projection
pub const MAX_CHAT_HISTORY: usize = 100;

/// Default endpoint when no environment override is present
pub const DEFAULT_ORIGIN: &str = "http://localhost:3001";
pub const DEFAULT_SOCKET_PATH: &str = "/realtime";
pub const DEFAULT_AUTH_CHECK_PATH: &str = "/api/auth/check";

/// WebSocket close codes the server uses to end a session on purpose
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_POLICY: u16 = 1008;
pub const WS_CLOSE_APP_RANGE: std::ops::RangeInclusive<u16> = 4000..=4999;
