use crate::infrastructure::BackoffMode;
use crate::types::{
    AuctionError, DEFAULT_AUTH_CHECK_PATH, DEFAULT_ORIGIN, DEFAULT_SOCKET_PATH, Result,
};
use url::Url;

/// Environment variables holding the server origin, in lookup order.
///
/// Deployments name these after whatever bundler builds the front end, so all
/// three spellings are honoured.
pub const ORIGIN_VARS: [&str; 3] = [
    "AUCTION_SOCKET_URL",
    "VITE_SOCKET_URL",
    "NEXT_PUBLIC_SOCKET_URL",
];

/// Environment variables holding the realtime path, in lookup order.
pub const PATH_VARS: [&str; 3] = [
    "AUCTION_SOCKET_PATH",
    "VITE_SOCKET_PATH",
    "NEXT_PUBLIC_SOCKET_PATH",
];

pub const BACKOFF_MODE_VAR: &str = "AUCTION_BACKOFF_MODE";

/// Where the auction server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server origin, e.g. `https://auction.example.com`
    pub origin: String,
    /// Path of the realtime endpoint
    pub path: String,
    /// Path of the pre-flight authentication check
    pub auth_check_path: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            path: DEFAULT_SOCKET_PATH.to_string(),
            auth_check_path: DEFAULT_AUTH_CHECK_PATH.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    /// Reads the origin and path from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the origin and path through `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(origin) = first(&ORIGIN_VARS) {
            config.origin = origin;
        }
        if let Some(path) = first(&PATH_VARS) {
            config.path = path;
        }
        config
    }

    /// WebSocket URL of the realtime endpoint
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.join(&self.path)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(AuctionError::Config(format!(
                    "unsupported origin scheme: {other}"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| AuctionError::Config(format!("cannot use scheme {scheme}")))?;
        Ok(url)
    }

    /// HTTP URL of the realtime endpoint (used by the polling transport)
    pub fn http_url(&self) -> Result<Url> {
        Url::parse(&ws_to_http_endpoint(self.ws_url()?.as_str())).map_err(AuctionError::from)
    }

    /// URL of the pre-flight authentication check
    pub fn auth_check_url(&self) -> Result<Url> {
        let url = self.join(&self.auth_check_path)?;
        Url::parse(&ws_to_http_endpoint(url.as_str())).map_err(AuctionError::from)
    }

    fn join(&self, path: &str) -> Result<Url> {
        let base = Url::parse(self.origin.trim_end_matches('/'))?;
        let mut url = base.join(&format!("/{}", path.trim_start_matches('/')))?;
        url.set_query(None);
        Ok(url)
    }
}

/// Reads the backoff mode from the environment (`deterministic` or default).
///
/// This is what [`AuctionClientOptions::default`](super::AuctionClientOptions)
/// uses.
pub fn backoff_mode_from_env() -> BackoffMode {
    backoff_mode_from_lookup(|key| std::env::var(key).ok())
}

/// Reads the backoff mode through `lookup`
pub fn backoff_mode_from_lookup<F>(lookup: F) -> BackoffMode
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(BACKOFF_MODE_VAR).as_deref().map(str::trim) {
        Some("deterministic") | Some("test") => BackoffMode::Deterministic,
        _ => BackoffMode::Production,
    }
}

/// Converts a WebSocket endpoint to its HTTP form, dropping any query string
pub fn ws_to_http_endpoint(ws_endpoint: &str) -> String {
    ws_endpoint
        .replace("ws://", "http://")
        .replace("wss://", "https://")
        .split('?')
        .next()
        .unwrap_or(ws_endpoint)
        .to_string()
}
