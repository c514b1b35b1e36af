use crate::auction::BidRejection;
use thiserror::Error;

/// Errors that can occur when using the auction realtime client.
///
/// The variants follow the recovery policy of the connection: some are terminal
/// for the session (the user has to log in again or reload), some are retried by
/// the reconnect procedure, and bid rejections never touch connection health.
#[derive(Error, Debug)]
pub enum AuctionError {
    /// The auth token was rejected, either by the pre-flight check or during the handshake
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General transport error with descriptive message
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server ended the session deliberately
    #[error("Disconnected by server")]
    ServerDisconnect,

    /// A snapshot carried an error instead of state
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (auth check and polling transport)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bid failed local validation or was refused by the server
    #[error("Bid rejected: {0}")]
    BidRejected(#[from] BidRejection),

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

impl AuctionError {
    /// Whether this error means the credentials are no longer accepted.
    ///
    /// Besides the explicit variant this recognises HTTP 401/403 handshake
    /// responses and the `auth failed` markers some servers put in error text.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Authentication(_) => true,
            Self::WebSocket(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                matches!(response.status().as_u16(), 401 | 403)
            }
            Self::Http(e) => e
                .status()
                .is_some_and(|status| matches!(status.as_u16(), 401 | 403)),
            Self::Transport(message) => has_auth_marker(message),
            _ => false,
        }
    }

    /// Whether the reconnect procedure must not retry after this error.
    pub fn is_terminal(&self) -> bool {
        self.is_auth_failure() || matches!(self, Self::ServerDisconnect | Self::Config(_))
    }
}

/// Looks for a 401/403 status or an explicit auth failure in free-form error text.
///
/// Status codes only count right after `http`, `status` or `code`, so ports
/// and ids that happen to contain the digits are not mistaken for them.
fn has_auth_marker(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if lower.contains("auth failed")
        || lower.contains("authentication failed")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
    {
        return true;
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    words.windows(2).any(|pair| {
        matches!(pair[0], "http" | "status" | "code") && matches!(pair[1], "401" | "403")
    })
}

/// Convenience type alias for `Result<T, AuctionError>`.
pub type Result<T> = std::result::Result<T, AuctionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_with_auth_markers_are_auth_failures() {
        assert!(AuctionError::Transport("HTTP 403 Forbidden".into()).is_auth_failure());
        assert!(AuctionError::Transport("Auth failed: token expired".into()).is_auth_failure());
        assert!(!AuctionError::Transport("connection reset by peer".into()).is_auth_failure());
        assert!(
            AuctionError::Transport("handshake failed with status 401".into()).is_auth_failure()
        );
    }

    #[test]
    fn status_digits_in_urls_are_not_auth_failures() {
        for message in [
            "auth check failed: error sending request for url (http://localhost:4030/api/auth/check)",
            "error sending request for url (http://localhost:4010/realtime)",
            "poll send failed for session 4031403",
            "auth check returned unexpected status 503 Service Unavailable",
        ] {
            let error = AuctionError::Transport(message.into());
            assert!(!error.is_auth_failure(), "{message}");
            assert!(!error.is_terminal(), "{message}");
        }
    }

    #[test]
    fn terminal_classification() {
        assert!(AuctionError::Authentication("expired".into()).is_terminal());
        assert!(AuctionError::ServerDisconnect.is_terminal());
        assert!(!AuctionError::NotConnected.is_terminal());
        assert!(!AuctionError::Transport("network unreachable".into()).is_terminal());
    }
}
