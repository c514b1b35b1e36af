use super::{DisconnectReason, Endpoint, Transport, TransportEvent, TransportKind};
use crate::types::{AuctionError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

const POLL_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Deserialize)]
struct Handshake {
    sid: String,
    #[serde(default)]
    poll_interval_ms: Option<u64>,
}

/// HTTP long-polling fallback.
///
/// A handshake POST to `{endpoint}/poll` returns a session id. A background
/// task then keeps a GET outstanding and feeds every message it returns into
/// a local queue, so `recv` only ever reads from that queue. Outbound
/// messages are POSTed one by one.
pub struct PollingTransport {
    http: reqwest::Client,
    session_url: Url,
    auth_token: String,
    inbound: mpsc::Receiver<TransportEvent>,
    poller: JoinHandle<()>,
    closed: bool,
}

impl PollingTransport {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let http = reqwest::Client::new();
        let poll_url = poll_url(&endpoint.http_url);

        tracing::info!("Opening polling session at {}", poll_url);
        let response = http
            .post(poll_url.clone())
            .bearer_auth(&endpoint.auth_token)
            .json(&serde_json::json!({ "auction_id": endpoint.auction_id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handshake_error(status));
        }

        let handshake: Handshake = response.json().await?;
        let mut session_url = poll_url;
        session_url
            .query_pairs_mut()
            .append_pair("sid", &handshake.sid);

        let (tx, rx) = mpsc::channel(POLL_CHANNEL_CAPACITY);
        let interval =
            Duration::from_millis(handshake.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS));
        let poller = tokio::spawn(poll_loop(
            http.clone(),
            session_url.clone(),
            endpoint.auth_token.clone(),
            interval,
            tx,
        ));

        Ok(Self {
            http,
            session_url,
            auth_token: endpoint.auth_token.clone(),
            inbound: rx,
            poller,
            closed: false,
        })
    }
}

fn poll_url(http_url: &Url) -> Url {
    let mut url = http_url.clone();
    let path = format!("{}/poll", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

/// Maps a poll response status to a disconnect, if it is one
fn poll_status_disconnect(status: StatusCode) -> Option<DisconnectReason> {
    match status {
        StatusCode::GONE | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(DisconnectReason::ServerInitiated)
        }
        s if s.is_success() => None,
        s => Some(DisconnectReason::TransportError(format!(
            "poll failed with status {}",
            s
        ))),
    }
}

/// Maps a failed handshake status to the error the reconnect policy expects
fn handshake_error(status: StatusCode) -> AuctionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuctionError::Authentication(
            format!("polling handshake rejected with status {}", status),
        ),
        StatusCode::GONE => AuctionError::ServerDisconnect,
        _ => AuctionError::Transport(format!(
            "polling handshake failed with status {}",
            status
        )),
    }
}

async fn poll_loop(
    http: reqwest::Client,
    session_url: Url,
    auth_token: String,
    interval: Duration,
    tx: mpsc::Sender<TransportEvent>,
) {
    loop {
        let response = match http
            .get(session_url.clone())
            .bearer_auth(&auth_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Poll request failed: {}", e);
                let _ = tx
                    .send(TransportEvent::Closed(DisconnectReason::TransportError(
                        e.to_string(),
                    )))
                    .await;
                return;
            }
        };

        let status = response.status();
        if let Some(reason) = poll_status_disconnect(status) {
            tracing::warn!("Polling session ended with status {}", status);
            let _ = tx.send(TransportEvent::Closed(reason)).await;
            return;
        }

        if status != StatusCode::NO_CONTENT {
            let messages: Vec<serde_json::Value> = match response.json().await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::error!("Failed to parse poll response: {}", e);
                    Vec::new()
                }
            };
            for message in messages {
                if tx
                    .send(TransportEvent::Message(message.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        tokio::time::sleep(interval).await;
    }
}

#[async_trait]
impl Transport for PollingTransport {
    async fn send(&mut self, message: String) -> Result<()> {
        if self.closed {
            return Err(AuctionError::NotConnected);
        }

        let response = self
            .http
            .post(self.session_url.clone())
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .body(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuctionError::Transport(format!(
                "poll send failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        let event = self.inbound.recv().await;
        if matches!(event, None | Some(TransportEvent::Closed(_))) {
            self.closed = true;
        }
        event
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.poller.abort();

        if let Err(e) = self
            .http
            .delete(self.session_url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await
        {
            tracing::debug!("Polling session close request failed: {}", e);
        }
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }
}

impl Drop for PollingTransport {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_url_appends_segment() {
        let url = Url::parse("https://bids.example.com/realtime/").unwrap();
        assert_eq!(
            poll_url(&url).as_str(),
            "https://bids.example.com/realtime/poll"
        );
    }

    #[test]
    fn gone_means_server_ended_session() {
        assert_eq!(
            poll_status_disconnect(StatusCode::GONE),
            Some(DisconnectReason::ServerInitiated)
        );
        assert_eq!(poll_status_disconnect(StatusCode::OK), None);
        assert_eq!(poll_status_disconnect(StatusCode::NO_CONTENT), None);
        assert!(matches!(
            poll_status_disconnect(StatusCode::BAD_GATEWAY),
            Some(DisconnectReason::TransportError(_))
        ));
    }

    #[test]
    fn handshake_status_classification() {
        assert!(handshake_error(StatusCode::FORBIDDEN).is_auth_failure());
        assert!(matches!(
            handshake_error(StatusCode::GONE),
            AuctionError::ServerDisconnect
        ));
        assert!(handshake_error(StatusCode::GONE).is_terminal());

        let unavailable = handshake_error(StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(unavailable, AuctionError::Transport(_)));
        assert!(!unavailable.is_terminal());
    }
}
