use super::{DisconnectReason, Endpoint, Transport, TransportEvent, TransportKind};
use crate::types::{Result, WS_CLOSE_APP_RANGE, WS_CLOSE_NORMAL, WS_CLOSE_POLICY};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Persistent WebSocket transport
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WebSocketTransport {
    /// Opens the socket, passing the auth token and auction id as query parameters
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let mut url = endpoint.ws_url.clone();
        url.query_pairs_mut()
            .append_pair("token", &endpoint.auth_token)
            .append_pair("auction_id", &endpoint.auction_id);

        tracing::info!("Connecting to {}", endpoint.ws_url);
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;

        Ok(Self {
            stream,
            closed: false,
        })
    }
}

/// Maps a close frame from the server to a disconnect reason
pub(crate) fn close_reason(frame: Option<&CloseFrame>) -> DisconnectReason {
    let Some(frame) = frame else {
        return DisconnectReason::TransportClose;
    };

    let code = u16::from(frame.code);
    if code == WS_CLOSE_NORMAL || code == WS_CLOSE_POLICY || WS_CLOSE_APP_RANGE.contains(&code) {
        DisconnectReason::ServerInitiated
    } else {
        DisconnectReason::TransportClose
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<()> {
        self.stream.send(Message::Text(message.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }

        while let Some(msg_result) = self.stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Received text message: {}", text);
                    return Some(TransportEvent::Message(text.to_string()));
                }
                Ok(Message::Close(frame)) => {
                    if let Some(close_frame) = &frame {
                        tracing::warn!(
                            "Server closed connection: code={:?}, reason='{}'",
                            close_frame.code,
                            close_frame.reason
                        );
                    } else {
                        tracing::warn!("Server closed connection without close frame");
                    }
                    self.closed = true;
                    return Some(TransportEvent::Closed(close_reason(frame.as_ref())));
                }
                Ok(Message::Ping(data)) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Ok(Message::Pong(data)) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Ok(Message::Binary(data)) => {
                    tracing::warn!(
                        "Received unexpected binary message ({} bytes)",
                        data.len()
                    );
                }
                Ok(Message::Frame(_)) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Err(e) => {
                    tracing::error!("WebSocket read error: {}", e);
                    self.closed = true;
                    return Some(TransportEvent::Closed(DisconnectReason::TransportError(
                        e.to_string(),
                    )));
                }
            }
        }

        self.closed = true;
        Some(TransportEvent::Closed(DisconnectReason::TransportClose))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close(None).await?;
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    fn frame(code: u16) -> CloseFrame {
        CloseFrame {
            code: CloseCode::from(code),
            reason: "bye".into(),
        }
    }

    #[test]
    fn deliberate_server_closes_are_terminal() {
        assert_eq!(close_reason(Some(&frame(1000))), DisconnectReason::ServerInitiated);
        assert_eq!(close_reason(Some(&frame(1008))), DisconnectReason::ServerInitiated);
        assert_eq!(close_reason(Some(&frame(4001))), DisconnectReason::ServerInitiated);
    }

    #[test]
    fn abnormal_closes_are_retried() {
        assert_eq!(close_reason(Some(&frame(1001))), DisconnectReason::TransportClose);
        assert_eq!(close_reason(Some(&frame(1011))), DisconnectReason::TransportClose);
        assert_eq!(close_reason(None), DisconnectReason::TransportClose);
    }
}
