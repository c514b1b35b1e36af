use crate::types::{AuctionError, Result};
use async_trait::async_trait;
use url::Url;

/// Pre-flight check that the auth token is still accepted.
///
/// Runs before a transport is opened so an expired session fails fast
/// instead of going through the reconnect procedure.
#[async_trait]
pub trait AuthCheck: Send + Sync {
    async fn check(&self, token: &str) -> Result<()>;
}

/// Checks the token against the server's authentication endpoint
pub struct HttpAuthCheck {
    url: Url,
    http: reqwest::Client,
}

impl HttpAuthCheck {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AuthCheck for HttpAuthCheck {
    async fn check(&self, token: &str) -> Result<()> {
        let response = self
            .http
            .get(self.url.clone())
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Auth check passed");
            return Ok(());
        }

        if matches!(status.as_u16(), 401 | 403) {
            return Err(AuctionError::Authentication(format!(
                "auth check rejected the token with status {}",
                status
            )));
        }

        Err(AuctionError::Transport(format!(
            "auth check returned unexpected status {}",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_is_not_an_auth_failure() {
        let check = HttpAuthCheck::new(Url::parse("http://127.0.0.1:4030/api/auth/check").unwrap());

        let error = check.check("token").await.unwrap_err();
        assert!(matches!(error, AuctionError::Http(_)));
        assert!(!error.is_auth_failure());
        assert!(!error.is_terminal());
    }
}
