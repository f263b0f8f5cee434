use crate::config::UpstreamConfig;
use crate::errors::{RelayError, RelayOutcome};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::error::Error as _;
use std::time::Duration;
use tokio::time::timeout;

/// Upstream response bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Destination for encoded line protocol payloads.
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Delivers `payload` once. Implementations must not retry.
    async fn send(&self, payload: String) -> RelayOutcome;

    /// Whether `send` has everything it needs to reach its destination.
    fn is_configured(&self) -> bool;
}

/// Posts payloads to the ingestion endpoint with Basic auth.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("mpu-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: String) -> RelayOutcome {
        let missing = self.config.missing();
        let (Some(url), Some(user), Some(api_key), true) = (
            &self.config.url,
            &self.config.user,
            &self.config.api_key,
            missing.is_empty(),
        ) else {
            return Err(RelayError::Configuration(missing));
        };

        let response = self
            .client
            .post(url.clone())
            .basic_auth(user, Some(api_key))
            .header(CONTENT_TYPE, "text/plain")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RelayError::Upstream {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }

    fn classify(&self, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            return RelayError::Timeout(self.config.timeout_secs);
        }

        // reqwest's own message only names the URL, the cause is in the source
        match e.source() {
            Some(source) => RelayError::Transport(format!("{e}: {source}")),
            None => RelayError::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl LineSink for UpstreamClient {
    async fn send(&self, payload: String) -> RelayOutcome {
        let upstream = self
            .config
            .url
            .as_ref()
            .and_then(|url| url.host_str())
            .unwrap_or("unconfigured")
            .to_string();
        tracing::debug!(%upstream, bytes = payload.len(), "sending to upstream");

        // The timeout also covers reading the error body
        timeout(
            Duration::from_secs(self.config.timeout_secs),
            self.post(payload),
        )
        .await
        .map_err(|_| RelayError::Timeout(self.config.timeout_secs))?
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}
