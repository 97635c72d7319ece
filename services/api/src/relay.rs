//! Speech Provider Relay
//!
//! The control UI never holds the provider's API key. It asks this service
//! for an ephemeral session, or hands over a WebRTC SDP offer, and the relay
//! forwards the request with the server's credentials.

use crate::config::RealtimeConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use tracing::{debug, instrument};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Request to the speech provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Speech provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait RealtimeRelay: Send + Sync {
    /// Mints an ephemeral realtime session and returns the provider's JSON.
    async fn create_session(&self) -> Result<Value, RelayError>;

    /// Forwards an SDP offer and returns the provider's SDP answer.
    async fn exchange_offer(&self, offer_sdp: &str) -> Result<String, RelayError>;
}

pub struct OpenAiRelay {
    client: reqwest::Client,
    config: RealtimeConfig,
    base_url: String,
}

impl OpenAiRelay {
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_base_url(config, OPENAI_BASE_URL)
    }

    pub fn with_base_url(config: RealtimeConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RealtimeRelay for OpenAiRelay {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn create_session(&self) -> Result<Value, RelayError> {
        let response = self
            .client
            .post(format!("{}/realtime/sessions", self.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "voice": self.config.voice,
            }))
            .send()
            .await?;
        let session = check(response).await?.json::<Value>().await?;
        debug!("Realtime session created");
        Ok(session)
    }

    #[instrument(skip_all, fields(model = %self.config.model, offer_len = offer_sdp.len()))]
    async fn exchange_offer(&self, offer_sdp: &str) -> Result<String, RelayError> {
        let response = self
            .client
            .post(format!("{}/realtime", self.base_url))
            .query(&[("model", self.config.model.as_str())])
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer_sdp.to_owned())
            .send()
            .await?;
        let answer = check(response).await?.text().await?;
        debug!(answer_len = answer.len(), "SDP answer received");
        Ok(answer)
    }
}
