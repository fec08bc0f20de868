//! Signaling exchange
//!
//! One request, one JSON response. The session owns the deadline and the
//! cancellation, implementations only move bytes.

use super::signaling::OfferRequest;
use super::SignalingError;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

/// Carries an offer to the signaling API and returns the raw JSON reply
#[async_trait]
pub trait SignalingExchange: Send + Sync {
    async fn exchange(&self, api_url: &str, request: &OfferRequest) -> Result<Value, SignalingError>;
}

/// HTTP POST exchange
#[derive(Debug, Clone, Default)]
pub struct HttpExchange {
    client: reqwest::Client,
}

impl HttpExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SignalingExchange for HttpExchange {
    async fn exchange(&self, api_url: &str, request: &OfferRequest) -> Result<Value, SignalingError> {
        debug!("POST {} tid={}", api_url, request.tid);

        let response = self
            .client
            .post(api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| SignalingError::Transport(format!("POST {} failed: {}", api_url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SignalingError::Transport(format!("Reading response from {} failed: {}", api_url, e)))?;
        debug!("Response {} from {}: {}", status, api_url, body);

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            // Servers report structured failures in the body; only a non-JSON
            // error page is a transport-level failure.
            Err(_) if !status.is_success() => Err(SignalingError::Transport(format!(
                "POST {} returned {}",
                api_url, status
            ))),
            Err(e) => Err(SignalingError::Protocol(format!("Invalid JSON from {}: {}", api_url, e))),
        }
    }
}
