//! RTC Signaling Protocol
//!
//! Wire types for the single request/response exchange of an SDP offer
//! against the `/rtc/v1/publish/` or `/rtc/v1/play/` API.

use super::address::{SignalingEndpoint, StreamAddress};
use super::SignalingError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Offer posted to the signaling API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub api: String,
    pub tid: String,
    pub streamurl: String,
    /// Always `null` on the wire
    pub clientip: Option<String>,
    pub sdp: String,
}

impl OfferRequest {
    pub fn new(endpoint: &SignalingEndpoint, address: &StreamAddress, offer_sdp: &str) -> Self {
        Self {
            api: endpoint.api_url.clone(),
            tid: endpoint.transaction_id.clone(),
            streamurl: address.url.clone(),
            clientip: None,
            sdp: offer_sdp.to_string(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self)
            .map_err(|e| SignalingError::Protocol(format!("Failed to serialize offer: {}", e)))
    }
}

/// Decoded signaling response
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeResponse {
    /// Remote answer, with any additional server-defined fields
    Answer { sdp: String, extra: Map<String, Value> },
    /// Structured failure carrying the server's code
    Rejected { code: i64 },
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    sdp: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ExchangeResponse {
    /// Decode the response body. A `code` of 0 counts as success.
    pub fn decode(value: Value) -> Result<Self, SignalingError> {
        let raw: RawResponse = serde_json::from_value(value)
            .map_err(|e| SignalingError::Protocol(format!("Invalid signaling response: {}", e)))?;

        match (raw.code, raw.sdp) {
            (Some(code), _) if code != 0 => Ok(ExchangeResponse::Rejected { code }),
            (_, Some(sdp)) if !sdp.is_empty() => Ok(ExchangeResponse::Answer { sdp, extra: raw.extra }),
            _ => Err(SignalingError::Protocol("Response carries no answer SDP".to_string())),
        }
    }

    /// Parse a response from JSON text
    pub fn from_json(json: &str) -> Result<Self, SignalingError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SignalingError::Protocol(format!("Invalid signaling response: {}", e)))?;
        Self::decode(value)
    }
}

/// Transaction id for one negotiation attempt: hex of time × random, 7 chars.
///
/// Only a correlation aid for logs, collisions are tolerated.
pub fn generate_transaction_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or_default();
    let value = (millis * rand::random::<f64>() * 100.0) as u64;
    let mut tid = format!("{:x}", value.max(1));
    tid.truncate(7);
    tid
}
