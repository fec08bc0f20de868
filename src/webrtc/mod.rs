//! WebRTC signaling implementation
//!
//! This module provides the client side of the SRS RTC signaling handshake:
//! - Stream URL resolution into a signaling endpoint
//! - Offer/answer exchange over HTTP
//! - Peer connection (transport handle) management
//! - Session lifecycle with cancellation on close

pub mod address;
pub mod signaling;
pub mod exchange;
pub mod peer_connection;
pub mod media_track;
pub mod session;

pub use exchange::{HttpExchange, SignalingExchange};
pub use peer_connection::{PeerConnectionManager, PeerTransport, WebRtcTransport};
pub use session::{SessionHandle, SessionOptions, SessionState, SignalingSession};
pub use signaling::{ExchangeResponse, OfferRequest};
pub use address::{resolve, resolve_with, PageSchema, ResolveOptions, Role, Schema, SignalingEndpoint, StreamAddress};

use std::error::Error;
use std::fmt;

/// Signaling errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Logical stream URL could not be parsed into a stream address
    InvalidUrl(String),
    /// Local capture source unavailable (publish only)
    MediaAcquisition(String),
    /// Network failure or deadline expiry during the exchange
    Transport(String),
    /// Server answered with a non-zero code
    SignalingRejected { code: i64 },
    /// Response is missing the answer SDP or is not valid JSON
    Protocol(String),
    /// Session closed while the exchange was outstanding
    Cancelled,
    /// Transport handle failed to create or apply a description
    PeerConnection(String),
    /// Operation not allowed in the current session state
    InvalidState(String),
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingError::InvalidUrl(msg) => write!(f, "Invalid stream URL: {}", msg),
            SignalingError::MediaAcquisition(msg) => write!(f, "Media acquisition failed: {}", msg),
            SignalingError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SignalingError::SignalingRejected { code } => write!(f, "Signaling rejected with code {}", code),
            SignalingError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            SignalingError::Cancelled => write!(f, "Session closed while negotiating"),
            SignalingError::PeerConnection(msg) => write!(f, "Peer connection error: {}", msg),
            SignalingError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl Error for SignalingError {}
