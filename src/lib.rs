//! srs-rtc-client - WebRTC signaling client
//!
//! Resolves SRS-style stream URLs (`webrtc://host/app/stream`) into signaling
//! endpoints and runs the SDP offer/answer exchange for publish and play sessions.

pub mod config;
pub mod webrtc;

// Re-exports
pub use config::{Config, MediaConfig, SignalingConfig, WebRTCConfig};
pub use self::webrtc::{
    resolve, resolve_with, PageSchema, ResolveOptions, Role, SessionHandle, SessionOptions, SessionState,
    SignalingEndpoint, SignalingError, SignalingSession, StreamAddress,
};
