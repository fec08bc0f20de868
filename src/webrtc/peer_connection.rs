//! WebRTC PeerConnection management
//!
//! The session drives a [`PeerTransport`] but never implements one. The
//! webrtc-rs backed [`WebRtcTransport`] is the production transport handle.

use super::media_track::{acquire_sources, LocalTracks};
use super::SignalingError;
use crate::config::{IceServerConfig, MediaConfig, WebRTCConfig};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::ice::udp_network::{EphemeralUDP, UDPNetwork};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Media kind of a transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    fn codec_type(&self) -> RTPCodecType {
        match self {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        }
    }
}

/// Transceiver direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendOnly,
    RecvOnly,
}

impl From<Direction> for RTCRtpTransceiverDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::SendOnly => RTCRtpTransceiverDirection::Sendonly,
            Direction::RecvOnly => RTCRtpTransceiverDirection::Recvonly,
        }
    }
}

/// Transport handle driven by a signaling session
#[async_trait]
pub trait PeerTransport: Send {
    /// Add a transceiver with a fixed direction
    async fn add_transceiver(&mut self, kind: MediaKind, direction: Direction) -> Result<(), SignalingError>;

    /// Acquire local capture and attach it to the send transceivers
    async fn attach_local_media(&mut self) -> Result<(), SignalingError>;

    /// Generate a local offer
    async fn create_offer(&mut self) -> Result<String, SignalingError>;

    /// Commit an offer as the local description
    async fn set_local_description(&mut self, sdp: &str) -> Result<(), SignalingError>;

    /// Apply the remote answer
    async fn set_remote_description(&mut self, sdp: &str) -> Result<(), SignalingError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), SignalingError>;
}

/// PeerConnection factory
pub struct PeerConnectionManager {
    config: WebRTCConfig,
}

impl PeerConnectionManager {
    /// Create a new PeerConnection manager
    pub fn new(config: WebRTCConfig) -> Self {
        Self { config }
    }

    /// Create a new PeerConnection with the configured settings
    pub async fn create_peer_connection(&self) -> Result<Arc<RTCPeerConnection>, SignalingError> {
        let mut setting_engine = SettingEngine::default();

        if let Some(range) = self.config.ephemeral_udp_port_range {
            let ephemeral = EphemeralUDP::new(range[0], range[1])
                .map_err(|e| SignalingError::PeerConnection(format!("Invalid ICE UDP port range: {}", e)))?;
            setting_engine.set_udp_network(UDPNetwork::Ephemeral(ephemeral));
        }

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to register codecs: {}", e)))?;

        // Create interceptor registry for RTCP feedback
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let ice_servers = build_ice_servers(&self.config)
            .into_iter()
            .map(|server| RTCIceServer {
                urls: server.urls,
                username: server.username.unwrap_or_default(),
                credential: server.credential.unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to create peer connection: {}", e)))?;

        Ok(Arc::new(peer_connection))
    }

    /// Create a transport handle over a fresh peer connection
    pub async fn create_transport(&self, media: MediaConfig) -> Result<WebRtcTransport, SignalingError> {
        let peer_connection = self.create_peer_connection().await?;
        Ok(WebRtcTransport::new(peer_connection, media))
    }
}

/// [`PeerTransport`] over a webrtc-rs `RTCPeerConnection`
pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
    media: MediaConfig,
    local_tracks: LocalTracks,
    pending_offer: Option<RTCSessionDescription>,
    remote_tracks: Option<mpsc::UnboundedReceiver<Arc<TrackRemote>>>,
    /// Senders of the send-only transceivers, carrying `local_tracks`
    senders: Vec<Arc<RTCRtpSender>>,
}

impl WebRtcTransport {
    pub fn new(peer_connection: Arc<RTCPeerConnection>, media: MediaConfig) -> Self {
        let (track_tx, track_rx) = mpsc::unbounded_channel();

        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let track_tx = track_tx.clone();
            Box::pin(async move {
                info!(
                    "Remote {} track {} ({})",
                    track.kind(),
                    track.id(),
                    track.codec().capability.mime_type
                );
                let _ = track_tx.send(track);
            })
        }));

        peer_connection.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!("Peer connection state: {}", state);
            Box::pin(async {})
        }));

        Self {
            peer_connection,
            media,
            local_tracks: LocalTracks::new(),
            pending_offer: None,
            remote_tracks: Some(track_rx),
            senders: Vec::new(),
        }
    }

    pub fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        self.peer_connection.clone()
    }

    /// Tracks that a publisher writes samples into
    pub fn local_tracks(&self) -> LocalTracks {
        self.local_tracks.clone()
    }

    /// Remote tracks as they arrive (play role). Can be taken once.
    pub fn take_remote_tracks(&mut self) -> Option<mpsc::UnboundedReceiver<Arc<TrackRemote>>> {
        self.remote_tracks.take()
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn add_transceiver(&mut self, kind: MediaKind, direction: Direction) -> Result<(), SignalingError> {
        let init = RTCRtpTransceiverInit {
            direction: direction.into(),
            send_encodings: Vec::new(),
        };
        let add_failed =
            |e: webrtc::Error| SignalingError::PeerConnection(format!("Failed to add {} transceiver: {}", kind.as_str(), e));

        match direction {
            // A send-only transceiver built from its kind gets a placeholder track that
            // add_track cannot reuse, so it is built from the local track instead.
            Direction::SendOnly => {
                let track: Arc<dyn TrackLocal + Send + Sync> = match kind {
                    MediaKind::Audio => self.local_tracks.audio.clone(),
                    MediaKind::Video => self.local_tracks.video.clone(),
                };
                let transceiver = self
                    .peer_connection
                    .add_transceiver_from_track(track, Some(init))
                    .await
                    .map_err(add_failed)?;
                self.senders.push(transceiver.sender().await);
            }
            Direction::RecvOnly => {
                self.peer_connection
                    .add_transceiver_from_kind(kind.codec_type(), Some(init))
                    .await
                    .map_err(add_failed)?;
            }
        }
        Ok(())
    }

    async fn attach_local_media(&mut self) -> Result<(), SignalingError> {
        if self.senders.is_empty() {
            return Err(SignalingError::MediaAcquisition(
                "no send-only transceiver to attach local media to".to_string(),
            ));
        }
        acquire_sources(&self.media)?;

        for sender in self.senders.drain(..) {
            // Drain RTCP so the interceptors keep running.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while sender.read(&mut rtcp_buf).await.is_ok() {}
            });
        }
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<String, SignalingError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to create offer: {}", e)))?;
        let sdp = offer.sdp.clone();
        self.pending_offer = Some(offer);
        Ok(sdp)
    }

    async fn set_local_description(&mut self, sdp: &str) -> Result<(), SignalingError> {
        let offer = match self.pending_offer.take() {
            Some(offer) if offer.sdp == sdp => offer,
            _ => RTCSessionDescription::offer(sdp.to_string())
                .map_err(|e| SignalingError::PeerConnection(format!("Invalid SDP offer: {}", e)))?,
        };

        self.peer_connection
            .set_local_description(offer)
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to set local description: {}", e)))?;
        Ok(())
    }

    async fn set_remote_description(&mut self, sdp: &str) -> Result<(), SignalingError> {
        let answer = RTCSessionDescription::answer(sdp.to_string())
            .map_err(|e| SignalingError::PeerConnection(format!("Invalid SDP answer: {}", e)))?;

        self.peer_connection
            .set_remote_description(answer)
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to set remote description: {}", e)))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Failed to close connection: {}", e)))?;
        Ok(())
    }
}

/// Describe the negotiated sender codecs, e.g. `opus, 48000HZ, channels: 2, pt: 111`.
///
/// Retransmission and redundancy codecs (red, rtx, fec) are skipped.
pub async fn format_sender_codecs(peer_connection: &RTCPeerConnection, kind: Option<MediaKind>) -> String {
    let mut codecs = Vec::new();

    for sender in peer_connection.get_senders().await {
        let Some(track) = sender.track().await else {
            continue;
        };
        let track_kind = track.kind();
        if let Some(kind) = kind {
            if track_kind != kind.codec_type() {
                continue;
            }
        }

        let params = sender.get_parameters().await;
        for codec in &params.rtp_parameters.codecs {
            let mime = codec.capability.mime_type.to_lowercase();
            if mime.contains("/red") || mime.contains("/rtx") || mime.contains("/fec") {
                continue;
            }

            let name = codec
                .capability
                .mime_type
                .trim_start_matches("audio/")
                .trim_start_matches("video/");
            let mut entry = format!("{}, {}HZ", name, codec.capability.clock_rate);
            if track_kind == RTPCodecType::Audio {
                entry.push_str(&format!(", channels: {}", codec.capability.channels));
            }
            entry.push_str(&format!(", pt: {}", codec.payload_type));
            codecs.push(entry);
        }
    }

    codecs.join(", ")
}

fn build_ice_servers(config: &WebRTCConfig) -> Vec<IceServerConfig> {
    if !config.ice_servers.is_empty() {
        return config.ice_servers.clone();
    }

    if config.stun_host.is_empty() || config.stun_port == 0 {
        warn!("No ICE servers configured, only host candidates will be gathered");
        return Vec::new();
    }

    vec![IceServerConfig {
        urls: vec![format!("stun:{}:{}", config.stun_host, config.stun_port)],
        username: None,
        credential: None,
    }]
}
