//! Configuration management for srs-rtc-client

use crate::webrtc::PageSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Signaling configuration
    #[serde(default)]
    pub signaling: SignalingConfig,

    /// WebRTC configuration
    #[serde(default)]
    pub webrtc: WebRTCConfig,

    /// Local media for the publish role
    #[serde(default)]
    pub media: MediaConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// API schema when the stream URL has no `schema` override
    #[serde(default)]
    pub page_schema: PageSchema,

    /// Exchange deadline in milliseconds, 0 disables the client-side deadline
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            page_schema: PageSchema::Http,
            exchange_timeout_ms: default_exchange_timeout_ms(),
        }
    }
}

impl SignalingConfig {
    pub fn exchange_timeout(&self) -> Option<Duration> {
        match self.exchange_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// ICE server entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// WebRTC peer connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRTCConfig {
    /// Explicit ICE servers
    #[serde(default)]
    pub ice_servers: Vec<IceServerConfig>,

    /// STUN host, used when `ice_servers` is empty
    #[serde(default)]
    pub stun_host: String,

    /// STUN port
    #[serde(default = "default_stun_port")]
    pub stun_port: u16,

    /// Local UDP port range for ICE candidates
    #[serde(default)]
    pub ephemeral_udp_port_range: Option<[u16; 2]>,
}

impl Default for WebRTCConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            stun_host: String::new(),
            stun_port: default_stun_port(),
            ephemeral_udp_port_range: None,
        }
    }
}

/// File-backed capture sources for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// H.264 Annex-B elementary stream
    #[serde(default)]
    pub video_file: Option<PathBuf>,

    /// Ogg/Opus file
    #[serde(default)]
    pub audio_file: Option<PathBuf>,

    /// Video frame rate used to pace the H.264 file
    #[serde(default = "default_video_fps")]
    pub video_fps: u32,

    /// Restart sources when they reach end of file
    #[serde(default)]
    pub loop_playback: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            video_file: None,
            audio_file: None,
            video_fps: default_video_fps(),
            loop_playback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        for server in &self.webrtc.ice_servers {
            if server.urls.is_empty() {
                return Err("Every ICE server needs at least one URL".into());
            }
        }

        if !self.webrtc.stun_host.is_empty() && self.webrtc.stun_port == 0 {
            return Err("WebRTC stun_port must be non-zero".into());
        }

        if let Some([start, end]) = self.webrtc.ephemeral_udp_port_range {
            if start == 0 || start > end {
                return Err("WebRTC ephemeral_udp_port_range must be [start, end] with 0 < start <= end".into());
            }
        }

        if self.media.video_fps == 0 {
            return Err("Media video_fps must be non-zero".into());
        }

        Ok(())
    }
}

fn default_exchange_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stun_port() -> u16 {
    3478
}

fn default_video_fps() -> u32 {
    30
}
