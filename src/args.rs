use clap::{Parser, Subcommand};
use std::path::PathBuf;

use srs_rtc_client::config;

#[derive(Parser, Debug)]
#[command(name = "srs-rtc-client")]
#[command(author = "Selkies Team")]
#[command(version)]
#[command(about = "WebRTC publish/play client for SRS-style signaling", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/srs-rtc-client.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,

    /// Treat the hosting page as https (API on https, default port 443)
    #[arg(long, action)]
    pub https: bool,

    /// Signaling exchange deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Wait for the signaling answer without a deadline
    #[arg(long, action, conflicts_with = "timeout_ms")]
    pub no_deadline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the signaling endpoint for a stream URL
    Resolve {
        /// Stream URL, e.g. webrtc://host/live/livestream
        url: String,

        /// publish or play
        #[arg(long, default_value = "play")]
        role: String,
    },

    /// Play a stream until interrupted
    Play {
        /// Stream URL
        url: String,
    },

    /// Publish local media files until interrupted
    Publish {
        /// Stream URL
        url: String,

        /// H.264 Annex-B file
        #[arg(long)]
        video: Option<PathBuf>,

        /// Ogg/Opus file
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Restart the files at end of stream
        #[arg(long = "loop", action)]
        loop_playback: bool,
    },
}

impl Args {
    pub fn load_config(&self) -> Result<config::Config, Box<dyn std::error::Error>> {
        config::Config::load(&self.config)
    }
}
