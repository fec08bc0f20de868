//! srs-rtc-client - Main entry point
//!
//! Publishes local media files to, or plays a stream from, an SRS-style WebRTC server.

mod args;

use args::{Args, Command};
use clap::Parser;
use log::{error, info, warn};
use srs_rtc_client::config::Config;
use srs_rtc_client::webrtc::media_track::MediaPump;
use srs_rtc_client::webrtc::peer_connection::format_sender_codecs;
use srs_rtc_client::webrtc::{
    resolve_with, HttpExchange, PageSchema, PeerConnectionManager, ResolveOptions, Role, SessionHandle,
    SessionOptions, SignalingError, SignalingSession, WebRtcTransport,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Configuration is read first so the file can set the log level
    let loaded = args.load_config();
    let log_level = match (&loaded, args.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(cfg), false) => cfg.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };

    // Initialize logging with noise filtering for third-party WebRTC crates
    env_logger::Builder::new()
        .parse_filters(&std::env::var("SRS_RTC_LOG").unwrap_or(log_level))
        .filter_module("webrtc_ice", log::LevelFilter::Error)
        .filter_module("webrtc_dtls", log::LevelFilter::Error)
        .filter_module("webrtc_mdns", log::LevelFilter::Error)
        .filter_module("webrtc_srtp", log::LevelFilter::Warn)
        .init();

    info!("srs-rtc-client v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(cfg) => {
            info!("Loaded configuration from {:?}", args.config);
            cfg
        }
        Err(e) => {
            error!("Failed to load config {:?}: {}", args.config, e);
            return Err(e);
        }
    };

    // Apply command line overrides
    if args.https {
        config.signaling.page_schema = PageSchema::Https;
    }
    if let Some(timeout) = args.timeout_ms {
        config.signaling.exchange_timeout_ms = timeout;
    }
    if args.no_deadline {
        config.signaling.exchange_timeout_ms = 0;
    }
    if let Command::Publish {
        video,
        audio,
        loop_playback,
        ..
    } = &args.command
    {
        if video.is_some() {
            config.media.video_file = video.clone();
        }
        if audio.is_some() {
            config.media.audio_file = audio.clone();
        }
        config.media.loop_playback |= *loop_playback;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    let options = SessionOptions {
        resolve: ResolveOptions {
            page_schema: config.signaling.page_schema,
        },
        exchange_timeout: config.signaling.exchange_timeout(),
    };

    match &args.command {
        Command::Resolve { url, role } => {
            let role: Role = role.parse()?;
            print_endpoint(url, role, &options.resolve)?;
        }
        Command::Play { url } => run_play(&config, options, url).await?,
        Command::Publish { url, .. } => run_publish(&config, options, url).await?,
    }

    info!("srs-rtc-client stopped");
    Ok(())
}

fn print_endpoint(url: &str, role: Role, options: &ResolveOptions) -> Result<(), SignalingError> {
    let (endpoint, address) = resolve_with(url, role, options)?;
    println!("api:       {}", endpoint.api_url);
    println!("schema:    {}", endpoint.api_schema);
    println!("port:      {}", endpoint.port);
    println!("tid:       {}", endpoint.transaction_id);
    println!("simulator: {}", endpoint.simulator_url);
    println!("server:    {}", address.server);
    println!("vhost:     {}", address.vhost);
    println!("app:       {}", address.app);
    println!("stream:    {}", address.stream);
    println!("rtmp:      {}", address.rtmp_url());
    Ok(())
}

/// Run `open` in the background so Ctrl-C can close the session mid-negotiation
async fn negotiate(
    session: Arc<SignalingSession<WebRtcTransport>>,
    role: Role,
    url: String,
) -> Result<Option<SessionHandle>, SignalingError> {
    let mut opening = {
        let session = session.clone();
        tokio::spawn(async move {
            match role {
                Role::Publish => session.publish(&url).await,
                Role::Play => session.play(&url).await,
            }
        })
    };

    let finished = tokio::select! {
        result = &mut opening => Some(result),
        _ = signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            info!("Shutdown signal received during negotiation");
            session.close().await?;
            opening.await
        }
    };

    match result {
        Ok(Ok(handle)) => Ok(Some(handle)),
        Ok(Err(SignalingError::Cancelled)) => Ok(None),
        Ok(Err(e)) => {
            error!("Negotiation failed: {}", e);
            session.close().await?;
            Err(e)
        }
        Err(e) => Err(SignalingError::InvalidState(format!("negotiation task failed: {}", e))),
    }
}

async fn run_play(config: &Config, options: SessionOptions, url: &str) -> Result<(), SignalingError> {
    let manager = PeerConnectionManager::new(config.webrtc.clone());
    let mut transport = manager.create_transport(config.media.clone()).await?;
    let mut remote_tracks = transport.take_remote_tracks();

    let session = Arc::new(SignalingSession::new(transport, Arc::new(HttpExchange::new()), options));
    let Some(handle) = negotiate(session.clone(), Role::Play, url.to_string()).await? else {
        return Ok(());
    };
    info!("Playing {} (session {})", handle.stream_url, handle.session_id);

    let packets = Arc::new(AtomicU64::new(0));
    let reader = {
        let packets = packets.clone();
        tokio::spawn(async move {
            let Some(rx) = remote_tracks.as_mut() else {
                return;
            };
            while let Some(track) = rx.recv().await {
                let packets = packets.clone();
                tokio::spawn(async move {
                    while track.read_rtp().await.is_ok() {
                        packets.fetch_add(1, Ordering::Relaxed);
                    }
                    info!("Remote track {} ended", track.id());
                });
            }
        })
    };

    let mut stats = tokio::time::interval(STATS_INTERVAL);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = stats.tick() => {
                info!("Received {} RTP packets", packets.load(Ordering::Relaxed));
            }
        }
    }

    reader.abort();
    session.close().await
}

async fn run_publish(config: &Config, options: SessionOptions, url: &str) -> Result<(), SignalingError> {
    if config.media.video_file.is_none() && config.media.audio_file.is_none() {
        warn!("No media files configured, publishing silent tracks");
    }

    let manager = PeerConnectionManager::new(config.webrtc.clone());
    let transport = manager.create_transport(config.media.clone()).await?;
    let tracks = transport.local_tracks();
    let peer_connection = transport.peer_connection();

    let session = Arc::new(SignalingSession::new(transport, Arc::new(HttpExchange::new()), options));
    let Some(handle) = negotiate(session.clone(), Role::Publish, url.to_string()).await? else {
        return Ok(());
    };
    info!("Publishing to {} (session {})", handle.stream_url, handle.session_id);
    info!("Sender codecs: {}", format_sender_codecs(&peer_connection, None).await);

    let pump = MediaPump::start(&config.media, &tracks);
    let mut check = tokio::time::interval(STATS_INTERVAL);
    let mut reported_idle = false;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = check.tick() => {
                if pump.is_idle() && !reported_idle {
                    info!("All media sources finished, connection kept open until interrupted");
                    reported_idle = true;
                }
            }
        }
    }

    pump.stop();
    session.close().await
}
