//! Local media for the publish role
//!
//! Capture is file backed: an H.264 Annex-B elementary stream for video and
//! an Ogg/Opus file for audio. Acquisition validates the sources before the
//! offer is generated; the pump writes samples once the session is up.

use super::SignalingError;
use crate::config::MediaConfig;
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use webrtc::api::media_engine::{MIME_TYPE_H264, MIME_TYPE_OPUS};
use webrtc::media::io::h264_reader::H264Reader;
use webrtc::media::io::ogg_reader::OggReader;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const STREAM_ID: &str = "srs-rtc-client";
const H264_READ_BUFFER: usize = 1_048_576;
const OGG_PAGE_DURATION: Duration = Duration::from_millis(20);
const OPUS_CLOCK_RATE: u64 = 48_000;

/// Sample tracks attached to the peer connection when publishing
#[derive(Clone)]
pub struct LocalTracks {
    pub video: Arc<TrackLocalStaticSample>,
    pub audio: Arc<TrackLocalStaticSample>,
}

impl LocalTracks {
    pub fn new() -> Self {
        let video = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_H264.to_string(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f".to_string(),
                rtcp_feedback: vec![],
            },
            format!("video-{}", uuid::Uuid::new_v4()),
            STREAM_ID.to_string(),
        );

        let audio = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_string(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: "minptime=10;useinbandfec=1".to_string(),
                rtcp_feedback: vec![],
            },
            format!("audio-{}", uuid::Uuid::new_v4()),
            STREAM_ID.to_string(),
        );

        Self {
            video: Arc::new(video),
            audio: Arc::new(audio),
        }
    }
}

impl Default for LocalTracks {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that the configured capture sources can be opened
pub fn acquire_sources(config: &MediaConfig) -> Result<(), SignalingError> {
    if let Some(ref path) = config.video_file {
        check_h264_source(path)?;
    }
    if let Some(ref path) = config.audio_file {
        check_ogg_source(path)?;
    }
    Ok(())
}

fn open_source(path: &Path) -> Result<File, SignalingError> {
    let file = File::open(path)
        .map_err(|e| SignalingError::MediaAcquisition(format!("{}: {}", path.display(), e)))?;
    let len = file
        .metadata()
        .map_err(|e| SignalingError::MediaAcquisition(format!("{}: {}", path.display(), e)))?
        .len();
    if len == 0 {
        return Err(SignalingError::MediaAcquisition(format!("{}: empty file", path.display())));
    }
    Ok(file)
}

fn check_h264_source(path: &Path) -> Result<(), SignalingError> {
    let file = open_source(path)?;
    let mut reader = H264Reader::new(BufReader::new(file), H264_READ_BUFFER);
    reader
        .next_nal()
        .map_err(|e| SignalingError::MediaAcquisition(format!("{}: no H.264 NAL units: {}", path.display(), e)))?;
    Ok(())
}

fn check_ogg_source(path: &Path) -> Result<(), SignalingError> {
    let file = open_source(path)?;
    OggReader::new(BufReader::new(file), true)
        .map_err(|e| SignalingError::MediaAcquisition(format!("{}: not an Ogg/Opus file: {}", path.display(), e)))?;
    Ok(())
}

/// Streams file sources into the local tracks until stopped
pub struct MediaPump {
    tasks: Vec<JoinHandle<()>>,
}

impl MediaPump {
    /// Start pumping every configured source
    pub fn start(config: &MediaConfig, tracks: &LocalTracks) -> Self {
        let mut tasks = Vec::new();

        if let Some(path) = config.video_file.clone() {
            let track = tracks.video.clone();
            let frame_duration = Duration::from_secs(1) / config.video_fps.max(1);
            let looping = config.loop_playback;
            tasks.push(tokio::spawn(async move {
                loop {
                    match pump_h264(&path, &track, frame_duration).await {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Video source {} stopped: {}", path.display(), e);
                            break;
                        }
                    }
                    if !looping {
                        info!("Video source {} finished", path.display());
                        break;
                    }
                }
            }));
        }

        if let Some(path) = config.audio_file.clone() {
            let track = tracks.audio.clone();
            let looping = config.loop_playback;
            tasks.push(tokio::spawn(async move {
                loop {
                    match pump_ogg(&path, &track).await {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Audio source {} stopped: {}", path.display(), e);
                            break;
                        }
                    }
                    if !looping {
                        info!("Audio source {} finished", path.display());
                        break;
                    }
                }
            }));
        }

        Self { tasks }
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished())
    }

    /// Stop all sources
    pub fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

async fn pump_h264(
    path: &PathBuf,
    track: &Arc<TrackLocalStaticSample>,
    frame_duration: Duration,
) -> Result<u64, SignalingError> {
    let file = open_source(path)?;
    let mut reader = H264Reader::new(BufReader::new(file), H264_READ_BUFFER);
    let mut ticker = tokio::time::interval(frame_duration);
    let mut frames = 0u64;

    while let Ok(nal) = reader.next_nal() {
        // Only slices advance the clock, parameter sets share the next frame's timestamp.
        let is_slice = matches!(nal.data.first().map(|b| b & 0x1F), Some(1) | Some(5));
        let duration = if is_slice { frame_duration } else { Duration::ZERO };

        track
            .write_sample(&Sample {
                data: nal.data.freeze(),
                duration,
                ..Default::default()
            })
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Video write failed: {}", e)))?;

        if is_slice {
            frames += 1;
            let _ = ticker.tick().await;
        }
    }

    debug!("Sent {} video frames from {}", frames, path.display());
    Ok(frames)
}

async fn pump_ogg(path: &PathBuf, track: &Arc<TrackLocalStaticSample>) -> Result<u64, SignalingError> {
    let file = open_source(path)?;
    let (mut reader, _header) = OggReader::new(BufReader::new(file), true)
        .map_err(|e| SignalingError::MediaAcquisition(format!("{}: {}", path.display(), e)))?;
    let mut ticker = tokio::time::interval(OGG_PAGE_DURATION);
    let mut last_granule = 0u64;
    let mut pages = 0u64;

    while let Ok((page_data, page_header)) = reader.parse_next_page() {
        let sample_count = page_header.granule_position.saturating_sub(last_granule);
        last_granule = page_header.granule_position;
        let duration = Duration::from_millis(sample_count * 1000 / OPUS_CLOCK_RATE);

        track
            .write_sample(&Sample {
                data: page_data.freeze(),
                duration,
                ..Default::default()
            })
            .await
            .map_err(|e| SignalingError::PeerConnection(format!("Audio write failed: {}", e)))?;

        pages += 1;
        let _ = ticker.tick().await;
    }

    debug!("Sent {} audio pages from {}", pages, path.display());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use webrtc::track::track_local::TrackLocal;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("srs-rtc-client-{}-{}", uuid::Uuid::new_v4(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_acquire_without_sources() {
        assert!(acquire_sources(&MediaConfig::default()).is_ok());
    }

    #[test]
    fn test_acquire_missing_file() {
        let config = MediaConfig {
            video_file: Some(PathBuf::from("/nonexistent/input.h264")),
            ..Default::default()
        };
        assert!(matches!(acquire_sources(&config), Err(SignalingError::MediaAcquisition(_))));
    }

    #[test]
    fn test_acquire_empty_file() {
        let path = temp_file("empty.h264", b"");
        let config = MediaConfig {
            video_file: Some(path.clone()),
            ..Default::default()
        };
        assert!(matches!(acquire_sources(&config), Err(SignalingError::MediaAcquisition(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_acquire_rejects_non_ogg_audio() {
        let path = temp_file("audio.ogg", b"definitely not an ogg page");
        let config = MediaConfig {
            audio_file: Some(path.clone()),
            ..Default::default()
        };
        assert!(matches!(acquire_sources(&config), Err(SignalingError::MediaAcquisition(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_acquire_h264_stream() {
        // SPS, PPS and an IDR slice behind Annex-B start codes.
        let stream = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1F,
            0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, 0x3C, 0x80,
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x00,
        ];
        let path = temp_file("video.h264", &stream);
        let config = MediaConfig {
            video_file: Some(path.clone()),
            ..Default::default()
        };
        assert!(acquire_sources(&config).is_ok());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_local_tracks_use_one_stream() {
        let tracks = LocalTracks::new();
        assert_eq!(tracks.video.stream_id(), tracks.audio.stream_id());
        assert_ne!(tracks.video.id(), tracks.audio.id());
    }
}
