//! Normalized stream metadata.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frame rate assumed when the source reports a zero denominator.
pub const DEFAULT_FPS: f64 = 30.0;

/// Pixel format assumed when the video stream does not report one.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Sample rate assumed when there is no audio stream or it is not reported.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Stream characteristics of one input file.
///
/// Built once by a prober and never mutated. Codec names and the container
/// are lowercased so they compare directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProfile {
    /// The probed file.
    pub path: PathBuf,
    pub has_video: bool,
    pub has_audio: bool,
    pub has_subtitles: bool,
    /// Width of the first video stream in pixels.
    pub width: u32,
    /// Height of the first video stream in pixels.
    pub height: u32,
    /// Frame rate rounded to two decimals.
    pub fps: f64,
    pub video_codec: String,
    /// Codec of the first audio stream, `None` without audio.
    pub audio_codec: Option<String>,
    pub pixel_format: String,
    pub duration_secs: f64,
    /// Video bitrate in bits per second, if reported.
    pub bitrate: Option<u64>,
    pub audio_sample_rate: u32,
    /// Channel count of the first audio stream.
    pub audio_channels: Option<u32>,
    /// ffprobe `format_name`, e.g. `matroska,webm`.
    pub container: String,
    pub audio_stream_count: usize,
    pub subtitle_stream_count: usize,
}

impl StreamProfile {
    /// `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
