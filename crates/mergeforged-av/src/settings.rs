//! Tunables for the merge engine.
//!
//! These types are deserialised straight out of the `[tools]`, `[merge]` and
//! `[standardize]` tables of the configuration file, so every field has a
//! default and an empty table is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Overrides for external tool locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    /// Path to the ffprobe executable.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Target container of the merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mkv,
    Mp4,
}

impl Container {
    /// File extension for outputs in this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mkv => "mkv",
            Self::Mp4 => "mp4",
        }
    }

    /// Muxer name passed to ffmpeg's `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mkv => "matroska",
            Self::Mp4 => "mp4",
        }
    }

    /// Text subtitle codec the container can carry.
    pub fn subtitle_codec(&self) -> &'static str {
        match self {
            Self::Mkv => "srt",
            Self::Mp4 => "mov_text",
        }
    }

    /// `format_name` ffprobe reports for files already in this container.
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Mkv => "matroska,webm",
            Self::Mp4 => "mov,mp4,m4a,3gp,3g2,mj2",
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mkv" | "matroska" => Ok(Self::Mkv),
            "mp4" => Ok(Self::Mp4),
            other => Err(format!("unknown container: {other}")),
        }
    }
}

/// Settings that govern a merge job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Container of the merged output.
    #[serde(default)]
    pub container: Container,

    /// Directory for outputs and scratch files. Defaults to the current directory.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Minimum seconds between two progress notifications.
    #[serde(default = "default_progress_throttle_secs")]
    pub progress_throttle_secs: u64,

    /// Timeout for a single read of a tool's diagnostic output.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Return the merged file when track injection fails instead of failing the job.
    #[serde(default)]
    pub keep_partial_on_injection_failure: bool,
}

fn default_progress_throttle_secs() -> u64 {
    2
}

fn default_read_timeout_ms() -> u64 {
    1000
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            container: Container::default(),
            work_dir: None,
            progress_throttle_secs: default_progress_throttle_secs(),
            read_timeout_ms: default_read_timeout_ms(),
            keep_partial_on_injection_failure: false,
        }
    }
}

impl MergeSettings {
    pub fn progress_throttle(&self) -> Duration {
        Duration::from_secs(self.progress_throttle_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Resolved working directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Fixed target parameters and encoder choices for the re-encode fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizeSettings {
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_fps() -> f64 {
    30.0
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_audio_channels() -> u32 {
    2
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl StandardizeSettings {
    /// Codec name ffprobe reports for streams made by the video encoder.
    pub fn video_codec_name(&self) -> String {
        codec_name_of(&self.video_codec)
    }

    /// Codec name ffprobe reports for streams made by the audio encoder.
    pub fn audio_codec_name(&self) -> String {
        codec_name_of(&self.audio_codec)
    }
}

fn codec_name_of(encoder: &str) -> String {
    match encoder {
        "libx264" | "h264_nvenc" | "h264_qsv" | "h264_vaapi" | "h264_videotoolbox" => "h264".into(),
        "libx265" | "hevc_nvenc" | "hevc_qsv" | "hevc_vaapi" | "hevc_videotoolbox" => "hevc".into(),
        "libvpx-vp9" => "vp9".into(),
        "libaom-av1" | "libsvtav1" => "av1".into(),
        "libopus" => "opus".into(),
        "libmp3lame" => "mp3".into(),
        "libvorbis" => "vorbis".into(),
        other => other.to_lowercase(),
    }
}

impl Default for StandardizeSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            pixel_format: default_pixel_format(),
            sample_rate: default_sample_rate(),
            audio_channels: default_audio_channels(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_names() {
        assert_eq!(Container::Mkv.extension(), "mkv");
        assert_eq!(Container::Mkv.muxer(), "matroska");
        assert_eq!(Container::Mkv.format_name(), "matroska,webm");
        assert_eq!(Container::Mkv.subtitle_codec(), "srt");
        assert_eq!(Container::Mp4.subtitle_codec(), "mov_text");
        assert_eq!("MKV".parse::<Container>().unwrap(), Container::Mkv);
        assert_eq!("mp4".parse::<Container>().unwrap(), Container::Mp4);
        assert!("avi".parse::<Container>().is_err());
    }

    #[test]
    fn merge_defaults() {
        let s = MergeSettings::default();
        assert_eq!(s.container, Container::Mkv);
        assert_eq!(s.progress_throttle(), Duration::from_secs(2));
        assert_eq!(s.read_timeout(), Duration::from_millis(1000));
        assert!(!s.keep_partial_on_injection_failure);
        assert_eq!(s.work_dir(), PathBuf::from("."));
    }

    #[test]
    fn standardize_defaults_from_empty_json() {
        let s: StandardizeSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, StandardizeSettings::default());
        assert_eq!(s.fps, 30.0);
        assert_eq!(s.pixel_format, "yuv420p");
        assert_eq!(s.sample_rate, 48000);
        assert_eq!(s.audio_channels, 2);
        assert_eq!(s.crf, 23);
    }

    #[test]
    fn encoder_output_codec_names() {
        let mut s = StandardizeSettings::default();
        assert_eq!(s.video_codec_name(), "h264");
        assert_eq!(s.audio_codec_name(), "aac");

        s.video_codec = "libx265".into();
        s.audio_codec = "libopus".into();
        assert_eq!(s.video_codec_name(), "hevc");
        assert_eq!(s.audio_codec_name(), "opus");
    }
}
