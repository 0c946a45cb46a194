//! FFprobe-based media probing.

use super::types::*;
use crate::command::{path_arg, ToolCommand};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Arguments requesting JSON container and stream metadata.
const FFPROBE_ARGS: &[&str] = &[
    "-v",
    "quiet",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bit_rate: Option<String>,
}

impl FfprobeStream {
    fn is(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }
}

/// Run ffprobe on `path` and parse the result.
pub async fn probe_with_ffprobe(
    ffprobe: &Path,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<StreamProfile> {
    let output = ToolCommand::new(ffprobe.to_path_buf())
        .stage("probe")
        .args(FFPROBE_ARGS.iter().copied())
        .arg(path_arg(path))
        .timeout(PROBE_TIMEOUT)
        .cancel_on(cancel)
        .execute()
        .await
        .map_err(|e| match e {
            Error::ToolFailed { message, .. } => Error::probe(path, message),
            other => other,
        })?;

    parse_ffprobe_json(path, &output.stdout)
}

/// Parse ffprobe's JSON output into a [`StreamProfile`].
///
/// The first video and first audio stream are canonical.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<StreamProfile> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::probe(path, format!("unparsable ffprobe output: {e}")))?;
    profile_from_output(path.to_path_buf(), output)
}

fn profile_from_output(path: PathBuf, output: FfprobeOutput) -> Result<StreamProfile> {
    let video = output
        .streams
        .iter()
        .find(|s| s.is("video"))
        .ok_or_else(|| Error::NoVideoStream { path: path.clone() })?;
    let audio = output.streams.iter().find(|s| s.is("audio"));

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(Error::probe(&path, "video stream reports no dimensions")),
    };

    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(DEFAULT_FPS);

    let audio_stream_count = output.streams.iter().filter(|s| s.is("audio")).count();
    let subtitle_stream_count = output.streams.iter().filter(|s| s.is("subtitle")).count();

    Ok(StreamProfile {
        has_video: true,
        has_audio: audio.is_some(),
        has_subtitles: subtitle_stream_count > 0,
        width,
        height,
        fps,
        video_codec: video.codec_name.clone().unwrap_or_default().to_lowercase(),
        audio_codec: audio.map(|a| a.codec_name.clone().unwrap_or_default().to_lowercase()),
        pixel_format: video
            .pix_fmt
            .clone()
            .unwrap_or_else(|| DEFAULT_PIXEL_FORMAT.to_string()),
        duration_secs: output
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        bitrate: video.bit_rate.as_deref().and_then(|b| b.parse().ok()),
        audio_sample_rate: audio
            .and_then(|a| a.sample_rate.as_deref())
            .and_then(|r| r.parse().ok())
            .unwrap_or(DEFAULT_SAMPLE_RATE),
        audio_channels: audio.and_then(|a| a.channels),
        container: output.format.format_name.unwrap_or_default().to_lowercase(),
        audio_stream_count,
        subtitle_stream_count,
        path,
    })
}

/// Parse `num/den` or a plain number, rounded to two decimals.
///
/// A zero denominator yields [`DEFAULT_FPS`].
pub fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let fps = match rate_str.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return Some(DEFAULT_FPS);
            }
            num / den
        }
        None => rate_str.trim().parse().ok()?,
    };
    Some((fps * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "H264", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "pix_fmt": "yuv420p", "bit_rate": "4500000"},
            {"index": 1, "codec_type": "audio", "codec_name": "AAC", "sample_rate": "44100", "channels": 2},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3", "sample_rate": "48000", "channels": 6},
            {"index": 3, "codec_type": "subtitle", "codec_name": "subrip"}
        ],
        "format": {"filename": "a.mp4", "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "120.500000", "size": "1000"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.98));
        assert_eq!(parse_frame_rate("30000/1001"), Some(29.97));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), Some(DEFAULT_FPS));
        assert_eq!(parse_frame_rate("24/0"), Some(DEFAULT_FPS));
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn parses_full_profile() {
        let p = parse_ffprobe_json(Path::new("/in/a.mp4"), FULL).unwrap();
        assert!(p.has_video && p.has_audio && p.has_subtitles);
        assert_eq!((p.width, p.height), (1920, 1080));
        assert_eq!(p.fps, 29.97);
        assert_eq!(p.video_codec, "h264");
        assert_eq!(p.audio_codec.as_deref(), Some("aac"));
        assert_eq!(p.pixel_format, "yuv420p");
        assert_eq!(p.duration_secs, 120.5);
        assert_eq!(p.bitrate, Some(4_500_000));
        // First audio stream is canonical.
        assert_eq!(p.audio_sample_rate, 44100);
        assert_eq!(p.audio_channels, Some(2));
        assert_eq!(p.container, "mov,mp4,m4a,3gp,3g2,mj2");
        assert_eq!(p.audio_stream_count, 2);
        assert_eq!(p.subtitle_stream_count, 1);
        assert_eq!(p.resolution(), "1920x1080");
    }

    #[test]
    fn defaults_when_fields_missing() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9", "width": 640, "height": 360}],
            "format": {"format_name": "matroska,webm"}
        }"#;
        let p = parse_ffprobe_json(Path::new("b.webm"), json).unwrap();
        assert!(!p.has_audio);
        assert_eq!(p.audio_codec, None);
        assert_eq!(p.fps, DEFAULT_FPS);
        assert_eq!(p.pixel_format, DEFAULT_PIXEL_FORMAT);
        assert_eq!(p.audio_sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(p.audio_channels, None);
        assert_eq!(p.duration_secs, 0.0);
        assert_eq!(p.bitrate, None);
        assert_eq!(p.audio_stream_count, 0);
    }

    #[test]
    fn no_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "mp3"}], "format": {}}"#;
        let err = parse_ffprobe_json(Path::new("song.mp3"), json).unwrap_err();
        assert!(matches!(err, Error::NoVideoStream { .. }));
    }

    #[test]
    fn unparsable_output_is_probe_error() {
        let err = parse_ffprobe_json(Path::new("x.mkv"), "not json").unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));

        let err = parse_ffprobe_json(Path::new("x.mkv"), "").unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));
    }

    #[test]
    fn missing_dimensions_is_probe_error() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "h264"}], "format": {}}"#;
        let err = parse_ffprobe_json(Path::new("x.mkv"), json).unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));
    }

    #[tokio::test]
    async fn missing_binary() {
        let err = probe_with_ffprobe(
            Path::new("/nonexistent/ffprobe_xyz"),
            Path::new("a.mkv"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
