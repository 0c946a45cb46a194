//! Cross-file compatibility analysis.
//!
//! Decides whether a set of inputs can be concatenated by stream copy, whether
//! they must be remuxed into the target container first, and which parameters
//! the re-encode fallback should normalize to.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::probe::StreamProfile;
use crate::settings::{Container, StandardizeSettings};

/// Frame rates closer than this are treated as equal.
pub const FPS_TOLERANCE: f64 = 0.1;

/// Whether two frame rates are equal within [`FPS_TOLERANCE`].
pub fn fps_matches(a: f64, b: f64) -> bool {
    // Slack absorbs binary rounding of two-decimal rates (30.1 - 30.0 > 0.1).
    (a - b).abs() <= FPS_TOLERANCE + 1e-9
}

/// A parameter that must match across inputs for a stream-copy merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Width,
    Height,
    Fps,
    VideoCodec,
    AudioCodec,
    PixelFormat,
    AudioSampleRate,
}

impl Parameter {
    /// Checked in this order; the first mismatch wins.
    pub const CRITICAL: [Parameter; 7] = [
        Parameter::Width,
        Parameter::Height,
        Parameter::Fps,
        Parameter::VideoCodec,
        Parameter::AudioCodec,
        Parameter::PixelFormat,
        Parameter::AudioSampleRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Fps => "fps",
            Self::VideoCodec => "video_codec",
            Self::AudioCodec => "audio_codec",
            Self::PixelFormat => "pixel_format",
            Self::AudioSampleRate => "audio_sample_rate",
        }
    }

    /// Display form of this parameter's value in `profile`.
    fn value_of(&self, profile: &StreamProfile) -> String {
        match self {
            Self::Width => profile.width.to_string(),
            Self::Height => profile.height.to_string(),
            Self::Fps => profile.fps.to_string(),
            Self::VideoCodec => profile.video_codec.clone(),
            Self::AudioCodec => profile
                .audio_codec
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            Self::PixelFormat => profile.pixel_format.clone(),
            Self::AudioSampleRate => profile.audio_sample_rate.to_string(),
        }
    }

    fn matches(&self, a: &StreamProfile, b: &StreamProfile) -> bool {
        match self {
            Self::Width => a.width == b.width,
            Self::Height => a.height == b.height,
            Self::Fps => fps_matches(a.fps, b.fps),
            Self::VideoCodec => a.video_codec == b.video_codec,
            // None vs None matches; None vs Some does not.
            Self::AudioCodec => a.audio_codec == b.audio_codec,
            Self::PixelFormat => a.pixel_format == b.pixel_format,
            Self::AudioSampleRate => a.audio_sample_rate == b.audio_sample_rate,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The first parameter found to differ from the reference (first) input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub parameter: Parameter,
    /// Index of the offending input.
    pub index: usize,
    /// Value in the first input.
    pub expected: String,
    /// Value in the offending input.
    pub found: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} differs in input {}: {} vs {}",
            self.parameter,
            self.index + 1,
            self.expected,
            self.found
        )
    }
}

/// Verdict of [`check_compatibility`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Compatibility {
    /// Every critical parameter matches; stream copy is possible.
    Identical,
    /// At least one parameter differs.
    Mismatch(Mismatch),
    /// Fewer than two inputs.
    TooFewInputs,
}

impl Compatibility {
    pub fn is_fast_path_eligible(&self) -> bool {
        matches!(self, Self::Identical)
    }
}

/// Compare every input against the first on the critical parameter set.
pub fn check_compatibility(profiles: &[StreamProfile]) -> Compatibility {
    let Some((reference, rest)) = profiles.split_first() else {
        return Compatibility::TooFewInputs;
    };
    if rest.is_empty() {
        return Compatibility::TooFewInputs;
    }

    for (offset, profile) in rest.iter().enumerate() {
        for parameter in Parameter::CRITICAL {
            if !parameter.matches(reference, profile) {
                let mismatch = Mismatch {
                    parameter,
                    index: offset + 1,
                    expected: parameter.value_of(reference),
                    found: parameter.value_of(profile),
                };
                tracing::info!("Parameter mismatch: {}", mismatch);
                return Compatibility::Mismatch(mismatch);
            }
        }
    }

    Compatibility::Identical
}

/// Whether any input is not already in `target`.
pub fn requires_container_remux(profiles: &[StreamProfile], target: Container) -> bool {
    match profiles
        .iter()
        .find(|p| p.container != target.format_name())
    {
        Some(p) => {
            tracing::info!(
                "Container remux needed: {} -> {}",
                p.container,
                target.format_name()
            );
            true
        }
        None => false,
    }
}

/// Up to three human-readable differences against the first input, covering
/// resolution, frame rate and video codec.
pub fn difference_summary(profiles: &[StreamProfile]) -> Vec<String> {
    let Some((reference, rest)) = profiles.split_first() else {
        return Vec::new();
    };

    let mut differences = Vec::new();
    for profile in rest {
        if profile.width != reference.width || profile.height != reference.height {
            differences.push(format!(
                "Resolution: {} vs {}",
                reference.resolution(),
                profile.resolution()
            ));
        }
        if !fps_matches(profile.fps, reference.fps) {
            differences.push(format!("FPS: {} vs {}", reference.fps, profile.fps));
        }
        if profile.video_codec != reference.video_codec {
            differences.push(format!(
                "Video codec: {} vs {}",
                reference.video_codec, profile.video_codec
            ));
        }
    }
    differences.truncate(3);
    differences
}

/// Parameters every input is normalized to by the re-encode fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: String,
    pub sample_rate: u32,
    pub audio_channels: u32,
}

impl TargetParams {
    /// Width and height are the statistical mode of the inputs' widths and
    /// heights, chosen independently; the pair may match no single input.
    /// Fixed parameters come from `settings`.
    pub fn from_profiles(profiles: &[StreamProfile], settings: &StandardizeSettings) -> Self {
        Self {
            width: mode(profiles.iter().map(|p| p.width)).unwrap_or(0),
            height: mode(profiles.iter().map(|p| p.height)).unwrap_or(0),
            fps: settings.fps,
            pixel_format: settings.pixel_format.clone(),
            sample_rate: settings.sample_rate,
            audio_channels: settings.audio_channels,
        }
    }

    /// Whether `profile` can be used as-is.
    pub fn is_satisfied_by(&self, profile: &StreamProfile) -> bool {
        profile.width == self.width
            && profile.height == self.height
            && fps_matches(profile.fps, self.fps)
            && profile.pixel_format == self.pixel_format
            && profile.audio_sample_rate == self.sample_rate
    }
}

/// Most frequent value; ties go to the value seen first.
pub fn mode<I>(values: I) -> Option<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut order = Vec::new();
    for v in values {
        let count = counts.entry(v).or_insert(0);
        if *count == 0 {
            order.push(v);
        }
        *count += 1;
    }

    let mut best: Option<(u32, usize)> = None;
    for v in order {
        let count = counts[&v];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn profile(width: u32, height: u32) -> StreamProfile {
        StreamProfile {
            path: PathBuf::from(format!("{width}x{height}.mkv")),
            has_video: true,
            has_audio: true,
            has_subtitles: false,
            width,
            height,
            fps: 30.0,
            video_codec: "h264".to_string(),
            audio_codec: Some("aac".to_string()),
            pixel_format: "yuv420p".to_string(),
            duration_secs: 10.0,
            bitrate: None,
            audio_sample_rate: 48000,
            audio_channels: Some(2),
            container: "matroska,webm".to_string(),
            audio_stream_count: 1,
            subtitle_stream_count: 0,
        }
    }

    #[test]
    fn identical_inputs_are_eligible() {
        let profiles = vec![profile(1920, 1080), profile(1920, 1080), profile(1920, 1080)];
        assert!(check_compatibility(&profiles).is_fast_path_eligible());
    }

    #[test]
    fn fps_within_tolerance() {
        let mut b = profile(1920, 1080);
        b.fps = 30.1;
        assert_eq!(
            check_compatibility(&[profile(1920, 1080), b.clone()]),
            Compatibility::Identical
        );

        b.fps = 29.97;
        assert!(check_compatibility(&[profile(1920, 1080), b.clone()]).is_fast_path_eligible());

        b.fps = 25.0;
        match check_compatibility(&[profile(1920, 1080), b]) {
            Compatibility::Mismatch(m) => {
                assert_eq!(m.parameter, Parameter::Fps);
                assert_eq!(m.expected, "30");
                assert_eq!(m.found, "25");
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn each_parameter_is_reported() {
        type Mutate = fn(&mut StreamProfile);
        let cases: [(Parameter, Mutate); 7] = [
            (Parameter::Width, |p| p.width = 1280),
            (Parameter::Height, |p| p.height = 720),
            (Parameter::Fps, |p| p.fps = 60.0),
            (Parameter::VideoCodec, |p| p.video_codec = "hevc".into()),
            (Parameter::AudioCodec, |p| p.audio_codec = Some("opus".into())),
            (Parameter::PixelFormat, |p| p.pixel_format = "yuv444p".into()),
            (Parameter::AudioSampleRate, |p| p.audio_sample_rate = 44100),
        ];

        for (expected, mutate) in cases {
            let mut other = profile(1920, 1080);
            mutate(&mut other);
            match check_compatibility(&[profile(1920, 1080), other]) {
                Compatibility::Mismatch(m) => {
                    assert_eq!(m.parameter, expected);
                    assert_eq!(m.index, 1);
                }
                verdict => panic!("{expected} not detected: {verdict:?}"),
            }
        }
    }

    #[test]
    fn audio_codec_absence() {
        let mut a = profile(640, 480);
        let mut b = profile(640, 480);
        a.audio_codec = None;
        b.audio_codec = None;
        assert!(check_compatibility(&[a.clone(), b.clone()]).is_fast_path_eligible());

        b.audio_codec = Some("aac".into());
        match check_compatibility(&[a, b]) {
            Compatibility::Mismatch(m) => {
                assert_eq!(m.parameter, Parameter::AudioCodec);
                assert_eq!(m.expected, "none");
                assert_eq!(m.found, "aac");
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn first_mismatch_wins() {
        let mut b = profile(1920, 1080);
        b.height = 720;
        b.video_codec = "hevc".into();
        let mut c = profile(1920, 1080);
        c.width = 1280;
        match check_compatibility(&[profile(1920, 1080), b, c]) {
            Compatibility::Mismatch(m) => {
                assert_eq!(m.parameter, Parameter::Height);
                assert_eq!(m.index, 1);
                assert_eq!(m.to_string(), "height differs in input 2: 1080 vs 720");
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn too_few_inputs() {
        assert_eq!(check_compatibility(&[]), Compatibility::TooFewInputs);
        assert_eq!(
            check_compatibility(&[profile(1, 1)]),
            Compatibility::TooFewInputs
        );
        assert!(!Compatibility::TooFewInputs.is_fast_path_eligible());
    }

    #[test]
    fn remux_check_is_independent_of_verdict() {
        let mut mp4 = profile(1920, 1080);
        mp4.container = "mov,mp4,m4a,3gp,3g2,mj2".into();
        let mkv = profile(1920, 1080);

        assert!(!requires_container_remux(&[mkv.clone(), mkv.clone()], Container::Mkv));
        assert!(requires_container_remux(&[mkv.clone(), mp4.clone()], Container::Mkv));
        assert!(requires_container_remux(&[mp4.clone(), mp4.clone()], Container::Mkv));
        assert!(!requires_container_remux(&[mp4.clone(), mp4], Container::Mp4));

        // Mismatching inputs are still checked.
        let mut other = profile(1280, 720);
        other.container = "avi".into();
        assert!(requires_container_remux(&[mkv, other], Container::Mkv));
    }

    #[test]
    fn summary_caps_at_three() {
        let mut b = profile(1280, 720);
        b.fps = 25.0;
        b.video_codec = "hevc".into();
        let c = profile(640, 480);
        let summary = difference_summary(&[profile(1920, 1080), b, c]);
        assert_eq!(
            summary,
            vec![
                "Resolution: 1920x1080 vs 1280x720",
                "FPS: 30 vs 25",
                "Video codec: h264 vs hevc",
            ]
        );
    }

    #[test]
    fn mode_ties_go_to_first_seen() {
        assert_eq!(mode([720, 1080, 1080, 720]), Some(720));
        assert_eq!(mode([1080, 720, 720]), Some(720));
        assert_eq!(mode(std::iter::empty()), None);
    }

    #[test]
    fn target_axes_chosen_independently() {
        // Mode width 1920 and mode height 720 never occur together.
        let profiles = vec![
            profile(1920, 1080),
            profile(1920, 800),
            profile(1280, 720),
            profile(640, 720),
        ];
        let target = TargetParams::from_profiles(&profiles, &StandardizeSettings::default());
        assert_eq!(target.width, 1920);
        assert_eq!(target.height, 720);
        assert!(!profiles.iter().any(|p| p.width == 1920 && p.height == 720));
        assert_eq!(target.fps, 30.0);
        assert_eq!(target.pixel_format, "yuv420p");
        assert_eq!(target.sample_rate, 48000);
    }

    #[test]
    fn target_satisfaction() {
        let target = TargetParams::from_profiles(
            &[profile(1920, 1080), profile(1920, 1080)],
            &StandardizeSettings::default(),
        );
        let mut p = profile(1920, 1080);
        assert!(target.is_satisfied_by(&p));

        p.fps = 30.05;
        assert!(target.is_satisfied_by(&p));

        p.fps = 24.0;
        assert!(!target.is_satisfied_by(&p));

        let mut p = profile(1920, 1080);
        p.audio_sample_rate = 44100;
        assert!(!target.is_satisfied_by(&p));

        let mut p = profile(1920, 1080);
        p.pixel_format = "yuv420p10le".into();
        assert!(!target.is_satisfied_by(&p));
    }
}
