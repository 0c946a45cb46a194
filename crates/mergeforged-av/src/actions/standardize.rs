//! Re-encode fallback: normalize every input, then concatenate.

use std::path::{Path, PathBuf};

use super::concat;
use crate::args::StandardizeArgs;
use crate::compat::TargetParams;
use crate::context::{Engine, JobContext};
use crate::probe::StreamProfile;
use crate::settings::StandardizeSettings;
use crate::workspace::{move_file, verify_nonempty, Workspace};
use crate::{Error, Result};

/// Whether `profile` can join re-encoded files by plain copy.
///
/// Beyond the target parameters, the codecs and stream layout must be the
/// ones the encoder produces, or the final stream-copy concat would mix
/// incompatible streams.
fn can_copy(profile: &StreamProfile, target: &TargetParams, encoder: &StandardizeSettings) -> bool {
    target.is_satisfied_by(profile)
        && profile.video_codec == encoder.video_codec_name()
        && profile.audio_codec.as_deref() == Some(encoder.audio_codec_name().as_str())
        && profile.audio_channels == Some(target.audio_channels)
        && profile.audio_stream_count == 1
        && profile.subtitle_stream_count == 0
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Bring every input to common parameters and concatenate them.
///
/// Width and height are the per-axis mode over the inputs. Any input that
/// fails to standardize fails the whole merge; intermediates are removed on
/// every path.
pub async fn standardize_and_merge(
    engine: &Engine,
    ctx: &JobContext,
    profiles: &[StreamProfile],
    output: &Path,
) -> Result<PathBuf> {
    let encoder = engine.standardize_settings();
    let container = engine.merge_settings().container;
    let target = TargetParams::from_profiles(profiles, encoder);

    ctx.status
        .stage(format!(
            "Standardizing videos to common format\nResolution: {}x{}\nFrame rate: {}fps\nFormat: {}/{}/{}",
            target.width,
            target.height,
            target.fps,
            container.extension().to_uppercase(),
            encoder.video_codec_name().to_uppercase(),
            encoder.audio_codec_name().to_uppercase(),
        ))
        .await;

    let workspace = Workspace::beside(output, &ctx.id)?;
    let total = profiles.len();
    let mut normalized = Vec::with_capacity(total);

    for (i, profile) in profiles.iter().enumerate() {
        ctx.check_cancelled()?;
        ctx.status
            .stage(format!(
                "Standardizing video {}/{}\nProcessing: {}",
                i + 1,
                total,
                file_name(&profile.path)
            ))
            .await;

        let dest = workspace.temp_file(&format!("std_{i}.{}", container.extension()));

        let result = if can_copy(profile, &target, encoder) {
            tracing::info!(job_id = %ctx.id, "Already standardized, copying: {:?}", profile.path);
            tokio::fs::copy(&profile.path, &dest)
                .await
                .map(|_| ())
                .map_err(|e| Error::filesystem("copy", &profile.path, e))
        } else {
            encode(engine, ctx, profile, &target, &dest, i + 1, total).await
        };

        if let Err(e) = result {
            if !e.is_cancelled() {
                tracing::error!(job_id = %ctx.id, "Standardization failed for {:?}: {}", profile.path, e);
                ctx.status
                    .stage(format!("Failed to standardize video {}", i + 1))
                    .await;
            }
            return Err(e);
        }
        normalized.push(dest);
    }

    ctx.status.stage("Final merge of standardized videos").await;
    let total_secs: f64 = profiles.iter().map(|p| p.duration_secs).sum();
    let staged = workspace.temp_file(&format!("merged.{}", container.extension()));

    if let Err(e) = concat(engine, ctx, &workspace, &normalized, total_secs, &staged, "Final merge").await {
        if !e.is_cancelled() {
            tracing::error!(job_id = %ctx.id, "Final merge failed: {}", e);
            ctx.status.stage("Final merge failed").await;
        }
        return Err(e);
    }

    move_file(&staged, output)?;
    ctx.status.stage("Video merge completed successfully").await;
    Ok(output.to_path_buf())
}

async fn encode(
    engine: &Engine,
    ctx: &JobContext,
    profile: &StreamProfile,
    target: &TargetParams,
    dest: &Path,
    position: usize,
    total: usize,
) -> Result<()> {
    let args = StandardizeArgs {
        input: &profile.path,
        output: dest,
        target,
        encoder: engine.standardize_settings(),
        has_audio: profile.has_audio,
        container: engine.merge_settings().container,
    }
    .to_args();

    let label = format!("Standardizing video {position}/{total}");
    engine
        .ffmpeg(ctx, "standardize", args)
        .execute_tracked(engine.tracker(ctx, &label, profile.duration_secs))
        .await?;
    verify_nonempty(dest)?;

    tracing::info!(job_id = %ctx.id, "Successfully standardized: {:?}", profile.path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> StreamProfile {
        StreamProfile {
            path: PathBuf::from("a.mkv"),
            has_video: true,
            has_audio: true,
            has_subtitles: false,
            width: 1280,
            height: 720,
            fps: 30.0,
            video_codec: "h264".into(),
            audio_codec: Some("aac".into()),
            pixel_format: "yuv420p".into(),
            duration_secs: 5.0,
            bitrate: None,
            audio_sample_rate: 48000,
            audio_channels: Some(2),
            container: "matroska,webm".into(),
            audio_stream_count: 1,
            subtitle_stream_count: 0,
        }
    }

    fn target() -> TargetParams {
        TargetParams::from_profiles(&[profile()], &StandardizeSettings::default())
    }

    #[test]
    fn matching_file_is_copied() {
        assert!(can_copy(&profile(), &target(), &StandardizeSettings::default()));
    }

    #[test]
    fn other_codec_is_reencoded() {
        let mut p = profile();
        p.video_codec = "hevc".into();
        assert!(target().is_satisfied_by(&p));
        assert!(!can_copy(&p, &target(), &StandardizeSettings::default()));
    }

    #[test]
    fn extra_streams_are_reencoded() {
        let mut p = profile();
        p.subtitle_stream_count = 1;
        assert!(!can_copy(&p, &target(), &StandardizeSettings::default()));

        let mut p = profile();
        p.audio_stream_count = 2;
        assert!(!can_copy(&p, &target(), &StandardizeSettings::default()));

        let mut p = profile();
        p.audio_channels = Some(6);
        assert!(!can_copy(&p, &target(), &StandardizeSettings::default()));
    }

    #[test]
    fn missing_audio_is_reencoded() {
        let mut p = profile();
        p.has_audio = false;
        p.audio_codec = None;
        p.audio_channels = None;
        p.audio_stream_count = 0;
        assert!(!can_copy(&p, &target(), &StandardizeSettings::default()));
    }
}
