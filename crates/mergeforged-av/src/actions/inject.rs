//! Adding subtitle and audio tracks to a merged file.
//!
//! Both entry points write a new file next to the target and move it over
//! the target only after ffmpeg succeeds, so a failed injection leaves the
//! merged file untouched.

use std::path::{Path, PathBuf};

use crate::args::{AudioInjectArgs, SubtitleInjectArgs};
use crate::context::{Engine, JobContext};
use crate::workspace::{replace_file, verify_nonempty, Workspace};
use crate::Result;

/// Add `subtitles` to `target` as new text subtitle streams.
///
/// New streams are titled `Track N+1`, `Track N+2`, ... where `N` is the
/// number of subtitle streams `target` already has.
pub async fn inject_subtitles(
    engine: &Engine,
    ctx: &JobContext,
    target: &Path,
    subtitles: &[PathBuf],
) -> Result<PathBuf> {
    if subtitles.is_empty() {
        return Ok(target.to_path_buf());
    }

    ctx.status
        .stage(if subtitles.len() == 1 {
            "Merging subtitles".to_string()
        } else {
            format!("Merging {} subtitle tracks", subtitles.len())
        })
        .await;

    let profile = engine.probe(ctx, target).await?;
    let container = engine.merge_settings().container;
    let workspace = Workspace::beside(target, &ctx.id)?;
    let staged = workspace.temp_file(&format!("softmuxed.{}", container.extension()));

    let args = SubtitleInjectArgs {
        input: target,
        subtitles,
        existing: profile.subtitle_stream_count,
        output: &staged,
        container,
    }
    .to_args();

    tracing::info!(
        job_id = %ctx.id,
        "Adding {} subtitle(s) to {:?} ({} existing)",
        subtitles.len(),
        target,
        profile.subtitle_stream_count
    );

    engine
        .ffmpeg(ctx, "inject subtitles", args)
        .execute_tracked(engine.tracker(ctx, "Merging subtitles", profile.duration_secs))
        .await?;
    verify_nonempty(&staged)?;
    replace_file(&staged, target)?;

    ctx.status.stage("Subtitles added").await;
    Ok(target.to_path_buf())
}

/// Add `audio` to `target` as new audio streams.
///
/// Existing audio streams lose their default flag; new streams are titled
/// `Track M+1`, ... and, when `target` had no audio, the first new stream
/// becomes the default.
pub async fn inject_audio(
    engine: &Engine,
    ctx: &JobContext,
    target: &Path,
    audio: &[PathBuf],
) -> Result<PathBuf> {
    if audio.is_empty() {
        return Ok(target.to_path_buf());
    }

    ctx.status.stage("Merging audio tracks").await;

    let profile = engine.probe(ctx, target).await?;
    let container = engine.merge_settings().container;
    let workspace = Workspace::beside(target, &ctx.id)?;
    let staged = workspace.temp_file(&format!("multiaudio.{}", container.extension()));

    let args = AudioInjectArgs {
        input: target,
        audio,
        existing: profile.audio_stream_count,
        output: &staged,
        container,
    }
    .to_args();

    tracing::info!(
        job_id = %ctx.id,
        "Adding {} audio track(s) to {:?} ({} existing)",
        audio.len(),
        target,
        profile.audio_stream_count
    );

    engine
        .ffmpeg(ctx, "inject audio", args)
        .execute_tracked(engine.tracker(ctx, "Merging audio tracks", profile.duration_secs))
        .await?;
    verify_nonempty(&staged)?;
    replace_file(&staged, target)?;

    ctx.status.stage("Audio tracks added").await;
    Ok(target.to_path_buf())
}
