//! Lossless merge by stream copy.

use std::path::{Path, PathBuf};

use super::{concat, remux};
use crate::compat::requires_container_remux;
use crate::context::{Engine, JobContext};
use crate::probe::StreamProfile;
use crate::status::readable_size;
use crate::workspace::{move_file, Workspace};
use crate::{Error, Result};

/// Result of a fast path attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastPathOutcome {
    /// The merged file is at `path`.
    Merged {
        path: PathBuf,
        size: u64,
        remuxed: bool,
    },
    /// The fast path did not produce a usable file; standardize instead.
    Fallback { reason: String },
}

/// Merge inputs that passed the compatibility check by stream copy.
///
/// Inputs are remuxed into the target container first when any of them is
/// in another one. The result is re-probed and must carry both video and
/// audio. Every failure except cancellation is reported as
/// [`FastPathOutcome::Fallback`]; scratch files are removed either way.
pub async fn fast_path_merge(
    engine: &Engine,
    ctx: &JobContext,
    profiles: &[StreamProfile],
    output: &Path,
) -> Result<FastPathOutcome> {
    match try_fast_path(engine, ctx, profiles, output).await {
        Ok(outcome) => Ok(outcome),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e @ Error::Verification { .. }) => {
            tracing::warn!(job_id = %ctx.id, "Fast merge output rejected: {}", e);
            ctx.status
                .stage("Fast merge produced incomplete output, falling back to standardization")
                .await;
            Ok(FastPathOutcome::Fallback {
                reason: e.to_string(),
            })
        }
        Err(e) => {
            tracing::warn!(job_id = %ctx.id, "Fast merge failed: {}", e);
            ctx.status
                .stage("Fast merge failed, falling back to standardization")
                .await;
            Ok(FastPathOutcome::Fallback {
                reason: e.to_string(),
            })
        }
    }
}

async fn try_fast_path(
    engine: &Engine,
    ctx: &JobContext,
    profiles: &[StreamProfile],
    output: &Path,
) -> Result<FastPathOutcome> {
    let container = engine.merge_settings().container;
    let workspace = Workspace::beside(output, &ctx.id)?;
    let mut files: Vec<PathBuf> = profiles.iter().map(|p| p.path.clone()).collect();

    let remuxed = requires_container_remux(profiles, container);
    if remuxed {
        ctx.status
            .stage("Container compatibility issue detected, remuxing files")
            .await;
        let total = profiles.len();
        for (i, profile) in profiles.iter().enumerate() {
            let target = workspace.temp_file(&format!("remux_{i}.{}", container.extension()));
            let label = format!("Remuxing video {}/{} to {}", i + 1, total, container);
            if let Err(e) =
                remux(engine, ctx, &profile.path, &target, profile.duration_secs, &label).await
            {
                if !e.is_cancelled() {
                    ctx.status
                        .stage(format!("Failed to remux video {}", i + 1))
                        .await;
                }
                return Err(e);
            }
            files[i] = target;
        }
    }

    ctx.status.stage("Starting fast merge").await;
    let total_secs: f64 = profiles.iter().map(|p| p.duration_secs).sum();
    let staged = workspace.temp_file(&format!("merged.{}", container.extension()));
    let size = concat(engine, ctx, &workspace, &files, total_secs, &staged, "Fast merge").await?;

    let merged = engine.probe(ctx, &staged).await.map_err(|e| match e {
        Error::Cancelled => Error::Cancelled,
        other => Error::verification(&staged, other.to_string()),
    })?;
    if !(merged.has_video && merged.has_audio) {
        return Err(Error::verification(
            &staged,
            "merged output is missing its video or audio stream",
        ));
    }

    move_file(&staged, output)?;

    ctx.status
        .stage(format!(
            "Fast merge completed\nOutput: {}\nSize: {}\nStreams: video + audio\nMode: {}",
            output
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            readable_size(size),
            if remuxed { "container-fixed" } else { "stream copy" },
        ))
        .await;

    Ok(FastPathOutcome::Merged {
        path: output.to_path_buf(),
        size,
        remuxed,
    })
}
