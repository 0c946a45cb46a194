//! Composite merge: probe, decide, merge, then inject extra tracks.

use std::path::{Path, PathBuf};

use mergeforged_common::paths::output_file_name;
use mergeforged_common::InputSet;

use crate::actions::{
    fast_path_merge, inject_audio, inject_subtitles, standardize_and_merge, FastPathOutcome,
};
use crate::compat::{check_compatibility, difference_summary, Compatibility};
use crate::context::{Engine, JobContext};
use crate::probe::StreamProfile;
use crate::{Error, Result};

/// One merge request: ordered videos plus optional extra tracks.
#[derive(Debug, Clone, Default)]
pub struct MergeJob {
    /// Videos in concatenation order.
    pub videos: Vec<PathBuf>,
    /// Custom output file name; sanitized, extension replaced.
    pub output_name: Option<String>,
    pub subtitles: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    /// Directory for the output; defaults to the configured work dir.
    pub work_dir: Option<PathBuf>,
}

impl MergeJob {
    pub fn new(videos: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            videos: videos.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Build a job from a classified input set. Unknown files are ignored.
    pub fn from_inputs(inputs: InputSet) -> Self {
        Self {
            videos: inputs.videos,
            subtitles: inputs.subtitles,
            audio: inputs.audio,
            ..Default::default()
        }
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn subtitles(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.subtitles.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn audio(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.audio.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Check the request before any process is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.videos.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "need at least 2 video files to merge, got {}",
                self.videos.len()
            )));
        }
        for path in self.videos.iter().chain(&self.subtitles).chain(&self.audio) {
            if !path.is_file() {
                return Err(Error::InvalidInput(format!(
                    "input file not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

impl Engine {
    /// Where `job` writes its result.
    pub fn output_path(&self, job: &MergeJob) -> PathBuf {
        let dir = job
            .work_dir
            .clone()
            .unwrap_or_else(|| self.merge_settings().work_dir());
        dir.join(output_file_name(
            job.output_name.as_deref(),
            self.merge_settings().container.extension(),
        ))
    }

    /// Probe every video, in order.
    pub async fn probe_all(&self, ctx: &JobContext, videos: &[PathBuf]) -> Result<Vec<StreamProfile>> {
        let mut profiles = Vec::with_capacity(videos.len());
        for path in videos {
            profiles.push(self.probe(ctx, path).await?);
        }
        Ok(profiles)
    }

    /// Merge the videos of `job` into `output`.
    ///
    /// Identical inputs go through the fast path first; anything else, and
    /// any fast path failure short of cancellation, goes through
    /// standardization.
    pub async fn merge_videos(&self, ctx: &JobContext, job: &MergeJob, output: &Path) -> Result<PathBuf> {
        job.validate()?;

        ctx.status.stage("Analyzing video compatibility").await;
        let profiles = self.probe_all(ctx, &job.videos).await?;

        match check_compatibility(&profiles) {
            Compatibility::Identical => {
                ctx.status
                    .stage("All videos have identical parameters, using fast merge")
                    .await;
                match fast_path_merge(self, ctx, &profiles, output).await? {
                    FastPathOutcome::Merged { path, .. } => return Ok(path),
                    FastPathOutcome::Fallback { reason } => {
                        tracing::info!(job_id = %ctx.id, "Falling back to standardization: {}", reason);
                    }
                }
            }
            Compatibility::Mismatch(mismatch) => {
                tracing::info!(job_id = %ctx.id, "Videos need standardization: {}", mismatch);
                let mut text = String::from("Videos have different parameters, standardizing");
                for line in difference_summary(&profiles) {
                    text.push_str("\n- ");
                    text.push_str(&line);
                }
                ctx.status.stage(text).await;
            }
            Compatibility::TooFewInputs => {
                return Err(Error::InvalidInput("need at least 2 video files to merge".into()));
            }
        }

        ctx.check_cancelled()?;
        standardize_and_merge(self, ctx, &profiles, output).await
    }

    /// Run `job` end to end and return the final file.
    ///
    /// Video merge, then subtitle injection, then audio injection. A failed
    /// injection is an error unless `keep_partial_on_injection_failure` is
    /// set, in which case the merged file is returned as it stood before the
    /// failing stage. Exactly one final status reports success or failure.
    pub async fn run(&self, ctx: &JobContext, job: &MergeJob) -> Result<PathBuf> {
        let output = self.output_path(job);
        tracing::info!(
            job_id = %ctx.id,
            "Starting merge of {} videos into {:?}",
            job.videos.len(),
            output
        );

        let result = self.run_stages(ctx, job, &output).await;
        match &result {
            Ok(path) => {
                tracing::info!(job_id = %ctx.id, "Merge finished: {:?}", path);
                ctx.status
                    .stage(format!("Merge completed: {}", path.display()))
                    .await;
            }
            Err(Error::Cancelled) => {
                tracing::info!(job_id = %ctx.id, "Merge cancelled");
                ctx.status.stage("Merge failed: cancelled").await;
            }
            Err(e) => {
                tracing::error!(job_id = %ctx.id, "Merge failed: {}", e);
                ctx.status.stage(format!("Merge failed: {e}")).await;
            }
        }
        result
    }

    async fn run_stages(&self, ctx: &JobContext, job: &MergeJob, output: &Path) -> Result<PathBuf> {
        let merged = self.merge_videos(ctx, job, output).await?;

        if !job.subtitles.is_empty() {
            ctx.check_cancelled()?;
            if let Err(e) = inject_subtitles(self, ctx, &merged, &job.subtitles).await {
                return self.injection_failed(ctx, merged, e, "subtitle");
            }
        }

        if !job.audio.is_empty() {
            ctx.check_cancelled()?;
            if let Err(e) = inject_audio(self, ctx, &merged, &job.audio).await {
                return self.injection_failed(ctx, merged, e, "audio");
            }
        }

        Ok(merged)
    }

    fn injection_failed(
        &self,
        ctx: &JobContext,
        merged: PathBuf,
        error: Error,
        kind: &str,
    ) -> Result<PathBuf> {
        if self.merge_settings().keep_partial_on_injection_failure && !error.is_cancelled() {
            tracing::warn!(
                job_id = %ctx.id,
                "{} injection failed, keeping merged file {:?}: {}",
                kind,
                merged,
                error
            );
            Ok(merged)
        } else {
            Err(error)
        }
    }
}
