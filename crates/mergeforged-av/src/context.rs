//! Shared state handed to every merge stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mergeforged_common::JobId;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::probe::{FfprobeProber, MediaProber, StreamProfile};
use crate::progress::ProgressTracker;
use crate::settings::{MergeSettings, StandardizeSettings};
use crate::status::StatusReporter;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// Upper bound for a single encode, concat or remux process.
const STAGE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Read-only environment shared by all jobs: tool paths, prober and settings.
#[derive(Clone)]
pub struct Engine {
    ffmpeg: PathBuf,
    prober: Arc<dyn MediaProber>,
    merge: MergeSettings,
    standardize: StandardizeSettings,
}

impl Engine {
    /// Build an engine using ffprobe from `tools` for probing.
    pub fn new(
        tools: &ToolRegistry,
        merge: MergeSettings,
        standardize: StandardizeSettings,
    ) -> Result<Self> {
        let prober = Arc::new(FfprobeProber::new(tools)?);
        Self::with_prober(tools, prober, merge, standardize)
    }

    /// Build an engine with a custom prober.
    pub fn with_prober(
        tools: &ToolRegistry,
        prober: Arc<dyn MediaProber>,
        merge: MergeSettings,
        standardize: StandardizeSettings,
    ) -> Result<Self> {
        Ok(Self {
            ffmpeg: tools.require("ffmpeg")?.to_path_buf(),
            prober,
            merge,
            standardize,
        })
    }

    pub fn merge_settings(&self) -> &MergeSettings {
        &self.merge
    }

    pub fn standardize_settings(&self) -> &StandardizeSettings {
        &self.standardize
    }

    /// Probe one file on behalf of a job.
    pub async fn probe(&self, ctx: &JobContext, path: &Path) -> Result<StreamProfile> {
        ctx.check_cancelled()?;
        self.prober.probe(path, &ctx.cancel).await
    }

    /// An ffmpeg command bound to the job's cancellation token.
    pub(crate) fn ffmpeg(&self, ctx: &JobContext, stage: &str, args: Vec<String>) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.stage(stage)
            .args(args)
            .timeout(STAGE_TIMEOUT)
            .cancel_on(&ctx.cancel);
        cmd
    }

    /// A progress tracker reporting to the job's status sink.
    pub(crate) fn tracker(&self, ctx: &JobContext, label: &str, total_secs: f64) -> ProgressTracker {
        ProgressTracker::new(label, total_secs, ctx.status.clone(), self.merge.read_timeout())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ffmpeg", &self.ffmpeg)
            .field("prober", &self.prober.name())
            .field("merge", &self.merge)
            .field("standardize", &self.standardize)
            .finish()
    }
}

/// Per-job handles: identity, cancellation and status output.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub id: JobId,
    pub cancel: CancellationToken,
    pub status: StatusReporter,
}

impl JobContext {
    pub fn new(id: JobId, cancel: CancellationToken, status: StatusReporter) -> Self {
        Self { id, cancel, status }
    }

    /// Fail with [`Error::Cancelled`] once the job has been cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    fn engine() -> Engine {
        let tools = ToolRegistry::with_paths("/opt/ffmpeg/bin/ffmpeg", "/opt/ffmpeg/bin/ffprobe");
        Engine::new(&tools, MergeSettings::default(), StandardizeSettings::default()).unwrap()
    }

    #[test]
    fn ffmpeg_command_keeps_stage_args() {
        let ctx = JobContext::new(JobId::new(), CancellationToken::new(), StatusReporter::silent());
        let cmd = engine().ffmpeg(&ctx, "concat", vec!["-i".into(), "list.txt".into()]);
        assert_eq!(cmd.get_args(), ["-i", "list.txt"]);
    }

    #[tokio::test]
    async fn cancelled_job_skips_stream_inspection() {
        let ctx = JobContext::new(JobId::new(), CancellationToken::new(), StatusReporter::silent());
        ctx.cancel.cancel();
        let err = engine().probe(&ctx, Path::new("a.mkv")).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
