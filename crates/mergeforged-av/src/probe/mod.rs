//! Media file probing.
//!
//! The [`MediaProber`] trait is the seam the merge engine probes through;
//! [`FfprobeProber`] is the production implementation.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_json, parse_frame_rate, probe_with_ffprobe};
pub use types::*;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::tools::ToolRegistry;
use crate::Result;

/// Extracts a [`StreamProfile`] from a media file.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe `path`, failing with `Probe` or `NoVideoStream` when the file
    /// is unusable.
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<StreamProfile>;
}

/// Prober backed by the ffprobe CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
}

impl FfprobeProber {
    pub fn new(tools: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            ffprobe: tools.require("ffprobe")?.to_path_buf(),
        })
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<StreamProfile> {
        probe_with_ffprobe(&self.ffprobe, path, cancel).await
    }
}
