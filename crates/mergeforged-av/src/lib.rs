//! # mergeforged-av
//!
//! Merge engine for video files, driving `ffmpeg` and `ffprobe`.
//!
//! This crate provides:
//! - Probing inputs into a typed [`StreamProfile`]
//! - Compatibility analysis deciding between stream copy and re-encoding
//! - The fast path (optional remux, then concat by stream copy, then verification)
//! - The standardization fallback (scale, pad and re-encode, then concat)
//! - Progress extraction from a running ffmpeg, throttled to a [`StatusSink`]
//! - Subtitle and audio track injection into a merged file
//!
//! ## Example
//!
//! ```no_run
//! use mergeforged_av::{Engine, JobContext, MergeJob, MergeSettings, StandardizeSettings};
//! use mergeforged_av::{StatusReporter, ToolRegistry, ToolsConfig};
//! use mergeforged_common::JobId;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> mergeforged_av::Result<()> {
//! let tools = ToolRegistry::discover(&ToolsConfig::default());
//! let engine = Engine::new(&tools, MergeSettings::default(), StandardizeSettings::default())?;
//! let ctx = JobContext::new(JobId::new(), CancellationToken::new(), StatusReporter::silent());
//!
//! let job = MergeJob::new(["part1.mkv", "part2.mkv"]).subtitles(["english.srt"]);
//! let merged = engine.run(&ctx, &job).await?;
//! println!("merged into {}", merged.display());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod args;
pub mod command;
pub mod compat;
mod context;
mod error;
mod merge;
pub mod probe;
pub mod progress;
pub mod settings;
pub mod status;
pub mod tools;
pub mod workspace;

pub use command::{ToolCommand, ToolOutput};
pub use compat::{
    check_compatibility, requires_container_remux, Compatibility, Mismatch, Parameter,
    TargetParams,
};
pub use context::{Engine, JobContext};
pub use error::{Error, Result};
pub use merge::MergeJob;
pub use probe::{FfprobeProber, MediaProber, StreamProfile};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use settings::{Container, MergeSettings, StandardizeSettings, ToolsConfig};
pub use status::{NullSink, StatusReporter, StatusSink};
pub use tools::{ToolInfo, ToolRegistry};
pub use workspace::Workspace;
