//! Mergeforged-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across mergeforged:
//!
//! - **Typed IDs**: Type-safe UUID wrapper for merge jobs
//! - **Core Types**: Classification of input files into videos, audio tracks and subtitles
//! - **Path Utilities**: Extension-based file kind detection and output name sanitisation
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use mergeforged_common::{FileKind, JobId, Error, Result};
//! use mergeforged_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let job_id = JobId::new();
//! assert_eq!(FileKind::of(Path::new("episode.srt")), Some(FileKind::Subtitle));
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("job"))
//! }
//! # let _ = job_id;
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
