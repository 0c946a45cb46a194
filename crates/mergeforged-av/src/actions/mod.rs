//! Merge stages.
//!
//! - Remuxing a file into the target container
//! - Concatenation by stream copy
//! - The fast path: optional remux, concat, verification
//! - The standardization fallback: re-encode, then concat
//! - Subtitle and audio track injection

mod concat;
mod fast_path;
mod inject;
mod remux;
mod standardize;

pub use concat::concat;
pub use fast_path::{fast_path_merge, FastPathOutcome};
pub use inject::{inject_audio, inject_subtitles};
pub use remux::remux;
pub use standardize::standardize_and_merge;
