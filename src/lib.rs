//! Mergeforged - video merging tool
//!
//! This library crate exposes the CLI plumbing for integration testing.

pub mod config;
pub mod jobs;
pub mod status;
