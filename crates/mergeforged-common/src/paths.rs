//! Path utilities for detecting file types by extension and naming outputs.
//!
//! The merge front-end accepts a single list of files and sorts it into
//! videos, extra audio tracks and subtitles using these helpers. Output
//! names supplied by users are sanitised before they touch the filesystem.

use std::path::Path;

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "webm", "mov", "wmv", "flv",
];

/// List of supported standalone audio file extensions.
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "wav", "ogg", "opus", "ac3", "eac3", "dts", "mka", "wma",
];

/// List of supported subtitle file extensions.
///
/// Only text formats are accepted since injected subtitles are converted to SubRip.
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt"];

/// Characters that are not allowed in output file names.
const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length of a sanitised output stem.
pub const MAX_OUTPUT_NAME_LEN: usize = 200;

fn has_extension(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| list.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mergeforged_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.mp4")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path has a standalone audio file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mergeforged_common::paths::is_audio_file;
///
/// assert!(is_audio_file(Path::new("commentary.m4a")));
/// assert!(!is_audio_file(Path::new("movie.mkv")));
/// ```
pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Check if a path has a subtitle file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mergeforged_common::paths::is_subtitle_file;
///
/// assert!(is_subtitle_file(Path::new("movie.srt")));
/// assert!(is_subtitle_file(Path::new("/path/to/subtitle.ass")));
/// assert!(!is_subtitle_file(Path::new("video.mkv")));
/// ```
pub fn is_subtitle_file(path: &Path) -> bool {
    has_extension(path, SUBTITLE_EXTENSIONS)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Get the list of audio file extensions.
#[must_use]
pub fn audio_extensions() -> &'static [&'static str] {
    AUDIO_EXTENSIONS
}

/// Get the list of subtitle file extensions.
#[must_use]
pub fn subtitle_extensions() -> &'static [&'static str] {
    SUBTITLE_EXTENSIONS
}

/// Sanitise a user-supplied output name.
///
/// The extension (if any) is stripped, forbidden characters become `_`,
/// control characters are removed, surrounding dots and spaces are trimmed
/// and the result is capped at [`MAX_OUTPUT_NAME_LEN`] characters.
/// Returns `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use mergeforged_common::paths::sanitize_output_name;
///
/// assert_eq!(sanitize_output_name("My: Movie?.mp4").as_deref(), Some("My_ Movie_"));
/// assert_eq!(sanitize_output_name(" .. ").as_deref(), None);
/// ```
pub fn sanitize_output_name(name: &str) -> Option<String> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    let cleaned: String = stem
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == ' ');
    let capped: String = trimmed.chars().take(MAX_OUTPUT_NAME_LEN).collect();

    if capped.is_empty() {
        None
    } else {
        Some(capped)
    }
}

/// Default output name for a merge started at `unix_seconds`.
#[must_use]
pub fn default_output_name(unix_seconds: i64, extension: &str) -> String {
    format!("merged_{unix_seconds}.{extension}")
}

/// Build the output file name, falling back to the timestamped default.
///
/// # Examples
///
/// ```
/// use mergeforged_common::paths::output_file_name;
///
/// assert_eq!(output_file_name(Some("final cut.mp4"), "mkv"), "final cut.mkv");
/// assert!(output_file_name(None, "mkv").starts_with("merged_"));
/// ```
#[must_use]
pub fn output_file_name(custom: Option<&str>, extension: &str) -> String {
    match custom.and_then(sanitize_output_name) {
        Some(stem) => format!("{stem}.{extension}"),
        None => default_output_name(chrono::Utc::now().timestamp(), extension),
    }
}
