//! Core type definitions for classifying merge inputs.
//!
//! A merge request is a flat list of paths. [`FileKind`] decides what each
//! path contributes and [`InputSet`] keeps the three groups in the order the
//! user gave them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths::{is_audio_file, is_subtitle_file, is_video_file};

/// Role of a file in a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A video segment to be concatenated.
    Video,
    /// An extra audio track to inject after merging.
    Audio,
    /// A subtitle track to inject after merging.
    Subtitle,
}

impl FileKind {
    /// Classify a path by its extension.
    pub fn of(path: &Path) -> Option<Self> {
        if is_video_file(path) {
            Some(Self::Video)
        } else if is_audio_file(path) {
            Some(Self::Audio)
        } else if is_subtitle_file(path) {
            Some(Self::Subtitle)
        } else {
            None
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Merge inputs grouped by role, each group in user order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSet {
    pub videos: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub subtitles: Vec<PathBuf>,
    /// Paths whose extension matched no known kind.
    pub unknown: Vec<PathBuf>,
}

impl InputSet {
    /// Sort a flat list of paths into groups.
    pub fn classify<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::default();
        for path in paths {
            let path = path.into();
            match FileKind::of(&path) {
                Some(FileKind::Video) => set.videos.push(path),
                Some(FileKind::Audio) => set.audio.push(path),
                Some(FileKind::Subtitle) => set.subtitles.push(path),
                None => set.unknown.push(path),
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_of() {
        assert_eq!(FileKind::of(Path::new("a.mkv")), Some(FileKind::Video));
        assert_eq!(FileKind::of(Path::new("a.mp3")), Some(FileKind::Audio));
        assert_eq!(FileKind::of(Path::new("a.srt")), Some(FileKind::Subtitle));
        assert_eq!(FileKind::of(Path::new("a.txt")), None);
    }

    #[test]
    fn test_file_kind_serde() {
        let json = serde_json::to_string(&FileKind::Subtitle).unwrap();
        assert_eq!(json, "\"subtitle\"");
        assert_eq!(FileKind::Audio.to_string(), "audio");
    }

    #[test]
    fn test_classify_preserves_order() {
        let set = InputSet::classify([
            "part2.mp4",
            "eng.srt",
            "part1.mkv",
            "dub.m4a",
            "notes.txt",
            "fre.ass",
        ]);
        assert_eq!(
            set.videos,
            vec![PathBuf::from("part2.mp4"), PathBuf::from("part1.mkv")]
        );
        assert_eq!(set.audio, vec![PathBuf::from("dub.m4a")]);
        assert_eq!(
            set.subtitles,
            vec![PathBuf::from("eng.srt"), PathBuf::from("fre.ass")]
        );
        assert_eq!(set.unknown, vec![PathBuf::from("notes.txt")]);
    }
}
