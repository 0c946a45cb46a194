//! Typed ffmpeg argument builders, one per merge stage.
//!
//! Each builder fixes the stream mapping, codec choice and output flags of
//! its stage so the contract can be reviewed and tested without running
//! ffmpeg.

use std::path::{Path, PathBuf};

use crate::command::path_arg;
use crate::compat::TargetParams;
use crate::settings::{Container, StandardizeSettings};

/// Flags shared by every invocation.
fn preamble() -> Vec<String> {
    ["-hide_banner", "-loglevel", "info", "-y"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Report progress as key/value lines on stderr.
const PROGRESS: [&str; 2] = ["-progress", "pipe:2"];

fn push(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn finish(args: &mut Vec<String>, container: Container, output: &Path) {
    push(args, &["-f", container.muxer()]);
    push(args, &PROGRESS);
    args.push(path_arg(output));
}

/// Stream-copy one file into the target container.
#[derive(Debug, Clone)]
pub struct RemuxArgs<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub container: Container,
}

impl RemuxArgs<'_> {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = preamble();
        args.push("-i".into());
        args.push(path_arg(self.input));
        push(&mut args, &["-map", "0", "-c", "copy"]);
        finish(&mut args, self.container, self.output);
        args
    }
}

/// Concatenate the files named in a concat list by stream copy.
#[derive(Debug, Clone)]
pub struct ConcatArgs<'a> {
    pub list_file: &'a Path,
    pub output: &'a Path,
    pub container: Container,
}

impl ConcatArgs<'_> {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = preamble();
        push(&mut args, &["-f", "concat", "-safe", "0", "-i"]);
        args.push(path_arg(self.list_file));
        push(&mut args, &["-map", "0", "-c", "copy"]);
        finish(&mut args, self.container, self.output);
        args
    }
}

/// Escape a path for a concat demuxer list entry.
///
/// ```
/// use mergeforged_av::args::concat_list_entry;
/// use std::path::Path;
///
/// assert_eq!(concat_list_entry(Path::new("/in/it's.mkv")), "file '/in/it'\\''s.mkv'");
/// ```
pub fn concat_list_entry(path: &Path) -> String {
    format!("file '{}'", path_arg(path).replace('\'', "'\\''"))
}

/// Re-encode one file to the target parameters.
///
/// Exactly one video and one audio stream are kept. Inputs without audio get
/// a silent track so every standardized file carries both stream types.
#[derive(Debug, Clone)]
pub struct StandardizeArgs<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub target: &'a TargetParams,
    pub encoder: &'a StandardizeSettings,
    pub has_audio: bool,
    pub container: Container,
}

impl StandardizeArgs<'_> {
    /// `scale` to fit, `pad` to centre, then fix frame rate and pixel format.
    pub fn video_filter(&self) -> String {
        let t = self.target;
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},format={pix}",
            w = t.width,
            h = t.height,
            fps = t.fps,
            pix = t.pixel_format,
        )
    }

    pub fn to_args(&self) -> Vec<String> {
        let t = self.target;
        let e = self.encoder;
        let mut args = preamble();
        args.push("-i".into());
        args.push(path_arg(self.input));

        if !self.has_audio {
            let layout = if t.audio_channels == 1 { "mono" } else { "stereo" };
            push(&mut args, &["-f", "lavfi", "-i"]);
            args.push(format!(
                "anullsrc=channel_layout={layout}:sample_rate={}",
                t.sample_rate
            ));
        }

        args.push("-vf".into());
        args.push(self.video_filter());
        push(&mut args, &["-c:v", e.video_codec.as_str(), "-preset", e.preset.as_str()]);
        push(&mut args, &["-crf", e.crf.to_string().as_str()]);

        push(&mut args, &["-c:a", e.audio_codec.as_str()]);
        push(&mut args, &["-ar", t.sample_rate.to_string().as_str()]);
        push(&mut args, &["-ac", t.audio_channels.to_string().as_str()]);
        push(&mut args, &["-b:a", e.audio_bitrate.as_str()]);

        push(&mut args, &["-map", "0:v:0"]);
        if self.has_audio {
            push(&mut args, &["-map", "0:a:0"]);
        } else {
            push(&mut args, &["-map", "1:a:0", "-shortest"]);
        }

        finish(&mut args, self.container, self.output);
        args
    }
}

/// Add subtitle files to a merged file.
#[derive(Debug, Clone)]
pub struct SubtitleInjectArgs<'a> {
    pub input: &'a Path,
    pub subtitles: &'a [PathBuf],
    /// Subtitle streams already present in `input`.
    pub existing: usize,
    pub output: &'a Path,
    pub container: Container,
}

impl SubtitleInjectArgs<'_> {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = preamble();
        args.push("-i".into());
        args.push(path_arg(self.input));
        for sub in self.subtitles {
            args.push("-i".into());
            args.push(path_arg(sub));
        }

        push(&mut args, &["-map", "0:v:0", "-map", "0:a:?", "-map", "0:s:?"]);
        for i in 0..self.subtitles.len() {
            let stream = self.existing + i;
            args.push("-map".into());
            args.push(format!("{}:s", i + 1));
            args.push(format!("-metadata:s:s:{stream}"));
            args.push(track_title(stream));
        }

        push(&mut args, &["-c:v", "copy", "-c:a", "copy"]);
        push(&mut args, &["-c:s", self.container.subtitle_codec()]);
        finish(&mut args, self.container, self.output);
        args
    }
}

/// Add audio files to a merged file.
///
/// Existing audio streams lose their default flag. If there were none, the
/// first added stream becomes the default.
#[derive(Debug, Clone)]
pub struct AudioInjectArgs<'a> {
    pub input: &'a Path,
    pub audio: &'a [PathBuf],
    /// Audio streams already present in `input`.
    pub existing: usize,
    pub output: &'a Path,
    pub container: Container,
}

impl AudioInjectArgs<'_> {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = preamble();
        args.push("-i".into());
        args.push(path_arg(self.input));
        for track in self.audio {
            args.push("-i".into());
            args.push(path_arg(track));
        }

        push(&mut args, &["-map", "0:v:0", "-map", "0:s:?"]);
        for i in 0..self.existing {
            args.push("-map".into());
            args.push(format!("0:a:{i}"));
            args.push(format!("-disposition:a:{i}"));
            args.push("0".into());
        }

        for i in 0..self.audio.len() {
            let stream = self.existing + i;
            args.push("-map".into());
            args.push(format!("{}:a", i + 1));
            args.push(format!("-metadata:s:a:{stream}"));
            args.push(track_title(stream));
        }

        if self.existing == 0 && !self.audio.is_empty() {
            push(&mut args, &["-disposition:a:0", "default"]);
        }

        push(&mut args, &["-c:v", "copy", "-c:a", "copy", "-c:s", "copy"]);
        finish(&mut args, self.container, self.output);
        args
    }
}

/// `title=Track N` for the zero-based output stream `index`.
fn track_title(index: usize) -> String {
    format!("title=Track {}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Value following `flag`, if present.
    fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    fn maps(args: &[String]) -> Vec<&str> {
        args.windows(2)
            .filter(|w| w[0] == "-map")
            .map(|w| w[1].as_str())
            .collect()
    }

    fn target(width: u32, height: u32) -> TargetParams {
        TargetParams {
            width,
            height,
            fps: 30.0,
            pixel_format: "yuv420p".into(),
            sample_rate: 48000,
            audio_channels: 2,
        }
    }

    #[test]
    fn remux_maps_everything_and_copies() {
        let args = RemuxArgs {
            input: Path::new("/in/a.mp4"),
            output: Path::new("/work/remux_0.mkv"),
            container: Container::Mkv,
        }
        .to_args();

        assert_eq!(value_of(&args, "-i"), Some("/in/a.mp4"));
        assert_eq!(maps(&args), vec!["0"]);
        assert_eq!(value_of(&args, "-c"), Some("copy"));
        assert_eq!(value_of(&args, "-f"), Some("matroska"));
        assert_eq!(value_of(&args, "-progress"), Some("pipe:2"));
        assert_eq!(args.last().map(String::as_str), Some("/work/remux_0.mkv"));
    }

    #[test]
    fn concat_uses_demuxer() {
        let args = ConcatArgs {
            list_file: Path::new("/work/list.txt"),
            output: Path::new("/out/merged.mkv"),
            container: Container::Mkv,
        }
        .to_args();

        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i /work/list.txt"), "{joined}");
        assert!(joined.contains("-map 0 -c copy -f matroska"), "{joined}");
        assert_eq!(args.last().map(String::as_str), Some("/out/merged.mkv"));
    }

    #[test]
    fn concat_list_escaping() {
        assert_eq!(concat_list_entry(Path::new("/a/b.mkv")), "file '/a/b.mkv'");
        assert_eq!(
            concat_list_entry(Path::new("/a/don't stop.mkv")),
            "file '/a/don'\\''t stop.mkv'"
        );
    }

    #[test]
    fn standardize_filter_chain() {
        let t = target(1280, 720);
        let enc = StandardizeSettings::default();
        let builder = StandardizeArgs {
            input: Path::new("in.mp4"),
            output: Path::new("std_0.mkv"),
            target: &t,
            encoder: &enc,
            has_audio: true,
            container: Container::Mkv,
        };
        assert_eq!(
            builder.video_filter(),
            "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,fps=30,format=yuv420p"
        );

        let args = builder.to_args();
        assert_eq!(value_of(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_of(&args, "-preset"), Some("fast"));
        assert_eq!(value_of(&args, "-crf"), Some("23"));
        assert_eq!(value_of(&args, "-c:a"), Some("aac"));
        assert_eq!(value_of(&args, "-ar"), Some("48000"));
        assert_eq!(value_of(&args, "-ac"), Some("2"));
        assert_eq!(value_of(&args, "-b:a"), Some("128k"));
        assert_eq!(maps(&args), vec!["0:v:0", "0:a:0"]);
        assert!(!args.iter().any(|a| a.contains(":s")));
    }

    #[test]
    fn standardize_without_audio_adds_silence() {
        let t = target(640, 360);
        let enc = StandardizeSettings::default();
        let args = StandardizeArgs {
            input: Path::new("silent.mp4"),
            output: Path::new("std_1.mkv"),
            target: &t,
            encoder: &enc,
            has_audio: false,
            container: Container::Mkv,
        }
        .to_args();

        assert!(args.iter().any(|a| a == "anullsrc=channel_layout=stereo:sample_rate=48000"));
        assert_eq!(maps(&args), vec!["0:v:0", "1:a:0"]);
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn subtitle_titles_continue_numbering() {
        let subs = vec![PathBuf::from("en.srt"), PathBuf::from("fr.ass")];
        let args = SubtitleInjectArgs {
            input: Path::new("merged.mkv"),
            subtitles: &subs,
            existing: 2,
            output: Path::new("tmp.mkv"),
            container: Container::Mkv,
        }
        .to_args();

        assert_eq!(maps(&args), vec!["0:v:0", "0:a:?", "0:s:?", "1:s", "2:s"]);
        assert_eq!(value_of(&args, "-metadata:s:s:2"), Some("title=Track 3"));
        assert_eq!(value_of(&args, "-metadata:s:s:3"), Some("title=Track 4"));
        assert_eq!(value_of(&args, "-c:v"), Some("copy"));
        assert_eq!(value_of(&args, "-c:a"), Some("copy"));
        assert_eq!(value_of(&args, "-c:s"), Some("srt"));
    }

    #[test]
    fn subtitle_on_file_without_subtitles() {
        let subs = vec![PathBuf::from("en.srt")];
        let args = SubtitleInjectArgs {
            input: Path::new("merged.mkv"),
            subtitles: &subs,
            existing: 0,
            output: Path::new("tmp.mkv"),
            container: Container::Mkv,
        }
        .to_args();
        assert_eq!(value_of(&args, "-metadata:s:s:0"), Some("title=Track 1"));
    }

    #[test]
    fn audio_clears_existing_defaults() {
        let tracks = vec![PathBuf::from("dub.m4a")];
        let args = AudioInjectArgs {
            input: Path::new("merged.mkv"),
            audio: &tracks,
            existing: 2,
            output: Path::new("tmp.mkv"),
            container: Container::Mkv,
        }
        .to_args();

        assert_eq!(maps(&args), vec!["0:v:0", "0:s:?", "0:a:0", "0:a:1", "1:a"]);
        assert_eq!(value_of(&args, "-disposition:a:0"), Some("0"));
        assert_eq!(value_of(&args, "-disposition:a:1"), Some("0"));
        assert_eq!(value_of(&args, "-metadata:s:a:2"), Some("title=Track 3"));
        assert!(!args.iter().any(|a| a == "default"));
        assert_eq!(value_of(&args, "-c:s"), Some("copy"));
    }

    #[test]
    fn audio_first_new_track_default_without_existing() {
        let tracks = vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")];
        let args = AudioInjectArgs {
            input: Path::new("merged.mkv"),
            audio: &tracks,
            existing: 0,
            output: Path::new("tmp.mkv"),
            container: Container::Mkv,
        }
        .to_args();

        assert_eq!(maps(&args), vec!["0:v:0", "0:s:?", "1:a", "2:a"]);
        assert_eq!(value_of(&args, "-metadata:s:a:0"), Some("title=Track 1"));
        assert_eq!(value_of(&args, "-metadata:s:a:1"), Some("title=Track 2"));
        assert_eq!(value_of(&args, "-disposition:a:0"), Some("default"));
    }
}
