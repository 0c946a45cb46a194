//! Progress extraction from a running ffmpeg process.
//!
//! ffmpeg reports how much media it has written as `time=HH:MM:SS.ff` on its
//! diagnostic stream (and as `out_time=` when `-progress pipe:2` is given).
//! A [`ProgressTracker`] reads those lines while the process runs, turns them
//! into [`ProgressSnapshot`]s and forwards throttled status text.

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::status::{progress_bar, readable_time, StatusReporter};

static TIME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("time token pattern is valid")
});

/// `key=value` lines emitted by `-progress`; they carry no diagnostics.
static PROGRESS_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_]+=\S*$").expect("progress key pattern is valid")
});

/// Number of diagnostic lines kept for error reports.
const TAIL_LINES: usize = 30;

/// Below this fraction no ETA is estimated.
const ETA_MIN_FRACTION: f64 = 0.01;

/// Extract the elapsed media time in seconds from a diagnostic line.
///
/// ```
/// use mergeforged_av::progress::parse_time_token;
///
/// let line = "frame=  100 fps= 30 q=28.0 size=1024kB time=00:01:30.50 bitrate=838.9kbits/s";
/// assert_eq!(parse_time_token(line), Some(90.5));
/// assert_eq!(parse_time_token("time=N/A"), None);
/// ```
pub fn parse_time_token(line: &str) -> Option<f64> {
    let caps = TIME_TOKEN.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// One computed progress point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed_media_secs: f64,
    pub total_media_secs: f64,
    /// Always within `[0, 1]`.
    pub fraction: f64,
    pub wall_elapsed: Duration,
    /// `None` while too little progress has been made to estimate.
    pub eta_secs: Option<f64>,
}

/// The last lines of a tool's diagnostic output.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
}

impl DiagnosticTail {
    pub fn from_text(text: &str) -> Self {
        let mut tail = Self::default();
        for line in text.lines() {
            tail.push(line);
        }
        tail
    }

    /// Keep `line` unless it is blank or a `-progress` key/value pair.
    pub fn push(&mut self, line: &str) {
        let line = line.trim_end();
        if line.trim().is_empty() || PROGRESS_KEY.is_match(line) {
            return;
        }
        if self.lines.len() == TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Read one `\n`-terminated line, decoding invalid UTF-8 lossily.
///
/// Bytes accumulate in `buf` until the newline arrives, so a read dropped
/// mid-line (by a timeout or `select!`) resumes where it stopped when called
/// again with the same buffer. Returns `None` at end of stream.
pub async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}

/// Result of a tracker run, handing the reader back to the caller.
#[derive(Debug)]
pub struct TrackerOutput<R> {
    pub reader: R,
    /// Bytes of a line that was still incomplete when the tracker stopped.
    pub partial: Vec<u8>,
    pub tail: DiagnosticTail,
    pub last: Option<ProgressSnapshot>,
}

/// Follows one process's diagnostic stream.
#[derive(Debug)]
pub struct ProgressTracker {
    label: String,
    total_secs: f64,
    started: Instant,
    max_elapsed: f64,
    read_timeout: Duration,
    reporter: StatusReporter,
}

impl ProgressTracker {
    /// Track a process expected to write `total_secs` of media.
    pub fn new(
        label: impl Into<String>,
        total_secs: f64,
        reporter: StatusReporter,
        read_timeout: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            total_secs,
            started: Instant::now(),
            max_elapsed: 0.0,
            read_timeout,
            reporter,
        }
    }

    /// Feed one line; returns a snapshot when it carried a time token and the
    /// total duration is known.
    pub fn observe(&mut self, line: &str) -> Option<ProgressSnapshot> {
        self.observe_at(line, Instant::now())
    }

    fn observe_at(&mut self, line: &str, now: Instant) -> Option<ProgressSnapshot> {
        let elapsed = parse_time_token(line)?;
        if self.total_secs.is_nan() || self.total_secs <= 0.0 {
            return None;
        }

        self.max_elapsed = self.max_elapsed.max(elapsed);
        let fraction = (self.max_elapsed / self.total_secs).clamp(0.0, 1.0);
        let wall_elapsed = now.saturating_duration_since(self.started);
        let wall = wall_elapsed.as_secs_f64();
        let eta_secs = (fraction > ETA_MIN_FRACTION).then(|| wall / fraction - wall);

        Some(ProgressSnapshot {
            elapsed_media_secs: self.max_elapsed,
            total_media_secs: self.total_secs,
            fraction,
            wall_elapsed,
            eta_secs,
        })
    }

    fn render(&self, snap: &ProgressSnapshot) -> String {
        let eta = snap
            .eta_secs
            .map(|s| readable_time(s.max(0.0) as u64))
            .unwrap_or_else(|| "calculating".to_string());
        format!(
            "{}\n{} {:.1}%\nProcessed: {} of {}\nElapsed: {}\nETA: {}",
            self.label,
            progress_bar(snap.fraction, 20),
            snap.fraction * 100.0,
            readable_time(snap.elapsed_media_secs as u64),
            readable_time(snap.total_media_secs as u64),
            readable_time(snap.wall_elapsed.as_secs()),
            eta,
        )
    }

    /// Poll `reader` line by line until the stream closes or `stop` fires.
    ///
    /// A read that exceeds the read timeout is retried, not treated as the
    /// end of the stream. Lines that are not valid UTF-8 are decoded lossily;
    /// the pipe keeps being drained so the writer never blocks on it.
    pub async fn run<R>(mut self, mut reader: R, stop: CancellationToken) -> TrackerOutput<R>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut tail = DiagnosticTail::default();
        let mut last = None;
        let mut partial = Vec::new();

        loop {
            let read = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                read = tokio::time::timeout(
                    self.read_timeout,
                    next_line_lossy(&mut reader, &mut partial),
                ) => read,
            };

            match read {
                Err(_elapsed) => continue,
                Ok(Ok(Some(line))) => {
                    tail.push(&line);
                    if let Some(snap) = self.observe(&line) {
                        self.reporter.progress(|| self.render(&snap)).await;
                        last = Some(snap);
                    }
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    tracing::debug!("Stopped reading diagnostics for {}: {}", self.label, e);
                    break;
                }
            }
        }

        TrackerOutput {
            reader,
            partial,
            tail,
            last,
        }
    }
}
