//! Human-readable status updates for a running merge.
//!
//! A [`StatusSink`] is whatever displays status text to the user (a terminal,
//! a chat message being edited). Each job gets its own [`StatusReporter`]
//! carrying the throttle state for that target, so no status state is shared
//! between jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Receiver of status text for one job.
///
/// Implementations own delivery: errors, retries and rate-limit backoff are
/// handled inside `update` and never reported back to the merge engine.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, text: &str);
}

/// Sink that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn update(&self, _text: &str) {}
}

/// Rate limiter allowing one event per interval.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` (and records `now`) when an event may fire at `now`.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Per-job handle for sending status text.
///
/// Cloning is cheap and clones share the same throttle.
#[derive(Clone)]
pub struct StatusReporter {
    sink: Arc<dyn StatusSink>,
    throttle: Arc<Mutex<Throttle>>,
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn StatusSink>, interval: Duration) -> Self {
        Self {
            sink,
            throttle: Arc::new(Mutex::new(Throttle::new(interval))),
        }
    }

    /// Reporter that drops every message.
    pub fn silent() -> Self {
        Self::new(Arc::new(NullSink), Duration::from_secs(2))
    }

    /// Send a stage boundary message. Never throttled.
    pub async fn stage(&self, text: impl AsRef<str>) {
        self.sink.update(text.as_ref()).await;
    }

    /// Send a progress message if the throttle window has passed.
    ///
    /// `render` is only called when the message will actually be sent.
    /// Returns whether a message was sent.
    pub async fn progress(&self, render: impl FnOnce() -> String) -> bool {
        let due = self.throttle.lock().ready();
        if due {
            self.sink.update(&render()).await;
        }
        due
    }
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("throttle", &*self.throttle.lock())
            .finish_non_exhaustive()
    }
}

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Render a fraction in `[0, 1]` as a bar of `width` cells.
///
/// ```
/// use mergeforged_av::status::progress_bar;
///
/// assert_eq!(progress_bar(0.5, 4), "██░░");
/// ```
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((width as f64) * fraction.clamp(0.0, 1.0)) as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Render seconds as `1d 2h 3m 4s`, omitting zero units.
///
/// ```
/// use mergeforged_av::status::readable_time;
///
/// assert_eq!(readable_time(3725), "1h 2m 5s");
/// assert_eq!(readable_time(0), "0s");
/// ```
pub fn readable_time(seconds: u64) -> String {
    const PERIODS: &[(&str, u64)] = &[("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

    let mut remaining = seconds;
    let mut parts = Vec::new();
    for &(name, len) in PERIODS {
        if remaining >= len {
            parts.push(format!("{}{}", remaining / len, name));
            remaining %= len;
        }
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Render a byte count with binary units and two decimals.
///
/// ```
/// use mergeforged_av::status::readable_size;
///
/// assert_eq!(readable_size(512), "512B");
/// assert_eq!(readable_size(1536), "1.50KB");
/// ```
pub fn readable_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut index = 0;
    while size >= 1024.0 && index < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        index += 1;
    }

    if index == 0 {
        format!("{bytes}B")
    } else {
        format!("{size:.2}{}", SIZE_UNITS[index])
    }
}
