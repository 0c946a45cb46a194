//! Status sink printing to the terminal.

use async_trait::async_trait;
use mergeforged_av::StatusSink;

/// Prints every status update to stdout, prefixed with the local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalStatus;

#[async_trait]
impl StatusSink for TerminalStatus {
    async fn update(&self, text: &str) {
        let now = chrono::Local::now().format("%H:%M:%S");
        let mut lines = text.lines();
        if let Some(first) = lines.next() {
            println!("[{now}] {first}");
        }
        for line in lines {
            println!("           {line}");
        }
    }
}
