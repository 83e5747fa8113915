// Progress reporting. The orchestrator emits events to a `Progress`
// observer; nothing in the control flow depends on what the observer
// does with them.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::error::TaskError;
use crate::model::{TaskHandle, TaskStatus};

/// Prompt text shown per batch item is cut to this many characters.
pub const PROMPT_PREVIEW: usize = 80;

/// Receives lifecycle events. Every method defaults to doing nothing.
pub trait Progress {
    fn item_started(&mut self, _index: usize, _total: usize, _prompt: &str) {}
    fn submitted(&mut self, _handle: &TaskHandle) {}
    fn polled(&mut self, _handle: &TaskHandle, _elapsed: Duration, _status: TaskStatus) {}
    fn succeeded(&mut self, _handle: &TaskHandle, _elapsed: Duration) {}
    fn timed_out(&mut self, _handle: &TaskHandle, _elapsed: Duration) {}
    /// A task-level failure; the batch moves on to the next item.
    fn failed(&mut self, _error: &TaskError) {}
    fn asset_saved(&mut self, _path: &Path) {}
    fn asset_skipped(&mut self, _index: usize, _error: &TaskError) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl Progress for Silent {}

/// Shorten a prompt for progress lines, appending "..." when cut.
pub fn preview(prompt: &str) -> String {
    if prompt.chars().count() > PROMPT_PREVIEW {
        let head: String = prompt.chars().take(PROMPT_PREVIEW).collect();
        format!("{head}...")
    } else {
        prompt.to_string()
    }
}

fn mmss(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m{:02}s", secs / 60, secs % 60)
}

/// Console observer: one line per event plus a spinner while polling.
#[derive(Default)]
pub struct Console {
    spinner: Option<ProgressBar>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(&mut self) -> &ProgressBar {
        self.spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        })
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Progress for Console {
    fn item_started(&mut self, index: usize, total: usize, prompt: &str) {
        println!();
        println!("[{index}/{total}] {}", preview(prompt));
    }

    fn submitted(&mut self, handle: &TaskHandle) {
        info!("task {handle} submitted");
        println!("  Task {handle} submitted");
    }

    fn polled(&mut self, handle: &TaskHandle, elapsed: Duration, status: TaskStatus) {
        let msg = format!("{} ... (status {status})", mmss(elapsed));
        log::debug!("task {handle}: {msg}");
        self.spinner().set_message(msg);
    }

    fn succeeded(&mut self, handle: &TaskHandle, elapsed: Duration) {
        self.clear_spinner();
        info!("task {handle} completed after {}", mmss(elapsed));
        println!("  Completed in {}", mmss(elapsed));
    }

    fn timed_out(&mut self, handle: &TaskHandle, elapsed: Duration) {
        self.clear_spinner();
        warn!("task {handle} timed out after {}", mmss(elapsed));
        println!("  Timeout after {}", mmss(elapsed));
    }

    fn failed(&mut self, error: &TaskError) {
        self.clear_spinner();
        warn!("{error}");
        println!("  {error}");
    }

    fn asset_saved(&mut self, path: &Path) {
        println!("  Saved: {}", path.display());
    }

    fn asset_skipped(&mut self, index: usize, error: &TaskError) {
        warn!("asset #{index} skipped: {error}");
        println!("  Skipped image #{index}: {error}");
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}
