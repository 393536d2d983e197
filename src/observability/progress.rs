//! Live object counter on stderr

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner showing `Objects: N`
///
/// A disabled counter is hidden and every call is a no-op.
#[derive(Debug, Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a counter, visible only when `enabled`
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("Objects: 0");
        Self { bar }
    }

    /// A counter that never draws
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Show the current count
    pub fn set(&self, objects: u64) {
        self.bar.set_position(objects);
        self.bar.set_message(format!("Objects: {}", objects));
    }

    /// Last count shown
    pub fn count(&self) -> u64 {
        self.bar.position()
    }

    /// Stop the spinner, leaving the final count on screen
    pub fn finish(&self) {
        let msg = format!("Objects: {}", self.bar.position());
        self.bar.finish_with_message(msg);
    }
}
