//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` when completed
//! - Logs `{name}_INCOMPLETE` if dropped without completing

use std::time::Instant;

use tracing::{error, info, warn};

/// A scope that logs the start and end of a long operation
///
/// ```ignore
/// let scope = ObservationScope::new("DUMP");
/// // ... do work ...
/// scope.complete("done"); // logs DUMP_COMPLETE
/// ```
pub struct ObservationScope {
    name: &'static str,
    started: Instant,
    completed: bool,
}

impl ObservationScope {
    /// Create a new observation scope, logging `{name}_BEGIN`
    pub fn new(name: &'static str) -> Self {
        info!(event = %format!("{}_BEGIN", name));
        Self {
            name,
            started: Instant::now(),
            completed: false,
        }
    }

    /// Milliseconds since the scope began
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Mark the scope as successfully completed
    pub fn complete(mut self, summary: &str) {
        self.completed = true;
        info!(
            event = %format!("{}_COMPLETE", self.name),
            elapsed_ms = self.elapsed_ms() as u64,
            "{}",
            summary
        );
    }

    /// Mark the scope as failed
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        error!(
            event = %format!("{}_FAILED", self.name),
            elapsed_ms = self.elapsed_ms() as u64,
            reason = %reason
        );
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                event = %format!("{}_INCOMPLETE", self.name),
                reason = "scope dropped without completion"
            );
        }
    }
}
