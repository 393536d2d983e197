//! Observability subsystem for docarchive
//!
//! - Structured logging via `tracing` (text or JSON, stderr)
//! - Typed lifecycle events carried in an `event` field
//! - Begin/complete scopes for long operations
//! - An optional live object counter
//!
//! # Usage
//!
//! ```ignore
//! use docarchive::observability::{init_logging, Event, ObservationScope};
//!
//! init_logging(false);
//! tracing::info!(event = %Event::ChunkCommitted, path = "dump/dump.0f3a");
//!
//! let scope = ObservationScope::new("DUMP");
//! // ... do work ...
//! scope.complete("3 documents");
//! ```

mod events;
mod progress;
mod scope;

pub use events::Event;
pub use progress::Progress;
pub use scope::ObservationScope;

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber writing to stderr
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Calling this
/// twice is harmless; the second installation is ignored.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
