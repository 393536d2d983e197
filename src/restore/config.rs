//! Restore configuration

use serde::{Deserialize, Serialize};

use super::errors::{RestoreError, RestoreResult};

/// Settings for one restore run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Archive root: directory, `scheme://host/path` or `-`
    #[serde(default = "default_source")]
    pub source: String,

    /// Whether the dump was written with compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Show a live object count
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Apply recorded indexes after loading documents
    #[serde(default = "default_true")]
    pub indexes: bool,

    /// Accept a remote listing cut to its first page
    #[serde(default)]
    pub allow_truncated_listing: bool,
}

fn default_source() -> String {
    "https://mongotool.s3.amazonaws.com/dump".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            compression: true,
            progress: true,
            indexes: true,
            allow_truncated_listing: false,
        }
    }
}

impl RestoreConfig {
    pub fn validate(&self) -> RestoreResult<()> {
        if self.source.trim().is_empty() {
            return Err(RestoreError::failed("source must not be empty"));
        }
        Ok(())
    }
}
