//! Dump configuration

use serde::{Deserialize, Serialize};

use super::errors::{DumpError, DumpResult};

/// Bytes per megabyte for `--size`
pub const MB: u64 = 1024 * 1024;

/// Settings for one dump run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Destination: directory, `scheme://host/path` or `-`
    #[serde(default = "default_target")]
    pub target: String,

    /// Only this collection; all collections when absent
    #[serde(default)]
    pub collection: Option<String>,

    /// Number of concurrent chunk writers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Payload bytes per chunk before moving on to the next
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    #[serde(default = "default_true")]
    pub compression: bool,

    /// Show a live object count
    #[serde(default = "default_true")]
    pub progress: bool,
}

fn default_target() -> String {
    "https://mongotool.s3.amazonaws.com/dump".to_string()
}
fn default_concurrency() -> usize {
    1
}
fn default_chunk_size() -> u64 {
    1000 * MB
} // 1000MB
fn default_true() -> bool {
    true
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            collection: None,
            concurrency: default_concurrency(),
            chunk_size: default_chunk_size(),
            compression: true,
            progress: true,
        }
    }
}

impl DumpConfig {
    pub fn validate(&self) -> DumpResult<()> {
        if self.concurrency == 0 {
            return Err(DumpError::config("concurrency must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(DumpError::config("chunk_size must be at least 1 byte"));
        }
        if self.target.trim().is_empty() {
            return Err(DumpError::config("target must not be empty"));
        }
        if matches!(self.collection.as_deref(), Some("")) {
            return Err(DumpError::config("collection must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DumpConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.chunk_size, 1000 * MB);
        assert!(config.compression);
        assert!(config.progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_fills_defaults() {
        let config: DumpConfig = serde_json::from_str(r#"{"target": "/tmp/out", "concurrency": 4}"#).unwrap();
        assert_eq!(config.target, "/tmp/out");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.chunk_size, 1000 * MB);
        assert_eq!(config.collection, None);
    }

    #[test]
    fn test_validation() {
        let mut config = DumpConfig::default();
        config.concurrency = 0;
        assert!(config.validate().unwrap_err().is_fatal());

        let mut config = DumpConfig::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = DumpConfig::default();
        config.target = " ".into();
        assert!(config.validate().is_err());

        let mut config = DumpConfig::default();
        config.collection = Some(String::new());
        assert!(config.validate().is_err());
    }
}
