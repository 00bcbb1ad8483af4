//! Configuration for the grant ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Spends strictly above this amount are recorded as `Pending`
    pub approval_threshold: Decimal,

    /// Fail with `IndexCorruption` instead of treating a bad index as empty
    pub strict_indices: bool,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Single-writer task configuration
    pub writer: WriterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/grant-ledger"),
            service_name: "grant-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            approval_threshold: Decimal::new(6000, 0),
            strict_indices: false,
            rocksdb: RocksDBConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Writer task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("GRANT_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(threshold) = std::env::var("GRANT_LEDGER_APPROVAL_THRESHOLD") {
            config.approval_threshold = Decimal::from_str(threshold.trim()).map_err(|e| {
                crate::Error::Config(format!("Invalid approval threshold {:?}: {}", threshold, e))
            })?;
        }

        if let Ok(strict) = std::env::var("GRANT_LEDGER_STRICT_INDICES") {
            config.strict_indices = strict
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid strict_indices {:?}", strict)))?;
        }

        Ok(config)
    }
}
