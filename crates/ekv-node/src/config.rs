//! # Node Configuration
//!
//! Defaults overridden by `EKV_*` environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `EKV_DATA_DIR` | `data_dir` |
//! | `EKV_NUM_BLOCKS` | `num_blocks` |
//! | `EKV_BLOCK_CAPACITY` | `block.capacity_bytes` |
//! | `EKV_HOST` | `host` |
//! | `EKV_PORT` | `port` |
//! | `EKV_LOG_LEVEL` | `log_level` |

use std::path::PathBuf;

use ekv_01_storage_block::BlockConfig;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Configuration shared by every hosted block.
    pub block: BlockConfig,
    /// Root directory served as `local://` backing paths.
    pub data_dir: PathBuf,
    /// Host part of hosted block names.
    pub host: String,
    /// Port part of hosted block names.
    pub port: u16,
    /// Number of physical blocks hosted by this node.
    pub num_blocks: usize,
    /// Default tracing filter directive.
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            block: BlockConfig::default(),
            data_dir: PathBuf::from("./data"),
            host: "127.0.0.1".to_string(),
            port: 9090,
            num_blocks: 64,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("num_blocks must be at least 1")]
    NoBlocks,

    #[error("block capacity must be non-zero")]
    ZeroCapacity,

    #[error("high threshold {0} is outside (0, 1]")]
    InvalidThreshold(f64),
}

impl NodeConfig {
    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if self.block.capacity_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let threshold = self.block.high_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }

    /// Name of the `index`-th hosted block.
    pub fn block_name(&self, index: usize) -> String {
        format!("{}:{}:{}", self.host, self.port, index)
    }

    /// Names of all hosted blocks.
    pub fn block_names(&self) -> Vec<String> {
        (0..self.num_blocks).map(|i| self.block_name(i)).collect()
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    load_config_from(|var| std::env::var(var).ok())
}

/// Load configuration, reading variables through `lookup`.
pub fn load_config_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<NodeConfig, ConfigError> {
    let mut config = NodeConfig::default();

    if let Some(dir) = lookup("EKV_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(value) = lookup("EKV_NUM_BLOCKS") {
        config.num_blocks = parse("EKV_NUM_BLOCKS", value)?;
    }
    if let Some(value) = lookup("EKV_BLOCK_CAPACITY") {
        config.block.capacity_bytes = parse("EKV_BLOCK_CAPACITY", value)?;
    }
    if let Some(host) = lookup("EKV_HOST") {
        config.host = host;
    }
    if let Some(value) = lookup("EKV_PORT") {
        config.port = parse("EKV_PORT", value)?;
    }
    if let Some(level) = lookup("EKV_LOG_LEVEL") {
        config.log_level = level;
    }

    Ok(config)
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
