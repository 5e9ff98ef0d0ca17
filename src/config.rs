use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::Result;

/// Reward minted by every coinbase transaction.
pub const COINBASE_REWARD: u64 = 100;

/// Memo embedded in the genesis coinbase when the caller supplies none.
pub const GENESIS_MEMO: &str = "First transaction from genesis";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Leading zero bits a block hash must carry.
    pub pow_difficulty: u32,
}

impl Default for Config {
    fn default() -> Self {
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_dir = PathBuf::from(home_dir).join(".emberchain");

        Self {
            storage: StorageConfig { data_dir },
            mining: MiningConfig { pow_difficulty: 16 },
        }
    }
}

impl Config {
    /// Config rooted at an explicit data directory, keeping the default
    /// mining parameters. Handy for tests and embedders.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: data_dir.into(),
            },
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir).join(".emberchain").join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.data_dir.ends_with(".emberchain"));
        assert_eq!(config.mining.pow_difficulty, 16);
    }

    #[test]
    fn test_with_data_dir() {
        let config = Config::with_data_dir("/tmp/ember-test");

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/ember-test"));
        assert_eq!(config.mining.pow_difficulty, 16);
    }
}
