//! Configuration management for Spoolchain

use crate::error::{ChainError, Result};
use rand::Rng;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub spool: SpoolConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    #[serde(default = "default_spool_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_poll_interval", deserialize_with = "human_duration")]
    pub poll_interval: Duration,
    #[serde(default = "default_cleanup_delay", deserialize_with = "human_duration")]
    pub cleanup_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_reward")]
    pub reward: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_idle_interval", deserialize_with = "human_duration")]
    pub idle_interval: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub lenient_tip: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub one_reward_per_block: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_status_interval", deserialize_with = "human_duration")]
    pub interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
        }
    }
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: default_spool_dir(),
            poll_interval: default_poll_interval(),
            cleanup_delay: default_cleanup_delay(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            batch_size: default_batch_size(),
            idle_interval: default_idle_interval(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            interval: default_status_interval(),
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.name.trim().is_empty() {
            return Err(ChainError::Config("node.name must not be empty".into()));
        }
        if self.node.name.contains('>') || self.node.name.contains('\n') {
            return Err(ChainError::Config(
                "node.name must not contain '>' or newlines".into(),
            ));
        }
        // A sha256 hex digest has 64 digits.
        if self.mining.difficulty == 0 || self.mining.difficulty > 64 {
            return Err(ChainError::Config(format!(
                "mining.difficulty must be within 1..=64, got {}",
                self.mining.difficulty
            )));
        }
        if self.mining.batch_size == 0 {
            return Err(ChainError::Config("mining.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    match fs::read_to_string(path) {
        Ok(raw) => Config::from_toml(&raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(ChainError::Config(format!(
            "failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn human_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn default_node_name() -> String {
    rand::thread_rng().gen_range(1..=1000u32).to_string()
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("/var/spool/blockchain")
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_cleanup_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_difficulty() -> usize {
    5
}

fn default_reward() -> u64 {
    10
}

fn default_batch_size() -> usize {
    1024
}

fn default_idle_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_status_interval() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.mining.difficulty, 5);
        assert_eq!(config.mining.reward, 10);
        assert_eq!(config.spool.dir, PathBuf::from("/var/spool/blockchain"));
        assert_eq!(config.spool.cleanup_delay, Duration::from_secs(1));
        assert!(!config.validation.lenient_tip);
        assert!(!config.ledger.one_reward_per_block);

        let name: u32 = config.node.name.parse().unwrap();
        assert!((1..=1000).contains(&name));
    }

    #[test]
    fn test_overrides_and_durations() {
        let raw = r#"
            [node]
            name = "alice"

            [spool]
            dir = "/tmp/spool"
            poll_interval = "50ms"

            [mining]
            difficulty = 3
            batch_size = 16

            [validation]
            lenient_tip = true
        "#;
        let config = Config::from_toml(raw).unwrap();
        assert_eq!(config.node.name, "alice");
        assert_eq!(config.spool.poll_interval, Duration::from_millis(50));
        assert_eq!(config.mining.difficulty, 3);
        assert_eq!(config.mining.batch_size, 16);
        assert!(config.validation.lenient_tip);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml("[mining]\ndifficulty = 0").is_err());
        assert!(Config::from_toml("[mining]\ndifficulty = 65").is_err());
        assert!(Config::from_toml("[mining]\nbatch_size = 0").is_err());
        assert!(Config::from_toml("[node]\nname = \"a>b\"").is_err());
        assert!(Config::from_toml("[spool]\npoll_interval = \"soon\"").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = load_config(Path::new("/definitely/not/here/config.toml")).unwrap();
        assert_eq!(config.mining.batch_size, 1024);
    }
}
