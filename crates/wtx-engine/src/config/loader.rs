use super::schema::ExplorationSettings;
use crate::registry::RegistryError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wtx_common::CommonError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("No start URL configured")]
    MissingUrl,
    #[error("Invalid start URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("Invalid selector: {0}")]
    InvalidSelector(#[from] CommonError),
    #[error("Unknown selector key '{0}'")]
    UnknownSelector(String),
    #[error(transparent)]
    UnknownProfile(#[from] RegistryError),
    #[error("Partition {number} out of range for {count} partitions")]
    InvalidPartition { number: usize, count: usize },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./wtx.yaml
    /// 2. ~/.wtx/config.yaml
    /// 3. Default settings
    pub async fn load_default() -> Result<ExplorationSettings, ConfigError> {
        let local_config = PathBuf::from("./wtx.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".wtx").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(ExplorationSettings::default())
    }

    pub async fn load_from(path: &Path) -> Result<ExplorationSettings, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ExplorationSettings, ConfigError> {
        if content.trim().is_empty() {
            return Ok(ExplorationSettings::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
