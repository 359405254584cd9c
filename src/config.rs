use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Loads the config file, falling back to defaults when it is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Backend base URL. The `BANKCHAT_BASE_URL` env var wins over the file.
    pub fn base_url(&self) -> String {
        std::env::var("BANKCHAT_BASE_URL")
            .ok()
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.json"))
    }

    /// Directory holding the config file and the log file.
    pub fn data_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("bankchat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.timeout_secs(), DEFAULT_TIMEOUT_SECS);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn round_trips_through_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: Some("http://10.0.0.2:8000".to_string()),
            timeout_secs: Some(10),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.base_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(loaded.timeout_secs(), 10);
    }
}
