use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const BASE_URL_ENV: &str = "TEYA_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            log_dir: None,
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Like `load_from`, but an unreadable file falls back to defaults and
    /// the error is handed back for reporting once logging is up.
    pub fn load_or_default(config_path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load_from(config_path) {
            Ok(config) => (config, None),
            Err(e) => (Self::new(), Some(e)),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Backend address: CLI flag, then environment, then file, then default.
    pub fn resolve_base_url(&self, cli: Option<&str>, env: Option<String>) -> String {
        cli.map(str::to_string)
            .or(env)
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn resolve_log_dir(&self, cli: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = cli.or_else(|| self.log_dir.clone()) {
            return Ok(dir);
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("teya").join("logs"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("teya").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://story.local:8080".to_string()),
            log_dir: Some(PathBuf::from("/tmp/teya")),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            base_url: Some("http://file".to_string()),
            log_dir: None,
        };
        assert_eq!(
            config.resolve_base_url(Some("http://cli"), Some("http://env".to_string())),
            "http://cli"
        );
        assert_eq!(
            config.resolve_base_url(None, Some("http://env".to_string())),
            "http://env"
        );
        assert_eq!(config.resolve_base_url(None, None), "http://file");

        let empty = Config { base_url: None, log_dir: None };
        assert_eq!(empty.resolve_base_url(None, None), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_invalid_file_falls_back_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();
        let (config, error) = Config::load_or_default(&path);
        assert_eq!(config, Config::new());
        assert!(error.is_some());

        let (_, error) = Config::load_or_default(&dir.path().join("absent.json"));
        assert!(error.is_none());
    }
}
