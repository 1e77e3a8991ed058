use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PROTEGO").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        storage_path: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if timeout_secs.is_some() {
            self.timeout_secs = timeout_secs;
        }
        if storage_path.is_some() {
            self.storage_path = storage_path;
        }
        self
    }

    pub fn storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage_path {
            return path.clone();
        }

        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("protego").join("storage.json")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".protego").join("storage.json")
        } else {
            PathBuf::from(".protego").join("storage.json")
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            storage_path: None,
        }
    }
}
