use crate::error::{FarsubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Gemini model used when neither the config file nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Number of subtitle entries sent per translation request.
pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub batch_size: usize,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: 3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| FarsubError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Environment variables take precedence over the config file.
    fn apply_env(&mut self) {
        let key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            self.gemini_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("FARSUB_MODEL") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
        if let Ok(batch_size) = std::env::var("FARSUB_BATCH_SIZE") {
            if let Ok(b) = batch_size.parse() {
                self.batch_size = b;
            }
        }
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key().is_none() {
            return Err(FarsubError::MissingCredential);
        }

        if self.batch_size == 0 {
            return Err(FarsubError::Config(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(FarsubError::Config("Model name must not be empty".to_string()));
        }

        Ok(())
    }

    /// Persist the config, including the API key, to the user's config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file_path().ok_or_else(|| {
            FarsubError::Config("Could not determine the user config directory".to_string())
        })?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| FarsubError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&config_path, toml_content)?;

        Ok(config_path)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("farsub").join("config.toml"))
    }
}
