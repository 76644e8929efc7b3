use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weatherapi.com";
pub const DEFAULT_AIR_QUALITY_BASE_URL: &str = "https://air-quality-api.open-meteo.com";

pub const ENV_WEATHER_API_KEY: &str = "HAZARD_WEATHER_API_KEY";
pub const ENV_PREDICTION_URL: &str = "HAZARD_PREDICTION_URL";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// weather_api_key = "..."
/// prediction_base_url = "http://localhost:5000"
/// request_timeout_secs = 15
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub weather_api_key: Option<String>,

    pub weather_base_url: Option<String>,

    pub air_quality_base_url: Option<String>,

    /// Base URL of the prediction service; `/api/predict/{kind}` is appended.
    pub prediction_base_url: Option<String>,

    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather_api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn weather_base_url(&self) -> &str {
        self.weather_base_url.as_deref().unwrap_or(DEFAULT_WEATHER_BASE_URL)
    }

    pub fn air_quality_base_url(&self) -> &str {
        self.air_quality_base_url.as_deref().unwrap_or(DEFAULT_AIR_QUALITY_BASE_URL)
    }

    pub fn prediction_base_url(&self) -> Result<&str> {
        self.prediction_base_url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
            anyhow!(
                "No prediction service configured.\n\
                 Hint: run `hazard configure` or set {ENV_PREDICTION_URL}."
            )
        })
    }

    /// Overlay values from the environment onto the file configuration.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_WEATHER_API_KEY) {
            self.weather_api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_PREDICTION_URL) {
            self.prediction_base_url = Some(url);
        }
        self
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// [`Config::load`] followed by environment overrides.
    pub fn load_with_env() -> Result<Self> {
        Ok(Self::load()?.with_env_overrides(|name| std::env::var(name).ok()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "hazard", "hazard-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
