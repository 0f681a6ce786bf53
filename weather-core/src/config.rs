use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{error::WeatherError, provider::ProviderId};

pub const API_KEY_VAR: &str = "WEATHER_API_KEY";
pub const BASE_URL_VAR: &str = "WEATHER_API_BASE_URL";

/// Cached entries older than this are ignored.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// Cache location and window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one JSON record per city. Platform cache dir when absent.
    pub dir: Option<PathBuf>,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://api.openweathermap.org/data/2.5/weather"
/// provider = "openweather"
///
/// [cache]
/// ttl_secs = 3600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,

    /// Request style, e.g. "openweather" or "apininjas".
    pub provider: Option<String>,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Provider to talk to; OpenWeather unless configured otherwise.
    pub fn provider_id(&self) -> Result<ProviderId> {
        match self.provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::default()),
        }
    }

    pub fn set_provider(&mut self, id: ProviderId) {
        self.provider = Some(id.as_str().to_string());
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn set_base_url(&mut self, base_url: String) {
        self.base_url = Some(base_url);
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Configured cache directory, else the platform cache dir, else `./cache`.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache.dir {
            return dir.clone();
        }

        project_dirs()
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("cache"))
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
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
        let dirs = project_dirs()
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "weather-task", "weather-cli")
}

/// Resolved credentials for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: Url,
}

/// Where the fetcher looks for credentials each time it is called.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    use_env: bool,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl CredentialSource {
    /// Environment variables, falling back to the values in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            use_env: true,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// Fixed values; the environment is never consulted.
    pub fn fixed(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            use_env: false,
            api_key,
            base_url,
        }
    }

    pub fn resolve(&self) -> Result<Credentials, WeatherError> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    pub(crate) fn resolve_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, WeatherError> {
        let pick = |var: &str, stored: &Option<String>| {
            self.use_env
                .then(|| lookup(var))
                .flatten()
                .or_else(|| stored.clone())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = pick(API_KEY_VAR, &self.api_key).ok_or_else(|| {
            WeatherError::ConfigurationMissing(format!("API key ({API_KEY_VAR})"))
        })?;

        let raw_url = pick(BASE_URL_VAR, &self.base_url).ok_or_else(|| {
            WeatherError::ConfigurationMissing(format!("Base URL ({BASE_URL_VAR})"))
        })?;

        let base_url = Url::parse(&raw_url).map_err(|e| {
            WeatherError::ConfigurationMissing(format!(
                "A valid base URL ({BASE_URL_VAR}='{raw_url}': {e})"
            ))
        })?;

        Ok(Credentials { api_key, base_url })
    }
}
