use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

/// Credentials for a single provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Model name (Gemini) or model id (Roboflow).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint URL (market data API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ProviderConfig {
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration: a TOML file on disk overlaid by the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Load `.env`, the config file (if any) and then environment variables.
    pub fn load() -> Result<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let mut cfg = Self::load_file()?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Load the config file only, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Overlay values looked up by environment variable name.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow!("invalid PORT '{port}': {e}"))?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.server.log_level = level;
        }

        self.overlay(ProviderId::Gemini, var("GEMINI_API_KEY"), |p| {
            if let Some(model) = var("GEMINI_MODEL") {
                p.model = Some(model);
            }
        });
        self.overlay(ProviderId::OpenWeather, var("OPENWEATHER_API_KEY"), |_| {});
        self.overlay(ProviderId::Market, var("MARKET_API_KEY"), |p| {
            if let Some(url) = var("MARKET_API_URL") {
                p.url = Some(url);
            }
        });
        self.overlay(ProviderId::Roboflow, var("ROBOFLOW_API_KEY"), |p| {
            if let Some(model) = var("ROBOFLOW_MODEL") {
                p.model = Some(model);
            }
        });

        Ok(())
    }

    /// Replace the key of `id` when one is given, then let `extra` fill in
    /// the remaining fields of whichever entry exists.
    fn overlay(
        &mut self,
        id: ProviderId,
        api_key: Option<String>,
        extra: impl FnOnce(&mut ProviderConfig),
    ) {
        if let Some(api_key) = api_key {
            match self.providers.get_mut(id.as_str()) {
                Some(existing) => existing.api_key = api_key,
                None => self.upsert_provider(id, ProviderConfig::with_key(api_key)),
            }
        }
        if let Some(entry) = self.providers.get_mut(id.as_str()) {
            extra(entry);
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("in", "krishi-mitra", "krishi")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace the credentials of a provider.
    pub fn upsert_provider(&mut self, provider_id: ProviderId, provider: ProviderConfig) {
        self.providers.insert(provider_id.as_str().to_string(), provider);
    }

    /// Credentials of a provider with a non-empty key, if present.
    pub fn provider_config(&self, provider_id: ProviderId) -> Option<&ProviderConfig> {
        self.providers
            .get(provider_id.as_str())
            .filter(|cfg| !cfg.api_key.trim().is_empty())
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    /// True when everything the provider needs to make calls is present.
    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        let Some(cfg) = self.provider_config(provider_id) else {
            return false;
        };

        match provider_id {
            ProviderId::Gemini | ProviderId::OpenWeather => true,
            ProviderId::Market => cfg.url.is_some(),
            ProviderId::Roboflow => cfg.model.is_some(),
        }
    }
}
