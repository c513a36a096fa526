//! Configuration Loader
//!
//! Layers the gateway configuration from built-in defaults, a JSON file and
//! environment overrides.

use crate::config::gateway::GatewayConfig;
use crate::error::{GatewayError, Result};
use std::path::{Path, PathBuf};

/// Points at a config file to load instead of the default locations
pub const CONFIG_PATH_ENV: &str = "LLM_GATEWAY_CONFIG";

/// Overrides `listen`
pub const LISTEN_ENV: &str = "LLM_GATEWAY_LISTEN";

/// Overrides `cheap.url`
pub const CHEAP_URL_ENV: &str = "LLM_GATEWAY_CHEAP_URL";

/// Overrides `expensive.url`
pub const EXPENSIVE_URL_ENV: &str = "LLM_GATEWAY_EXPENSIVE_URL";

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: GatewayConfig,
    source: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader and apply the first config file found in the default locations
    pub fn new() -> Result<Self> {
        let mut loader = Self::defaults();

        if let Some(path) = Self::get_config_paths().into_iter().find(|p| p.exists()) {
            loader.load_from_file(path)?;
        }

        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::defaults();
        loader.load_from_file(path)?;
        Ok(loader)
    }

    /// Built-in defaults only
    pub fn defaults() -> Self {
        Self {
            config: GatewayConfig::default(),
            source: None,
        }
    }

    /// Get list of config paths to check, in priority order
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("tiergate.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tiergate").join("config.json"));
        }

        paths
    }

    /// Replace the configuration with the contents of a file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.config = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        self.source = Some(path.to_path_buf());

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(listen) = lookup(LISTEN_ENV) {
            self.config.listen = listen;
        }
        if let Some(url) = lookup(CHEAP_URL_ENV) {
            self.config.cheap.url = url;
        }
        if let Some(url) = lookup(EXPENSIVE_URL_ENV) {
            self.config.expensive.url = url;
        }

        let api_key = lookup(&self.config.api_key_env);
        self.config = self.config.with_default_api_key(api_key);
        self
    }

    /// Override the listen address (e.g. from the command line)
    pub fn with_listen(mut self, listen: Option<String>) -> Self {
        if let Some(listen) = listen {
            self.config.listen = listen;
        }
        self
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Validate and take ownership of the configuration
    pub fn into_config(self) -> Result<GatewayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::defaults()
    }
}
