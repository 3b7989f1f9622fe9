use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::config::Config;
use crate::error::{Result, SourceError};

/// Project configuration file name.
pub const CONFIG_FILE: &str = "forgekit.json";

/// Partial configuration as found in a file; unset keys keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forge_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
}

impl RawConfig {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.cache_dir {
            config.cache_dir = v;
        }
        if let Some(v) = self.install_dir {
            config.install_dir = v;
        }
        if let Some(v) = self.vendor_dir {
            config.vendor_dir = v;
        }
        if let Some(v) = self.local {
            config.local = v;
        }
        if let Some(v) = self.vendor {
            config.vendor = v;
        }
        if let Some(v) = self.forge_url {
            config.forge_url = v;
        }
        if let Some(v) = self.http_timeout {
            config.http_timeout = v;
        }
        if let Some(v) = self.http_proxy {
            config.http_proxy = Some(v);
        }
    }
}

/// Builds a [`Config`] from defaults, the project file and the environment.
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Non-empty `FORGEKIT_*` variable, if environment lookup is enabled.
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    fn get_env_bool(&self, var: &str) -> Result<Option<bool>> {
        match self.get_env(var) {
            None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(SourceError::Config(format!(
                    "{} must be a boolean, got '{}'",
                    var, value
                ))),
            },
        }
    }

    /// User-level cache directory, used when nothing else is configured.
    pub fn get_cache_dir(&self) -> Option<PathBuf> {
        if let Some(cache) = self.get_env("FORGEKIT_CACHE_DIR") {
            return Some(PathBuf::from(cache));
        }

        directories::ProjectDirs::from("", "", "forgekit").map(|dirs| dirs.cache_dir().to_path_buf())
    }

    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SourceError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| SourceError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the configuration for the project in `project_dir`.
    pub fn load(&self, project_dir: &Path) -> Result<Config> {
        let mut config = Config::with_base_dir(project_dir);

        if let Some(cache) = self.get_cache_dir() {
            config.cache_dir = cache;
        }

        let file = project_dir.join(CONFIG_FILE);
        log::debug!("Reading {}", file.display());
        self.load_config_file(&file)?.apply(&mut config);

        self.apply_env(&mut config)?;

        log::debug!("Configuration: {:?}", config);
        Ok(config)
    }

    fn apply_env(&self, config: &mut Config) -> Result<()> {
        if let Some(v) = self.get_env("FORGEKIT_CACHE_DIR") {
            config.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = self.get_env("FORGEKIT_INSTALL_DIR") {
            config.install_dir = PathBuf::from(v);
        }
        if let Some(v) = self.get_env("FORGEKIT_VENDOR_DIR") {
            config.vendor_dir = PathBuf::from(v);
        }
        if let Some(v) = self.get_env_bool("FORGEKIT_LOCAL")? {
            config.local = v;
        }
        if let Some(v) = self.get_env_bool("FORGEKIT_VENDOR")? {
            config.vendor = v;
        }
        if let Some(v) = self.get_env("FORGEKIT_FORGE_URL") {
            config.forge_url = v;
        }
        if let Some(v) = self.get_env("FORGEKIT_HTTP_PROXY") {
            config.http_proxy = Some(v);
        }
        if let Some(v) = self.get_env("FORGEKIT_HTTP_TIMEOUT") {
            config.http_timeout = v.parse().map_err(|_| {
                SourceError::Config(format!("FORGEKIT_HTTP_TIMEOUT must be a number, got '{}'", v))
            })?;
        }
        Ok(())
    }
}
