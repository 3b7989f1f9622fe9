use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::environment::Environment;
use crate::http::HttpClientConfig;

/// Registry that VCS-hosted modules resolve their dependencies against.
pub const DEFAULT_FORGE_URL: &str = "http://forge.puppetlabs.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub cache_dir: PathBuf,
    pub install_dir: PathBuf,
    pub vendor_dir: PathBuf,
    pub local: bool,
    pub vendor: bool,
    pub forge_url: String,
    /// Request timeout in seconds.
    pub http_timeout: u64,
    pub http_proxy: Option<String>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_dir: PathBuf::from(".forgekit/cache"),
            install_dir: PathBuf::from("modules"),
            vendor_dir: PathBuf::from("vendor/puppet"),
            local: false,
            vendor: false,
            forge_url: DEFAULT_FORGE_URL.to_string(),
            http_timeout: 30,
            http_proxy: None,
            base_dir: None,
        }
    }
}

impl Config {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Config {
            base_dir: Some(base_dir.into()),
            ..Default::default()
        }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn get_cache_dir(&self) -> PathBuf {
        self.resolve(&self.cache_dir)
    }

    pub fn get_install_dir(&self) -> PathBuf {
        self.resolve(&self.install_dir)
    }

    pub fn get_vendor_dir(&self) -> PathBuf {
        self.resolve(&self.vendor_dir)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut http = HttpClientConfig::new().with_timeout(Duration::from_secs(self.http_timeout));
        if let Some(proxy) = &self.http_proxy {
            http = http.with_proxy(proxy.clone());
        }
        http
    }
}

impl Environment for Config {
    fn is_local(&self) -> bool {
        self.local
    }

    fn is_vendor(&self) -> bool {
        self.vendor
    }

    fn cache_root(&self) -> PathBuf {
        self.get_cache_dir()
    }

    fn install_root(&self) -> PathBuf {
        self.get_install_dir()
    }

    fn vendor_cache_root(&self) -> PathBuf {
        self.get_vendor_dir().join("cache")
    }

    fn vendor_source_root(&self) -> PathBuf {
        self.get_vendor_dir().join("source")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.install_dir, PathBuf::from("modules"));
        assert_eq!(config.forge_url, DEFAULT_FORGE_URL);
        assert!(!config.local);
        assert!(!config.vendor);
        assert_eq!(config.http_timeout, 30);
    }

    #[test]
    fn test_paths_resolve_against_base_dir() {
        let config = Config::with_base_dir("/project");
        assert_eq!(config.install_root(), PathBuf::from("/project/modules"));
        assert_eq!(config.vendor_cache_root(), PathBuf::from("/project/vendor/puppet/cache"));
        assert_eq!(config.vendor_source_root(), PathBuf::from("/project/vendor/puppet/source"));
        assert_eq!(config.cache_root(), PathBuf::from("/project/.forgekit/cache"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut config = Config::with_base_dir("/project");
        config.cache_dir = PathBuf::from("/var/cache/forgekit");
        assert_eq!(config.cache_root(), PathBuf::from("/var/cache/forgekit"));
    }

    #[test]
    fn test_http_client_config() {
        let mut config = Config::default();
        config.http_timeout = 5;
        config.http_proxy = Some("http://proxy:3128".to_string());

        let http = config.http_client_config();
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.proxy.as_deref(), Some("http://proxy:3128"));
    }
}
