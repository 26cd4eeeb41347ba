use crate::cache::CacheConfig;
use crate::error::ConfigError;
use chrono::Duration;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use std::path::Path;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.k-r.by";
pub const DEFAULT_CACHE_TTL_MS: u64 = 5 * 60 * 1000;
pub const ENV_PREFIX: &str = "CATALOG_";

/// Settings for the product fetch client.
///
/// Loaded from an optional YAML file, then overridden by `CATALOG_*`
/// environment variables (`CATALOG_BASE_URL`, `CATALOG_CACHE_TTL_MS`,
/// `CATALOG_ENABLED`).
#[serde_inline_default]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct FetchConfig {
    #[serde_inline_default(DEFAULT_BASE_URL.to_string())]
    #[getset(get = "pub")]
    base_url: String,
    #[serde_inline_default(DEFAULT_CACHE_TTL_MS)]
    #[getset(get_copy = "pub")]
    cache_ttl_ms: u64,
    #[serde_inline_default(true)]
    #[getset(get_copy = "pub")]
    enabled: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            enabled: true,
        }
    }
}

impl FetchConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: FetchConfig = figment.extract()?;
        config.parsed_base_url()?;
        Ok(config)
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.cache_ttl_ms).unwrap_or(i64::MAX))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl(),
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = FetchConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, FetchConfig::default());
            assert_eq!(config.cache_config().ttl, Duration::minutes(5));
            Ok(())
        });
    }

    #[test]
    fn test_yaml_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "catalog.yaml",
                "base_url: http://localhost:3000\ncache_ttl_ms: 1000\n",
            )?;
            jail.set_env("CATALOG_ENABLED", "false");

            let config = FetchConfig::load(Some(Path::new("catalog.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.base_url(), "http://localhost:3000");
            assert_eq!(config.cache_ttl_ms(), 1000);
            assert!(!config.enabled());
            assert!(!config.cache_config().enabled);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("CATALOG_BASE_URL", "not a url");
            let err = FetchConfig::load(None).unwrap_err();
            assert!(matches!(err, ConfigError::BaseUrl(_)));
            Ok(())
        });
    }
}
