//! Runtime configuration.
//!
//! Everything comes from environment variables (a `.env` file is loaded by
//! the binary before this runs):
//!
//! - `UPSTASH_REDIS_REST_URL`, `UPSTASH_REDIS_REST_TOKEN`: required cache endpoint
//! - `SHIFTS_DATA_PATH`: shift file, defaults to `<data dir>/shiftcache/shifts.json`
//! - `SHIFTS_CACHE_TTL_SECS`: cached query lifetime, defaults to 300

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::CacheError;

/// Application name used for data directory paths
const APP_NAME: &str = "shiftcache";

/// Shift file name inside the data directory
const DATA_FILE: &str = "shifts.json";

/// Cached query results live for 5 minutes.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

pub const URL_VAR: &str = "UPSTASH_REDIS_REST_URL";
pub const TOKEN_VAR: &str = "UPSTASH_REDIS_REST_TOKEN";
pub const DATA_PATH_VAR: &str = "SHIFTS_DATA_PATH";
pub const TTL_VAR: &str = "SHIFTS_CACHE_TTL_SECS";

/// Cache backend endpoint and credentials.
#[derive(Clone)]
pub struct CacheConfig {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub data_path: PathBuf,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = var(URL_VAR).ok_or(CacheError::MissingConfig(URL_VAR))?;
        let token = var(TOKEN_VAR).ok_or(CacheError::MissingConfig(TOKEN_VAR))?;

        let data_path = match var(DATA_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => Self::default_data_path()?,
        };

        let ttl_secs = match var(TTL_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a whole number of seconds, got {:?}", TTL_VAR, raw))?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            cache: CacheConfig { url, token },
            data_path,
            cache_ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn default_data_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory; set {}", DATA_PATH_VAR))?;
        Ok(data_dir.join(APP_NAME).join(DATA_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_lookup(lookup(&[
            (URL_VAR, "https://example.upstash.io"),
            (TOKEN_VAR, "tok"),
            (DATA_PATH_VAR, "/tmp/shifts.json"),
            (TTL_VAR, "60"),
        ]))
        .unwrap();
        assert_eq!(config.cache.url, "https://example.upstash.io");
        assert_eq!(config.data_path, PathBuf::from("/tmp/shifts.json"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert!(!format!("{:?}", config).contains("tok\""));
    }

    #[test]
    fn test_missing_cache_config_is_fatal() {
        let err = Config::from_lookup(lookup(&[(TOKEN_VAR, "tok")])).unwrap_err();
        assert!(matches!(err.downcast_ref::<CacheError>(), Some(CacheError::MissingConfig(URL_VAR))));

        let err = Config::from_lookup(lookup(&[(URL_VAR, "https://x"), (TOKEN_VAR, "  ")])).unwrap_err();
        assert!(matches!(err.downcast_ref::<CacheError>(), Some(CacheError::MissingConfig(TOKEN_VAR))));
    }

    #[test]
    fn test_defaults_and_bad_ttl() {
        let config = Config::from_lookup(lookup(&[
            (URL_VAR, "https://x"),
            (TOKEN_VAR, "tok"),
            (DATA_PATH_VAR, "shifts.json"),
        ]))
        .unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        let err = Config::from_lookup(lookup(&[
            (URL_VAR, "https://x"),
            (TOKEN_VAR, "tok"),
            (DATA_PATH_VAR, "shifts.json"),
            (TTL_VAR, "five"),
        ]));
        assert!(err.is_err());
    }
}
