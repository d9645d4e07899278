//! Service configuration: defaults, an optional JSON file, then env overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid API base URL {url:?}: {source}")]
    InvalidUrl { url: String, source: url::ParseError },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Booking backend base URL, e.g. `https://api.example.org`
    pub api_base_url: String,
    /// Address the dashboard service listens on
    pub bind_addr: String,
    /// SQLite file holding the token pair and cached user
    pub credentials_db: PathBuf,
    /// How long a cached list stays fresh
    pub stale_time_secs: u64,
    /// How long an unread cache entry is kept
    pub gc_time_secs: u64,
    pub gc_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            bind_addr: "127.0.0.1:3001".to_string(),
            credentials_db: PathBuf::from("lessondesk-credentials.db"),
            stale_time_secs: 5 * 60,
            gc_time_secs: 10 * 60,
            gc_interval_secs: 60,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: concat!("lessondesk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `LESSONDESK_CONFIG` (if set) and applies the other
    /// `LESSONDESK_*` variables on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("LESSONDESK_CONFIG") {
            Ok(path) => Self::load_from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.base_url()?;
        Ok(config)
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("LESSONDESK_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(addr) = lookup("LESSONDESK_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup("LESSONDESK_CREDENTIALS_DB") {
            self.credentials_db = PathBuf::from(path);
        }
        if let Some(secs) = lookup("LESSONDESK_STALE_TIME_SECS") {
            self.stale_time_secs = parse_secs("LESSONDESK_STALE_TIME_SECS", secs)?;
        }
        if let Some(secs) = lookup("LESSONDESK_GC_TIME_SECS") {
            self.gc_time_secs = parse_secs("LESSONDESK_GC_TIME_SECS", secs)?;
        }
        Ok(())
    }

    /// Parsed base URL, without a trailing slash.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.api_base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
            url: self.api_base_url.clone(),
            source,
        })
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_time_secs)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_query_cache_timings() {
        let config = DashboardConfig::default();
        assert_eq!(config.stale_time(), Duration::from_secs(300));
        assert_eq!(config.gc_time(), Duration::from_secs(600));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"api_base_url": "https://api.school.test/"}"#).unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "https://api.school.test/");
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LESSONDESK_BIND_ADDR", "0.0.0.0:8080"),
            ("LESSONDESK_STALE_TIME_SECS", "30"),
        ]
        .into_iter()
        .collect();

        let mut config = DashboardConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.stale_time_secs, 30);

        let bad: HashMap<&str, &str> = [("LESSONDESK_GC_TIME_SECS", "ten")].into_iter().collect();
        let err = config
            .apply_overrides(|k| bad.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = DashboardConfig {
            api_base_url: "not a url".into(),
            ..DashboardConfig::default()
        };
        assert!(config.base_url().is_err());
    }
}
