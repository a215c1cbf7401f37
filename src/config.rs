//! # Server Configuration
//!
//! Loads the server settings from `paperboard.toml`: where to listen, where
//! the device layouts live, which time zone layouts default to, and the log
//! filter. Every field is optional and falls back to its default.
//!
//! Environment variables override the file, which suits container
//! deployments:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LP_HOST` | `host` |
//! | `LP_PORT` | `port` (1..=65535) |
//! | `LP_CONFIG_DIR` | `config_dir` |
//! | `LP_TIMEZONE` | `time_zone` |

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default location of the server settings.
pub const CONFIG_FILE: &str = "paperboard.toml";

/// Server settings loaded from paperboard.toml
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    pub port: u16,
    /// Directory holding `any/config.toml` and one sub-directory per device
    pub config_dir: PathBuf,
    /// IANA time zone for layouts that do not name one
    pub time_zone: String,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8084,
            config_dir: PathBuf::from("/config"),
            time_zone: "America/Los_Angeles".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from paperboard.toml, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from_path(CONFIG_FILE);
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(config) => {
                    info!(file = %path.display(), "loaded server configuration");
                    config
                }
                Err(e) => {
                    warn!(file = %path.display(), "invalid config file, using defaults: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                info!(file = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Override fields from `LP_*` variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("LP_HOST") {
            self.host = host.trim().to_string();
        }
        if let Some(port) = var("LP_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) if port > 0 => self.port = port,
                _ => warn!(value = %port, "ignoring LP_PORT, expected 1..=65535"),
            }
        }
        if let Some(dir) = var("LP_CONFIG_DIR").filter(|dir| !dir.trim().is_empty()) {
            self.config_dir = PathBuf::from(dir.trim());
        }
        if let Some(tz) = var("LP_TIMEZONE").filter(|tz| !tz.trim().is_empty()) {
            self.time_zone = tz.trim().to_string();
        }
    }

    /// Parsed `time_zone`; an unknown name falls back to UTC with a warning.
    pub fn default_time_zone(&self) -> Tz {
        self.time_zone.parse().unwrap_or_else(|_| {
            warn!(time_zone = %self.time_zone, "unknown time zone, using UTC");
            Tz::UTC
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8084);
        assert_eq!(config.config_dir, PathBuf::from("/config"));
        assert_eq!(config.default_time_zone(), chrono_tz::America::Los_Angeles);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = ServerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "port = 9000\ntime_zone = \"Europe/Berlin\"\n").unwrap();

        let config = ServerConfig::load_from_path(&path);
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_time_zone(), chrono_tz::Europe::Berlin);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_load_nonexistent_or_invalid_file() {
        let config = ServerConfig::load_from_path("/nonexistent/path");
        assert_eq!(config, ServerConfig::default());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "port = \"eighty\"\n").unwrap();
        assert_eq!(ServerConfig::load_from_path(&path), ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[
            ("LP_HOST", "127.0.0.1"),
            ("LP_PORT", "8080"),
            ("LP_CONFIG_DIR", "/srv/paper"),
            ("LP_TIMEZONE", "Asia/Tokyo"),
        ]));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.config_dir, PathBuf::from("/srv/paper"));
        assert_eq!(config.default_time_zone(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("LP_PORT", "0"), ("LP_CONFIG_DIR", " ")]));
        assert_eq!(config.port, 8084);
        assert_eq!(config.config_dir, PathBuf::from("/config"));

        config.apply_env(env(&[("LP_PORT", "70000")]));
        assert_eq!(config.port, 8084);

        config.time_zone = "Nowhere/Special".to_string();
        assert_eq!(config.default_time_zone(), Tz::UTC);
    }
}
