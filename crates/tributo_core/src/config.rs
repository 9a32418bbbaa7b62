//! Process configuration resolved once at startup.
//!
//! # Invariants
//! - Only [`StoreConfig::from_env`] reads the environment; everything else
//!   receives a resolved `StoreConfig`.
//! - Unset or blank variables fall back to defaults; malformed values are
//!   errors, not silent defaults.

use crate::geo::DEFAULT_RADIUS_M;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "TRIBUTO_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "TRIBUTO_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TRIBUTO_LOG_DIR";
pub const DEFAULT_RADIUS_VAR: &str = "TRIBUTO_DEFAULT_RADIUS_M";

const DEFAULT_DB_FILE_NAME: &str = "tributo.sqlite3";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
    pub default_radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.variable, self.message)
    }
}

impl Error for ConfigError {}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            default_radius_m: DEFAULT_RADIUS_M,
        }
    }
}

impl StoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup` (variable name -> value).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_VAR) {
            config.log_level = level;
        }
        if let Some(dir) = read(LOG_DIR_VAR) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError {
                    variable: LOG_DIR_VAR,
                    message: format!("`{}` is not an absolute path", dir.display()),
                });
            }
            config.log_dir = Some(dir);
        }
        if let Some(raw) = read(DEFAULT_RADIUS_VAR) {
            config.default_radius_m = match raw.parse::<f64>() {
                Ok(radius) if radius.is_finite() && radius >= 0.0 => radius,
                _ => {
                    return Err(ConfigError {
                        variable: DEFAULT_RADIUS_VAR,
                        message: format!("`{raw}` is not a non-negative number of meters"),
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, DEFAULT_RADIUS_VAR, LOG_DIR_VAR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.db_path.ends_with("tributo.sqlite3"));
        assert_eq!(config.default_radius_m, 500.0);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn variables_override_defaults() {
        let log_dir = std::env::temp_dir().join("tributo-logs");
        let config = StoreConfig::from_lookup(lookup(&[
            ("TRIBUTO_DB_PATH", "/var/lib/tributo/catastro.sqlite3"),
            ("TRIBUTO_LOG_LEVEL", "warn"),
            ("TRIBUTO_LOG_DIR", log_dir.to_str().unwrap()),
            ("TRIBUTO_DEFAULT_RADIUS_M", " 250 "),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/tributo/catastro.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(log_dir));
        assert_eq!(config.default_radius_m, 250.0);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[("TRIBUTO_DEFAULT_RADIUS_M", "-5")]))
            .unwrap_err();
        assert_eq!(err.variable, DEFAULT_RADIUS_VAR);

        let err = StoreConfig::from_lookup(lookup(&[("TRIBUTO_LOG_DIR", "logs")])).unwrap_err();
        assert_eq!(err.variable, LOG_DIR_VAR);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[("TRIBUTO_DB_PATH", "  ")])).unwrap();
        assert_eq!(config.db_path, StoreConfig::default().db_path);
    }
}
