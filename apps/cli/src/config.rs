//! # Configuration
//!
//! Application settings loaded once at startup.
//!
//! ## Sources (later overrides earlier)
//! 1. Defaults (this file)
//! 2. Config file (`tally.toml` in the platform config dir, or `--config`)
//! 3. Environment variables (`TALLY_*`)
//! 4. Command-line flags (`--db`), applied by the caller
//!
//! ## Example
//! ```toml
//! [database]
//! path = "/home/shop/tally.db"
//!
//! [inventory]
//! low_stock_threshold = 5
//!
//! [display]
//! currency_code = "EUR"
//! recent_sales_limit = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use tally_core::{DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_RECENT_SALES_LIMIT};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Database file name inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "tally.db";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("No config path available on this platform")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `tally.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Products with fewer units are listed as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Currency code printed next to amounts (ISO 4217).
    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    /// Sales shown in the dashboard's recent list.
    #[serde(default = "default_recent_sales_limit")]
    pub recent_sales_limit: usize,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_recent_sales_limit() -> usize {
    DEFAULT_RECENT_SALES_LIMIT
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_code: default_currency_code(),
            recent_sales_limit: default_recent_sales_limit(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl AppConfig {
    /// Loads configuration from file and environment, then validates it.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                toml::from_str(&contents)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<&Path>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_overrides(|key| std::env::var(key).ok());
            if let Err(e) = config.validate() {
                warn!("Ignoring environment overrides: {}", e);
                return Self::default();
            }
            config
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<&Path>) -> ConfigResult<PathBuf> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(path)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "inventory.low_stock_threshold must not be negative".into(),
            ));
        }

        if self.display.recent_sales_limit == 0 {
            return Err(ConfigError::Invalid(
                "display.recent_sales_limit must be greater than 0".into(),
            ));
        }

        let code = self.display.currency_code.trim();
        if code.is_empty() || code.len() > 8 {
            return Err(ConfigError::Invalid(
                "display.currency_code must be 1-8 characters".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(threshold) = lookup("TALLY_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.inventory.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid TALLY_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(code) = lookup("TALLY_CURRENCY") {
            self.display.currency_code = code.trim().to_uppercase();
        }
    }

    /// Database file to open: configured path, else the platform default,
    /// else `./tally.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("com", "tally", "tally")
                    .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
            })
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.inventory.low_stock_threshold, 5);
        assert_eq!(config.display.currency_code, "USD");
        assert_eq!(config.display.recent_sales_limit, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [display]
            currency_code = "EUR"
            "#,
        )
        .unwrap();

        assert_eq!(config.display.currency_code, "EUR");
        assert_eq!(config.display.recent_sales_limit, 5);
        assert_eq!(config.inventory.low_stock_threshold, 5);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("TALLY_DB_PATH", "/tmp/shop.db"),
            ("TALLY_LOW_STOCK_THRESHOLD", "12"),
            ("TALLY_CURRENCY", " gbp "),
        ]));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/shop.db")));
        assert_eq!(config.inventory.low_stock_threshold, 12);
        assert_eq!(config.display.currency_code, "GBP");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop.db"));
    }

    #[test]
    fn test_invalid_env_number_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("TALLY_LOW_STOCK_THRESHOLD", "many")]));
        assert_eq!(config.inventory.low_stock_threshold, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.display.recent_sales_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.inventory.low_stock_threshold = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("tally-config-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.display.currency_code = "JPY".to_string();
        config.inventory.low_stock_threshold = 2;
        config.save(Some(&path)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: AppConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("tally-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[inventory]\nlow_stock_threshold = \"five\"\n").unwrap();

        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
