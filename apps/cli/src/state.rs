//! # Application State
//!
//! What every command needs: the database handle and the loaded config.
//! Built once per process; cloning is cheap.

use std::path::PathBuf;

use tally_db::{Database, DbConfig};
use tracing::info;

use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    /// Opens the database named by `db_override` or the config.
    pub async fn open(config: AppConfig, db_override: Option<PathBuf>) -> Result<Self, ApiError> {
        let path = db_override.unwrap_or_else(|| config.database_path());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Opening database");
        let db = Database::new(DbConfig::new(path)).await?;
        Ok(AppState { db, config })
    }

    /// State backed by a fresh in-memory database.
    pub async fn in_memory(config: AppConfig) -> Result<Self, ApiError> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(AppState { db, config })
    }

    pub fn currency(&self) -> &str {
        &self.config.display.currency_code
    }
}
