//! # Application State
//!
//! Shared state handed to every handler through the `State` extractor:
//! the SQLite pool and the immutable configuration.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
