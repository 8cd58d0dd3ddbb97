//! 数据库连接管理

use carelink_core::config::DatabaseConfig;
use carelink_core::{CarelinkError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// 数据库连接池
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 按配置建立连接池
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| CarelinkError::Database(e.to_string()))?;

        tracing::info!("Database pool connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
