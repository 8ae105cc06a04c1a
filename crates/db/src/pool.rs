//! Postgres connection pool.
//!
//! Timeouts live here and nowhere else: the engine never times anything out
//! on its own, it only surfaces whatever the pool reports.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::DbError;

/// Type alias for the shared Postgres pool used across the whole application.
pub type DbPool = PgPool;

/// Connection settings for [`create_pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a request may wait for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Create a new connection pool from the given `database_url`.
pub async fn create_pool(database_url: &str, config: &PoolConfig) -> Result<DbPool, DbError> {
    info!(
        "Connecting to schedule database (max_connections={}, acquire_timeout={:?})",
        config.max_connections, config.acquire_timeout
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded schedule schema migrations from `/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("Applying schedule schema migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
