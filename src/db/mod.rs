//! PostgreSQL pool and schema

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Owns the pool the ledger store draws transactions from
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool. `acquire_timeout` bounds how long `begin` may wait for a
    /// free connection before the operation fails with a timeout.
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "PostgreSQL pool ready"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Ledger schema migrations applied");
        Ok(())
    }
}
