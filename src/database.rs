use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(pool_size)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    /// Waits for PostgreSQL to come up, retrying once per second.
    pub async fn connect_with_retry(
        database_url: &str,
        pool_size: u32,
        retries: u32,
    ) -> Result<Self, sqlx::Error> {
        let mut attempt = 0;
        loop {
            match Self::new(database_url, pool_size).await {
                Ok(db) => return Ok(db),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!("Database unavailable (attempt {}/{}): {}", attempt, retries, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pool that only connects on first use.
    pub fn new_lazy(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(pool_size).connect_lazy(database_url)?;
        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }

    fn pool_options(pool_size: u32) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
    }
}

/// Unique-constraint violations surface as 23505 from PostgreSQL.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Foreign-key violations (23503).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
