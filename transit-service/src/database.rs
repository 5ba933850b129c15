//! Database connection pool management

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{config::DatabaseConfig, error::Result};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open the pool and apply migrations when configured to
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = create_pool(config).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }
    Ok(pool)
}

/// Create a SQLite connection pool with retry logic
///
/// It will retry connection attempts based on the configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    create_pool_with_retries(config, config.max_retries).await
}

/// Apply all pending embedded migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Create a SQLite connection pool with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = config.retry_delay();

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: url={}, max={}, min={}",
                        display_url(&config.url),
                        pool.options().get_max_connections(),
                        pool.options().get_min_connections()
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay_multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
                let delay = base_delay.saturating_mul(delay_multiplier);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .foreign_keys(true)
        .busy_timeout(config.connection_timeout());

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout());

    // Each connection to an in-memory database opens its own database
    if is_in_memory(&config.url) {
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        crate::error::Error::Internal(format!(
            "Failed to open database at '{}': {}\n\n\
            Troubleshooting:\n\
            1. Check connection URL format: sqlite://path/to/file.db?mode=rwc\n\
            2. Verify the directory exists and is writable\n\
            3. Add mode=rwc to create the file on first start\n\n\
            Original error: {}",
            display_url(&config.url),
            categorize_db_error(&e),
            e
        ))
    })?;

    Ok(pool)
}

/// Whether the URL names a private in-memory database
fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Connection URL without its query options, for logging
fn display_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Categorize database error for better user guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error",
        Error::Database(_) => "Database error - check file permissions and path",
        Error::Io(_) => "I/O error - check the database path",
        Error::PoolTimedOut => "Connection pool timeout - database may be locked",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

/// Fresh in-memory database with the schema applied
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_retries: 0,
        ..DatabaseConfig::default()
    };
    connect(&config).await.expect("in-memory database")
}
