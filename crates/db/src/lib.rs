//! SQLite connection pool factory and migration runner.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Pool type shared by every module.
pub type DbPool = SqlitePool;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failed to apply
    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Migration definition for modules
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://bookshelf.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

impl DbConfig {
    /// Single-connection in-memory database. The connection is never recycled,
    /// since dropping it drops the data.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Self::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<DbPool> {
    let connect_options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    if config.is_in_memory() {
        options = options.idle_timeout(None).max_lifetime(None);
    }

    let pool = options.connect_with(connect_options).await?;

    tracing::info!(
        url = %config.url,
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &DbPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

const MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Apply every migration not yet recorded in `_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, so a failure leaves neither behind. Returns the number applied.
pub async fn run_migrations(pool: &DbPool, migrations: &[(String, Migration)]) -> DbResult<usize> {
    sqlx::query(MIGRATIONS_TABLE).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<(String,)> =
            sqlx::query_as("SELECT id FROM _migrations WHERE module = ?1 AND id = ?2")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;

        if already.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let wrap = |source| DbError::Migration {
            module: module.clone(),
            id: migration.id,
            source,
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?1, ?2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        tx.commit().await?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
