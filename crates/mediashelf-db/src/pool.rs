//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Handles pool initialization,
//! per-connection pragmas, and running migrations.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use mediashelf_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pragmas applied to every new connection.
///
/// Foreign keys enforce the cascade chain index → item → version → part.
/// Recursive triggers let the `latest_added_at` bubble trigger cascade all
/// the way from an episode to its show.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA recursive_triggers = ON;";

/// Initialize a new database pool with the given file path.
///
/// Creates the SQLite database file if it doesn't exist, sets up connection
/// pooling, applies per-connection pragmas and runs pending migrations.
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager =
        SqliteConnectionManager::file(db_path).with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    run_migrations_on_pool(&pool)?;

    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// The pool is limited to a single connection so every caller observes the
/// same in-memory database.
pub fn init_memory_pool() -> Result<DbPool> {
    let manager =
        SqliteConnectionManager::memory().with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))?;

    run_migrations_on_pool(&pool)?;

    Ok(pool)
}

fn run_migrations_on_pool(pool: &DbPool) -> Result<()> {
    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(())
}

/// Get a connection from the pool, converting the r2d2 error into our
/// common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
