use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};

pub type DbPool = Pool<SqliteConnectionManager>;

pub const DB_PATH_ENV: &str = "SPENDWATCH_DB";

const POOL_SIZE: u32 = 8;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS migrations (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        balance REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Every payload column is nullable: imported documents may omit any of them.
    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT NOT NULL,
        account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        amount REAL,
        date_time INTEGER,
        latitude REAL,
        longitude REAL,
        transaction_name TEXT,
        transaction_type TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (account_id, id)
    );

    CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_id ON transactions(id);
";

pub fn spendwatch_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".spendwatch")
}

/// Database file: `$SPENDWATCH_DB` if set, otherwise under the data dir.
pub fn default_db_path() -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => spendwatch_data_dir().join("state").join("spendwatch.sqlite"),
    }
}

/// Pool over `db_path`, creating parent directories. Every pooled
/// connection runs in WAL mode with foreign keys enforced.
pub fn create_pool(db_path: &Path) -> Result<DbPool, Box<dyn std::error::Error>> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"));
    Ok(Pool::builder().max_size(POOL_SIZE).build(manager)?)
}

pub fn init_db(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    pool.get()?.execute_batch(SCHEMA)?;
    Ok(())
}

/// Pool with the base schema and all migrations applied.
pub fn open(db_path: &Path) -> Result<DbPool, Box<dyn std::error::Error>> {
    let pool = create_pool(db_path)?;
    init_db(&pool)?;
    let applied = crate::migrations::run_pending(&pool)?;
    tracing::debug!(path = %db_path.display(), migrations = applied.len(), "Database ready");
    Ok(pool)
}
