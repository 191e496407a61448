use crate::db::DbPool;

/// Schema change applied once, in order, after the base tables exist.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_transaction_anomaly_flags",
        sql: "ALTER TABLE transactions ADD COLUMN location_anomaly INTEGER;
              ALTER TABLE transactions ADD COLUMN amount_anomaly INTEGER;",
    },
    Migration {
        name: "002_transactions_time_index",
        sql: "CREATE INDEX IF NOT EXISTS idx_transactions_account_time
                  ON transactions(account_id, date_time);",
    },
];

/// Names of applied migrations in application order.
pub fn applied(pool: &DbPool) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT name FROM migrations ORDER BY id")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Apply every migration not yet recorded. Each one runs in its own SQL
/// transaction together with its bookkeeping row, so a failing migration
/// leaves no partial state behind.
pub fn run_pending(pool: &DbPool) -> Result<Vec<&'static str>, Box<dyn std::error::Error>> {
    let done = applied(pool)?;
    let mut conn = pool.get()?;
    let mut newly_applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| !done.iter().any(|d| d == m.name)) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute("INSERT INTO migrations (name) VALUES (?1)", [migration.name])?;
        tx.commit()?;
        tracing::debug!(migration = migration.name, "Applied migration");
        newly_applied.push(migration.name);
    }

    Ok(newly_applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn base_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("test.sqlite")).unwrap();
        db::init_db(&pool).unwrap();
        (dir, pool)
    }

    #[test]
    fn fresh_db_gets_every_migration_once() {
        let (_dir, pool) = base_pool();
        let first = run_pending(&pool).unwrap();
        assert_eq!(first.len(), MIGRATIONS.len());
        assert!(run_pending(&pool).unwrap().is_empty());

        let names = applied(&pool).unwrap();
        let expected: Vec<&str> = MIGRATIONS.iter().map(|m| m.name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn flag_columns_added_without_losing_rows() {
        let (_dir, pool) = base_pool();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "INSERT INTO accounts (id, user_id) VALUES ('a1', 'u1');
                 INSERT INTO transactions (id, account_id, amount) VALUES ('t1', 'a1', 42.0);",
            )
            .unwrap();
        }
        run_pending(&pool).unwrap();

        let conn = pool.get().unwrap();
        let (amount, flag): (f64, Option<bool>) = conn
            .query_row(
                "SELECT amount, location_anomaly FROM transactions WHERE id = 't1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(amount, 42.0);
        assert_eq!(flag, None);
    }

    #[test]
    fn failed_migration_is_not_recorded() {
        let (_dir, pool) = base_pool();
        {
            let conn = pool.get().unwrap();
            // 001 will collide with a column that already exists.
            conn.execute_batch("ALTER TABLE transactions ADD COLUMN amount_anomaly INTEGER;")
                .unwrap();
        }
        assert!(run_pending(&pool).is_err());

        assert!(applied(&pool).unwrap().is_empty());
        let conn = pool.get().unwrap();
        assert!(conn
            .execute_batch("SELECT location_anomaly FROM transactions LIMIT 0")
            .is_err());
    }
}
