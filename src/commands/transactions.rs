use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::DbPool;
use crate::error::StoreError;
use crate::types::anomaly::AnomalyFlags;
use crate::types::transaction::{Account, LocationDocument, StoredTransaction, TransactionDocument};

const SELECT_COLUMNS: &str = "t.id, t.account_id, t.amount, t.date_time, t.latitude, t.longitude,
     t.transaction_name, t.transaction_type, t.location_anomaly, t.amount_anomaly";

struct TransactionRow {
    id: String,
    account_id: String,
    amount: Option<f64>,
    date_time: Option<i64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: Option<String>,
    kind: Option<String>,
    location_anomaly: Option<bool>,
    amount_anomaly: Option<bool>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        date_time: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        name: row.get(6)?,
        kind: row.get(7)?,
        location_anomaly: row.get(8)?,
        amount_anomaly: row.get(9)?,
    })
}

impl TryFrom<TransactionRow> for StoredTransaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let date_time = row
            .date_time
            .map(|ms| DateTime::<Utc>::from_timestamp_millis(ms).ok_or(StoreError::Timestamp(ms)))
            .transpose()?;
        let location = if row.latitude.is_some() || row.longitude.is_some() {
            Some(LocationDocument {
                latitude: row.latitude,
                longitude: row.longitude,
            })
        } else {
            None
        };

        Ok(StoredTransaction {
            account_id: row.account_id,
            document: TransactionDocument {
                transaction_id: row.id,
                amount: row.amount,
                date_time,
                location,
                transaction_name: row.name,
                transaction_type: row.kind,
            },
            location_anomaly: row.location_anomaly,
            amount_anomaly: row.amount_anomaly,
        })
    }
}

/// Upsert accounts and their embedded transactions in one SQL transaction.
/// Existing anomaly flags survive a re-import. Returns the number of
/// transactions written.
pub fn import_accounts_db(pool: &DbPool, accounts: &[Account]) -> Result<usize, StoreError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let mut written = 0;

    for account in accounts {
        tx.execute(
            "INSERT INTO accounts (id, user_id, name, balance) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET user_id = ?2, name = ?3, balance = ?4",
            rusqlite::params![account.account_id, account.user_id, account.name, account.amount],
        )?;

        for doc in &account.transactions {
            let (latitude, longitude) = doc
                .location
                .as_ref()
                .map(|l| (l.latitude, l.longitude))
                .unwrap_or((None, None));
            tx.execute(
                "INSERT INTO transactions
                    (id, account_id, amount, date_time, latitude, longitude, transaction_name, transaction_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(account_id, id) DO UPDATE SET
                    amount = ?3, date_time = ?4, latitude = ?5, longitude = ?6,
                    transaction_name = ?7, transaction_type = ?8",
                rusqlite::params![
                    doc.transaction_id,
                    account.account_id,
                    doc.amount,
                    doc.date_time.map(|d| d.timestamp_millis()),
                    latitude,
                    longitude,
                    doc.transaction_name,
                    doc.transaction_type,
                ],
            )?;
            written += 1;
        }
    }

    tx.commit()?;
    debug!(accounts = accounts.len(), transactions = written, "Imported accounts");
    Ok(written)
}

/// All transactions across the user's accounts, oldest first. Rows without a
/// timestamp sort first.
pub fn transactions_list_db(pool: &DbPool, user_id: &str) -> Result<Vec<StoredTransaction>, StoreError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions t
         JOIN accounts a ON a.id = t.account_id
         WHERE a.user_id = ?1
         ORDER BY t.date_time, t.rowid",
        SELECT_COLUMNS
    ))?;

    let rows = stmt.query_map([user_id], read_row)?;
    let mut results = Vec::new();
    for row in rows {
        results.push(StoredTransaction::try_from(row?)?);
    }
    Ok(results)
}

/// A single transaction from any of the user's accounts.
pub fn transaction_get_db(
    pool: &DbPool,
    user_id: &str,
    transaction_id: &str,
) -> Result<Option<StoredTransaction>, StoreError> {
    let conn = pool.get()?;
    let row = match conn.query_row(
        &format!(
            "SELECT {} FROM transactions t
             JOIN accounts a ON a.id = t.account_id
             WHERE a.user_id = ?1 AND t.id = ?2
             LIMIT 1",
            SELECT_COLUMNS
        ),
        [user_id, transaction_id],
        read_row,
    ) {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(StoredTransaction::try_from(row)?))
}

pub fn transaction_delete_db(pool: &DbPool, user_id: &str, transaction_id: &str) -> Result<bool, StoreError> {
    let conn = pool.get()?;
    let deleted = conn.execute(
        "DELETE FROM transactions
         WHERE id = ?1 AND account_id IN (SELECT id FROM accounts WHERE user_id = ?2)",
        [transaction_id, user_id],
    )?;
    Ok(deleted > 0)
}

/// Write the supplied flags onto the stored record, leaving unsupplied ones
/// untouched. `Ok(false)` when the user has no such transaction.
pub fn transaction_update_flags_db(
    pool: &DbPool,
    user_id: &str,
    transaction_id: &str,
    flags: AnomalyFlags,
) -> Result<bool, StoreError> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE transactions SET
            location_anomaly = COALESCE(?1, location_anomaly),
            amount_anomaly = COALESCE(?2, amount_anomaly)
         WHERE id = ?3 AND account_id IN (SELECT id FROM accounts WHERE user_id = ?4)",
        rusqlite::params![flags.location_anomaly, flags.amount_anomaly, transaction_id, user_id],
    )?;
    Ok(updated > 0)
}
