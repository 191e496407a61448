use chrono::Utc;

use crate::commands::transactions::{transaction_update_flags_db, transactions_list_db};
use crate::db::DbPool;
use crate::error::StoreError;
use crate::types::anomaly::AnomalyFlags;
use crate::types::transaction::Transaction;

/// Persistence collaborator for the analyzer.
pub trait TransactionStore {
    /// Every transaction of the user, oldest first, with stored gaps filled
    /// by the documented defaults.
    fn fetch_user_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError>;

    /// Write the supplied flags back. `Ok(false)` when the record is gone.
    fn update_anomaly_flags(
        &self,
        user_id: &str,
        transaction_id: &str,
        flags: AnomalyFlags,
    ) -> Result<bool, StoreError>;
}

/// `TransactionStore` backed by the SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl TransactionStore for SqliteStore {
    fn fetch_user_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let now = Utc::now();
        let mut transactions: Vec<Transaction> = transactions_list_db(&self.pool, user_id)?
            .into_iter()
            .map(|stored| stored.document.normalize(now))
            .collect();
        // Missing timestamps become `now`, so order again after normalising.
        transactions.sort_by_key(|t| t.timestamp);
        Ok(transactions)
    }

    fn update_anomaly_flags(
        &self,
        user_id: &str,
        transaction_id: &str,
        flags: AnomalyFlags,
    ) -> Result<bool, StoreError> {
        transaction_update_flags_db(&self.pool, user_id, transaction_id, flags)
    }
}
