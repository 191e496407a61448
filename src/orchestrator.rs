use serde::Serialize;
use tracing::{error, info, warn};

use crate::detectors::{AmountDetector, Detector, LocationDetector};
use crate::error::AnalysisError;
use crate::store::TransactionStore;
use crate::types::anomaly::{
    AmountAnomalyResponse, AnomalyFlags, AnomalyResponse, CombinedAnomalyResponse,
};
use crate::types::config::DetectorConfig;
use crate::types::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Location,
    Amount,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Location(AnomalyResponse),
    Amount(AmountAnomalyResponse),
    Complete(CombinedAnomalyResponse),
}

/// A user's history split around the transaction under analysis.
struct Window {
    history: Vec<Transaction>,
    target: usize,
    prior_len: usize,
}

impl Window {
    fn target(&self) -> &Transaction {
        &self.history[self.target]
    }

    fn prior(&self) -> &[Transaction] {
        &self.history[..self.prior_len]
    }
}

/// Loads a user's history, runs the requested detectors on one transaction
/// and writes the resulting flags back to the store.
///
/// Holds no per-request state, so one analyzer can serve concurrent
/// requests as long as the store can.
pub struct AnomalyAnalyzer<S> {
    store: S,
    location: LocationDetector,
    amount: AmountDetector,
}

impl<S: TransactionStore> AnomalyAnalyzer<S> {
    pub fn new(store: S, config: &DetectorConfig) -> Self {
        Self {
            store,
            location: LocationDetector::new(config.location.clone()),
            amount: AmountDetector::new(config.amount.clone()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn analyze(
        &self,
        user_id: &str,
        transaction_id: &str,
        mode: AnalysisMode,
    ) -> Result<AnalysisReport, AnalysisError> {
        match mode {
            AnalysisMode::Location => self
                .analyze_location(user_id, transaction_id)
                .map(AnalysisReport::Location),
            AnalysisMode::Amount => self
                .analyze_amount(user_id, transaction_id)
                .map(AnalysisReport::Amount),
            AnalysisMode::Complete => self
                .analyze_complete(user_id, transaction_id)
                .map(AnalysisReport::Complete),
        }
    }

    pub fn analyze_location(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<AnomalyResponse, AnalysisError> {
        logged("location", user_id, transaction_id, || {
            let window = self.load_window(user_id, transaction_id)?;
            let result = self.location.detect(window.target(), window.prior());

            self.persist(
                user_id,
                transaction_id,
                AnomalyFlags {
                    location_anomaly: Some(result.is_anomaly),
                    amount_anomaly: None,
                },
            )?;
            Ok(AnomalyResponse::from_result(result, transaction_id))
        })
    }

    pub fn analyze_amount(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<AmountAnomalyResponse, AnalysisError> {
        logged("amount", user_id, transaction_id, || {
            let window = self.load_window(user_id, transaction_id)?;
            let result = self.amount.detect(window.target(), window.prior());
            let statistics = self.amount.statistics(window.prior());

            self.persist(
                user_id,
                transaction_id,
                AnomalyFlags {
                    location_anomaly: None,
                    amount_anomaly: Some(result.is_anomaly),
                },
            )?;
            Ok(AmountAnomalyResponse::from_result(result, transaction_id, statistics))
        })
    }

    pub fn analyze_complete(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<CombinedAnomalyResponse, AnalysisError> {
        logged("complete", user_id, transaction_id, || {
            let window = self.load_window(user_id, transaction_id)?;
            let location = self.location.detect(window.target(), window.prior());
            let amount = self.amount.detect(window.target(), window.prior());
            let statistics = self.amount.statistics(window.prior());

            let success = self.persist(
                user_id,
                transaction_id,
                AnomalyFlags {
                    location_anomaly: Some(location.is_anomaly),
                    amount_anomaly: Some(amount.is_anomaly),
                },
            )?;

            Ok(CombinedAnomalyResponse {
                location_analysis: AnomalyResponse::from_result(location, transaction_id),
                amount_analysis: AmountAnomalyResponse::from_result(
                    amount,
                    transaction_id,
                    statistics,
                ),
                success,
            })
        })
    }

    fn load_window(&self, user_id: &str, transaction_id: &str) -> Result<Window, AnalysisError> {
        let mut history = self.store.fetch_user_transactions(user_id)?;
        history.sort_by_key(|t| t.timestamp);

        let target = history
            .iter()
            .position(|t| t.id == transaction_id)
            .ok_or_else(|| AnalysisError::NotFound {
                transaction_id: transaction_id.to_string(),
            })?;
        let cutoff = history[target].timestamp;
        let prior_len = history.partition_point(|t| t.timestamp < cutoff);

        Ok(Window {
            history,
            target,
            prior_len,
        })
    }

    /// `Ok(false)` when the record disappeared between read and write.
    fn persist(
        &self,
        user_id: &str,
        transaction_id: &str,
        flags: AnomalyFlags,
    ) -> Result<bool, AnalysisError> {
        let updated = self
            .store
            .update_anomaly_flags(user_id, transaction_id, flags)?;
        if !updated {
            warn!(user_id, transaction_id, "Transaction vanished before flags were written");
        }
        Ok(updated)
    }
}

fn logged<T>(
    kind: &str,
    user_id: &str,
    transaction_id: &str,
    run: impl FnOnce() -> Result<T, AnalysisError>,
) -> Result<T, AnalysisError> {
    let outcome = run();
    match &outcome {
        Ok(_) => info!(kind, user_id, transaction_id, "Analysis complete"),
        Err(AnalysisError::NotFound { .. }) => {
            info!(kind, user_id, transaction_id, "Transaction not found")
        }
        Err(e) => error!(kind, user_id, transaction_id, error = %e, "Error analyzing transaction"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::transactions::{import_accounts_db, transaction_get_db};
    use crate::db;
    use crate::error::StoreError;
    use crate::store::SqliteStore;
    use crate::types::transaction::{Account, LocationDocument, TransactionDocument};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn doc(id: &str, amount: f64, hours: i64, kind: &str, loc: Option<(f64, f64)>) -> TransactionDocument {
        TransactionDocument {
            transaction_id: id.to_string(),
            amount: Some(amount),
            date_time: Some(at(hours)),
            location: loc.map(|(lat, lon)| LocationDocument {
                latitude: Some(lat),
                longitude: Some(lon),
            }),
            transaction_name: Some(id.to_string()),
            transaction_type: Some(kind.to_string()),
        }
    }

    fn seeded(transactions: Vec<TransactionDocument>) -> (tempfile::TempDir, AnomalyAnalyzer<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::open(&dir.path().join("test.sqlite")).unwrap();
        import_accounts_db(
            &pool,
            &[Account {
                account_id: "acc".to_string(),
                name: "Checking".to_string(),
                amount: 0.0,
                user_id: "u1".to_string(),
                transactions,
            }],
        )
        .unwrap();
        let analyzer = AnomalyAnalyzer::new(SqliteStore::new(pool), &DetectorConfig::default());
        (dir, analyzer)
    }

    fn madrid_expenses() -> Vec<TransactionDocument> {
        [10.0, 12.0, 11.0, 9.0, 13.0]
            .iter()
            .enumerate()
            .map(|(i, &a)| doc(&format!("e{}", i), a, i as i64 * 24, "Expense", Some((40.4168, -3.7038))))
            .collect()
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let (_dir, analyzer) = seeded(madrid_expenses());
        let err = analyzer.analyze_complete("u1", "nope").unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn amount_analysis_flags_and_persists() {
        let mut txs = madrid_expenses();
        txs.push(doc("big", 500.0, 200, "Expense", None));
        let (_dir, analyzer) = seeded(txs);

        let resp = analyzer.analyze_amount("u1", "big").unwrap();
        assert!(resp.is_anomaly);
        assert_eq!(resp.confidence, 0.85);
        assert_eq!(resp.transaction_id, "big");
        let stats = resp.statistics.unwrap();
        assert_eq!(stats.expense_count, Some(5));
        assert_eq!(stats.expense_median, Some(11.0));
        assert!(stats.income_count.is_none());

        let stored = transaction_get_db(analyzer.store().pool(), "u1", "big").unwrap().unwrap();
        assert_eq!(stored.amount_anomaly, Some(true));
        assert_eq!(stored.location_anomaly, None);
    }

    #[test]
    fn prior_window_excludes_target_and_later_transactions() {
        let mut txs = madrid_expenses();
        txs.push(doc("later", 10_000.0, 500, "Expense", None));
        let (_dir, analyzer) = seeded(txs);

        let resp = analyzer.analyze_amount("u1", "e2").unwrap();
        assert!(!resp.is_anomaly);
        assert!(resp.reason.starts_with("Insufficient historical data"));
        assert_eq!(resp.statistics.unwrap().expense_count, Some(2));
    }

    #[test]
    fn first_transaction_has_no_statistics() {
        let (_dir, analyzer) = seeded(madrid_expenses());
        let resp = analyzer.analyze_amount("u1", "e0").unwrap();
        assert!(resp.statistics.is_none());
    }

    #[test]
    fn location_analysis_persists_only_location_flag() {
        let mut txs = madrid_expenses();
        txs.push(doc("bcn", 11.0, 4 * 24 + 1, "Expense", Some((41.3874, 2.1686))));
        let (_dir, analyzer) = seeded(txs);

        let resp = analyzer.analyze_location("u1", "bcn").unwrap();
        assert!(resp.is_anomaly);
        assert_eq!(resp.confidence, 0.9);

        let stored = transaction_get_db(analyzer.store().pool(), "u1", "bcn").unwrap().unwrap();
        assert_eq!(stored.location_anomaly, Some(true));
        assert_eq!(stored.amount_anomaly, None);
    }

    #[test]
    fn complete_analysis_reports_both_and_success() {
        let mut txs = madrid_expenses();
        txs.push(doc("c", 11.5, 200, "Expense", Some((40.4170, -3.7040))));
        let (_dir, analyzer) = seeded(txs);

        let resp = analyzer.analyze_complete("u1", "c").unwrap();
        assert!(resp.success);
        assert!(!resp.location_analysis.is_anomaly);
        assert!(!resp.amount_analysis.is_anomaly);

        let stored = transaction_get_db(analyzer.store().pool(), "u1", "c").unwrap().unwrap();
        assert_eq!(stored.location_anomaly, Some(false));
        assert_eq!(stored.amount_anomaly, Some(false));
    }

    #[test]
    fn analyze_dispatches_by_mode() {
        let (_dir, analyzer) = seeded(madrid_expenses());
        let report = analyzer.analyze("u1", "e4", AnalysisMode::Location).unwrap();
        assert!(matches!(report, AnalysisReport::Location(_)));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["transactionId"], "e4");
    }

    struct FakeStore {
        history: Result<Vec<Transaction>, String>,
        update_result: bool,
        writes: Mutex<Vec<AnomalyFlags>>,
    }

    impl TransactionStore for FakeStore {
        fn fetch_user_transactions(&self, _user_id: &str) -> Result<Vec<Transaction>, StoreError> {
            self.history.clone().map_err(|msg| {
                StoreError::Sqlite(rusqlite::Error::InvalidParameterName(msg))
            })
        }

        fn update_anomaly_flags(
            &self,
            _user_id: &str,
            _transaction_id: &str,
            flags: AnomalyFlags,
        ) -> Result<bool, StoreError> {
            self.writes.lock().unwrap().push(flags);
            Ok(self.update_result)
        }
    }

    fn fake(history: Result<Vec<Transaction>, String>, update_result: bool) -> AnomalyAnalyzer<FakeStore> {
        AnomalyAnalyzer::new(
            FakeStore {
                history,
                update_result,
                writes: Mutex::new(Vec::new()),
            },
            &DetectorConfig::default(),
        )
    }

    #[test]
    fn fetch_failure_is_internal_with_description() {
        let analyzer = fake(Err("disk on fire".to_string()), true);
        let err = analyzer.analyze_location("u1", "t1").unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn vanished_record_is_soft_failure() {
        let history = vec![doc("t1", 10.0, 0, "Expense", None).normalize(at(0))];
        let analyzer = fake(Ok(history), false);
        let resp = analyzer.analyze_complete("u1", "t1").unwrap();
        assert!(!resp.success);
        assert_eq!(analyzer.store().writes.lock().unwrap().len(), 1);
    }

    #[test]
    fn store_order_is_not_trusted() {
        let mut history: Vec<Transaction> = madrid_expenses()
            .into_iter()
            .map(|d| d.normalize(at(0)))
            .collect();
        history.push(doc("big", 500.0, 200, "Expense", None).normalize(at(0)));
        history.reverse();
        let analyzer = fake(Ok(history), true);

        let resp = analyzer.analyze_amount("u1", "big").unwrap();
        assert!(resp.is_anomaly);
        let writes = analyzer.store().writes.lock().unwrap();
        assert_eq!(
            writes[0],
            AnomalyFlags {
                location_anomaly: None,
                amount_anomaly: Some(true),
            }
        );
    }
}
