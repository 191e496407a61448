use serde::{Deserialize, Serialize};

use crate::commands::config::config_get_db;
use crate::db::DbPool;
use crate::error::AnalysisError;
use crate::orchestrator::{AnalysisMode, AnalysisReport, AnomalyAnalyzer};
use crate::store::SqliteStore;

/// Failure body returned to callers: 404 for unknown transactions, 500 for
/// everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

impl From<AnalysisError> for ErrorResponse {
    fn from(err: AnalysisError) -> Self {
        Self {
            status: err.status_code(),
            detail: err.to_string(),
        }
    }
}

impl ErrorResponse {
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Analyzer over the pool, configured from the stored detector thresholds.
pub fn analyzer_from_db(pool: &DbPool) -> Result<AnomalyAnalyzer<SqliteStore>, AnalysisError> {
    let config = config_get_db(pool)?;
    Ok(AnomalyAnalyzer::new(SqliteStore::new(pool.clone()), &config))
}

pub fn analyze_db(
    pool: &DbPool,
    user_id: &str,
    transaction_id: &str,
    mode: AnalysisMode,
) -> Result<AnalysisReport, ErrorResponse> {
    let analyzer = analyzer_from_db(pool)?;
    Ok(analyzer.analyze(user_id, transaction_id, mode)?)
}
