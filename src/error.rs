use thiserror::Error;

/// Failures talking to the transaction store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp {0} in stored transaction")]
    Timestamp(i64),
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}

/// Terminal outcomes of an analysis request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Transaction not found")]
    NotFound { transaction_id: String },
    #[error("{0}")]
    Internal(String),
}

impl AnalysisError {
    /// HTTP-style status class: 404 for client errors, 500 for server errors.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::NotFound { .. } => 404,
            AnalysisError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AnalysisError {
    fn from(err: StoreError) -> Self {
        AnalysisError::Internal(err.to_string())
    }
}
