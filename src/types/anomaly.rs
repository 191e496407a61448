use serde::{Deserialize, Serialize};

/// Outcome of a single detector run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_anomaly: bool,
    pub confidence: f64,
    pub reason: String,
}

impl DetectionResult {
    pub fn anomaly(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            is_anomaly: true,
            confidence,
            reason: reason.into(),
        }
    }

    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            is_anomaly: false,
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

/// Per-type summary of a transaction list. Keys for an empty partition are
/// left out of the serialized form rather than zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_count: Option<usize>,
}

impl TransactionStatistics {
    pub fn is_empty(&self) -> bool {
        self.income_count.is_none() && self.expense_count.is_none()
    }
}

/// Flags written back onto a stored transaction. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFlags {
    pub location_anomaly: Option<bool>,
    pub amount_anomaly: Option<bool>,
}

impl AnomalyFlags {
    pub fn is_empty(&self) -> bool {
        self.location_anomaly.is_none() && self.amount_anomaly.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResponse {
    pub is_anomaly: bool,
    pub confidence: f64,
    pub reason: String,
    pub transaction_id: String,
}

impl AnomalyResponse {
    pub fn from_result(result: DetectionResult, transaction_id: &str) -> Self {
        Self {
            is_anomaly: result.is_anomaly,
            confidence: result.confidence,
            reason: result.reason,
            transaction_id: transaction_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountAnomalyResponse {
    pub is_anomaly: bool,
    pub confidence: f64,
    pub reason: String,
    pub transaction_id: String,
    pub statistics: Option<TransactionStatistics>,
}

impl AmountAnomalyResponse {
    pub fn from_result(
        result: DetectionResult,
        transaction_id: &str,
        statistics: Option<TransactionStatistics>,
    ) -> Self {
        Self {
            is_anomaly: result.is_anomaly,
            confidence: result.confidence,
            reason: result.reason,
            transaction_id: transaction_id.to_string(),
            statistics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedAnomalyResponse {
    pub location_analysis: AnomalyResponse,
    pub amount_analysis: AmountAnomalyResponse,
    pub success: bool,
}
