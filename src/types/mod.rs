pub mod anomaly;
pub mod config;
pub mod transaction;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_response_uses_camel_case() {
        let resp = anomaly::AnomalyResponse {
            is_anomaly: true,
            confidence: 0.9,
            reason: "far away".to_string(),
            transaction_id: "t1".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"isAnomaly\":true"));
        assert!(json.contains("\"transactionId\":\"t1\""));
    }

    #[test]
    fn statistics_omit_empty_partition() {
        let stats = anomaly::TransactionStatistics {
            income_median: Some(1000.0),
            income_min: Some(900.0),
            income_max: Some(1100.0),
            income_count: Some(3),
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"incomeMedian\""));
        assert!(!json.contains("income_median"));
        assert!(!json.contains("expense"));
    }

    #[test]
    fn amount_response_serializes_null_statistics() {
        let resp = anomaly::AmountAnomalyResponse {
            is_anomaly: false,
            confidence: 0.0,
            reason: "Insufficient historical data".to_string(),
            transaction_id: "t1".to_string(),
            statistics: None,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value["statistics"].is_null());
    }

    #[test]
    fn anomaly_flags_roundtrip() {
        let json = r#"{"locationAnomaly": true}"#;
        let flags: anomaly::AnomalyFlags = serde_json::from_str(json).unwrap();
        assert_eq!(flags.location_anomaly, Some(true));
        assert_eq!(flags.amount_anomaly, None);
        assert!(!flags.is_empty());
    }

    #[test]
    fn transaction_serializes_type_name() {
        let tx = transaction::Transaction {
            id: "t1".to_string(),
            amount: 12.0,
            timestamp: chrono::Utc::now(),
            location: None,
            name: "Coffee".to_string(),
            transaction_type: transaction::TransactionType::Expense,
        };
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"transactionType\":\"Expense\""));
    }
}
