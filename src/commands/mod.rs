pub mod analyze;
pub mod config;
pub mod transactions;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes_status_and_detail() {
        let err = analyze::ErrorResponse {
            status: 404,
            detail: "Transaction not found".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"status\":404"));
        assert!(json.contains("\"detail\":\"Transaction not found\""));
    }
}
