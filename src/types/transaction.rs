use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Income/expense classification. Stored records with a missing or
/// unrecognised type become `Unknown`, which never joins either cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
    #[serde(other)]
    Unknown,
}

impl TransactionType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Income" => TransactionType::Income,
            "Expense" => TransactionType::Expense,
            _ => TransactionType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::Unknown => "",
        }
    }
}

/// Typed transaction used by the detectors. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub location: Option<Location>,
    pub name: String,
    pub transaction_type: TransactionType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationDocument {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Loosely-shaped transaction as it arrives from storage or an import file.
/// Every field except the id may be absent; `normalize` applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDocument {
    pub transaction_id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<LocationDocument>,
    #[serde(default)]
    pub transaction_name: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

impl TransactionDocument {
    /// Convert into the typed model. `now` stands in for a missing timestamp.
    pub fn normalize(self, now: DateTime<Utc>) -> Transaction {
        let location = self.location.and_then(|loc| match (loc.latitude, loc.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
            _ => None,
        });

        Transaction {
            id: self.transaction_id,
            amount: self.amount.unwrap_or(0.0),
            timestamp: self.date_time.unwrap_or(now),
            location,
            name: self.transaction_name.unwrap_or_default(),
            transaction_type: self
                .transaction_type
                .as_deref()
                .map(TransactionType::parse)
                .unwrap_or(TransactionType::Unknown),
        }
    }
}

/// Account with its embedded transactions, the shape accepted by `import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    pub user_id: String,
    #[serde(default)]
    pub transactions: Vec<TransactionDocument>,
}

/// A stored transaction together with its persisted anomaly flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub account_id: String,
    #[serde(flatten)]
    pub document: TransactionDocument,
    pub location_anomaly: Option<bool>,
    pub amount_anomaly: Option<bool>,
}
