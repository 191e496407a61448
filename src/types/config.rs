use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationThresholds {
    /// Distance in km beyond which a move is considered unusual.
    pub max_normal_distance_km: f64,
    /// Time window in hours inside which a long move is suspicious.
    pub max_normal_hours: f64,
    pub min_clustering_points: usize,
    pub max_clusters: usize,
}

impl Default for LocationThresholds {
    fn default() -> Self {
        Self {
            max_normal_distance_km: 50.0,
            max_normal_hours: 24.0,
            min_clustering_points: 5,
            max_clusters: 3,
        }
    }
}

/// Smallest usable `min_transactions`: the cohort plus the scored amount must
/// give the outlier test at least three samples.
pub const MIN_AMOUNT_HISTORY: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountThresholds {
    pub min_transactions: usize,
    pub neighbors: usize,
    /// Expected fraction of outliers in the sample.
    pub contamination: f64,
}

impl Default for AmountThresholds {
    fn default() -> Self {
        Self {
            min_transactions: 5,
            neighbors: 5,
            contamination: 0.1,
        }
    }
}

/// Tunables for both detectors. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    pub location: LocationThresholds,
    pub amount: AmountThresholds,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        let loc = &self.location;
        if !(loc.max_normal_distance_km.is_finite() && loc.max_normal_distance_km >= 0.0) {
            return Err(format!(
                "maxNormalDistanceKm must be a non-negative number, got {}",
                loc.max_normal_distance_km
            ));
        }
        if !(loc.max_normal_hours.is_finite() && loc.max_normal_hours >= 0.0) {
            return Err(format!(
                "maxNormalHours must be a non-negative number, got {}",
                loc.max_normal_hours
            ));
        }
        if loc.max_clusters == 0 {
            return Err("maxClusters must be at least 1".to_string());
        }
        if loc.min_clustering_points == 0 {
            return Err("minClusteringPoints must be at least 1".to_string());
        }
        let amount = &self.amount;
        if amount.min_transactions < MIN_AMOUNT_HISTORY {
            return Err(format!(
                "minTransactions must be at least {}, got {}",
                MIN_AMOUNT_HISTORY, amount.min_transactions
            ));
        }
        if amount.neighbors == 0 {
            return Err("neighbors must be at least 1".to_string());
        }
        if !(amount.contamination > 0.0 && amount.contamination <= 0.5) {
            return Err(format!(
                "contamination must be in (0, 0.5], got {}",
                amount.contamination
            ));
        }
        Ok(())
    }
}
