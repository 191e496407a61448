use tracing::{debug, warn};

use crate::analysis::{geodesic, kmeans};
use crate::detectors::Detector;
use crate::types::anomaly::DetectionResult;
use crate::types::config::LocationThresholds;
use crate::types::transaction::{Location, Transaction};

pub const JUMP_CONFIDENCE: f64 = 0.9;
pub const OUTSIDE_AREA_CONFIDENCE: f64 = 0.8;

/// Flags transactions far from the previous one in a short time, or far from
/// every habitual area the user transacts in.
#[derive(Debug, Clone, Default)]
pub struct LocationDetector {
    thresholds: LocationThresholds,
}

impl LocationDetector {
    pub fn new(thresholds: LocationThresholds) -> Self {
        Self { thresholds }
    }

    /// Distance/time check against the most recent prior transaction.
    fn check_last_jump(&self, current: &Transaction, prior: &[Transaction]) -> Option<DetectionResult> {
        let here = current.location.as_ref()?;
        let last = prior.last()?;
        let there = last.location.as_ref()?;

        let distance = geodesic::distance_km(here, there);
        let hours =
            (current.timestamp - last.timestamp).num_milliseconds() as f64 / 3_600_000.0;
        debug!(
            transaction_id = %current.id,
            previous_id = %last.id,
            distance_km = distance,
            hours,
            "Compared with previous transaction"
        );

        if distance > self.thresholds.max_normal_distance_km
            && hours < self.thresholds.max_normal_hours
        {
            return Some(DetectionResult::anomaly(
                JUMP_CONFIDENCE,
                format!(
                    "Unusual distance ({:.1}km) in short time period ({:.1}h)",
                    distance, hours
                ),
            ));
        }
        None
    }

    /// Distance to the nearest habitual area, once enough located history exists.
    fn check_clusters(
        &self,
        current: &Transaction,
        prior: &[Transaction],
    ) -> Result<Option<DetectionResult>, kmeans::KMeansError> {
        let Some(here) = current.location.as_ref() else {
            return Ok(None);
        };
        let points: Vec<kmeans::Point> = prior
            .iter()
            .filter_map(|t| t.location.as_ref())
            .map(|l| [l.latitude, l.longitude])
            .collect();

        if points.is_empty() || points.len() < self.thresholds.min_clustering_points {
            return Ok(None);
        }

        let k = self.thresholds.max_clusters.min(points.len());
        let fit = kmeans::fit(&points, k)?;
        let nearest = fit
            .centroids
            .iter()
            .map(|c| geodesic::distance_km(here, &Location::new(c[0], c[1])))
            .fold(f64::INFINITY, f64::min);
        debug!(
            transaction_id = %current.id,
            clusters = k,
            iterations = fit.iterations,
            nearest_km = nearest,
            "Compared with habitual areas"
        );

        if nearest > self.thresholds.max_normal_distance_km {
            return Ok(Some(DetectionResult::anomaly(
                OUTSIDE_AREA_CONFIDENCE,
                format!(
                    "Location outside of usual areas (Distance to nearest cluster: {:.1}km)",
                    nearest
                ),
            )));
        }
        Ok(None)
    }
}

impl Detector for LocationDetector {
    fn detect(&self, current: &Transaction, prior: &[Transaction]) -> DetectionResult {
        if current.location.is_none() {
            return DetectionResult::normal("No location data available");
        }

        if let Some(result) = self.check_last_jump(current, prior) {
            return result;
        }

        match self.check_clusters(current, prior) {
            Ok(Some(result)) => result,
            Ok(None) => DetectionResult::normal("Transaction appears normal"),
            Err(e) => {
                warn!(transaction_id = %current.id, error = %e, "Location clustering failed");
                DetectionResult::normal("Could not perform location analysis")
            }
        }
    }
}
