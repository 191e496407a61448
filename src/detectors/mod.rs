pub mod amount;
pub mod location;

pub use amount::AmountDetector;
pub use location::LocationDetector;

use crate::types::anomaly::DetectionResult;
use crate::types::transaction::Transaction;

/// A stateless scorer over one transaction and the transactions strictly
/// before it, oldest first. Implementations never fail; problems degrade to
/// a non-anomalous result with an explanatory reason.
pub trait Detector {
    fn detect(&self, current: &Transaction, prior: &[Transaction]) -> DetectionResult;
}
