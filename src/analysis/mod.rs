//! Numeric building blocks shared by the detectors.

pub mod geodesic;
pub mod kmeans;
pub mod lof;
pub mod stats;
