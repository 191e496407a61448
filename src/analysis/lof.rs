use thiserror::Error;

use crate::analysis::stats;

/// Added to the mean reachability distance so duplicate points keep a finite
/// density.
const DENSITY_EPSILON: f64 = 1e-10;

#[derive(Debug, Error, PartialEq)]
pub enum LofError {
    #[error("local outlier factor needs at least 3 samples, got {0}")]
    TooFewSamples(usize),
    #[error("sample {0} is not a finite number")]
    NonFinite(usize),
    #[error("contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),
}

/// Local Outlier Factor over one-dimensional samples.
#[derive(Debug, Clone)]
pub struct LocalOutlierFactor {
    pub neighbors: usize,
    pub contamination: f64,
}

#[derive(Debug, Clone)]
pub struct LofFit {
    /// Negated LOF per sample; lower means more isolated.
    pub scores: Vec<f64>,
    /// Scores strictly below this are outliers.
    pub threshold: f64,
    pub outliers: Vec<bool>,
    /// Neighbourhood size actually used.
    pub neighbors: usize,
}

impl LocalOutlierFactor {
    pub fn new(neighbors: usize, contamination: f64) -> Self {
        Self {
            neighbors,
            contamination,
        }
    }

    /// Score every sample against the rest and mark the outliers.
    ///
    /// The neighbourhood is capped at `n - 2` so that no neighbourhood spans
    /// the whole sample; otherwise every point shares the same reference set
    /// and densities stop being local.
    pub fn fit_predict(&self, samples: &[f64]) -> Result<LofFit, LofError> {
        let n = samples.len();
        if n < 3 {
            return Err(LofError::TooFewSamples(n));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(LofError::InvalidContamination(self.contamination));
        }
        if let Some(i) = samples.iter().position(|v| !v.is_finite()) {
            return Err(LofError::NonFinite(i));
        }

        let k = self.neighbors.clamp(1, n - 2);

        let neighborhoods: Vec<Vec<(usize, f64)>> =
            (0..n).map(|i| k_nearest(samples, i, k)).collect();
        let k_distance: Vec<f64> = neighborhoods
            .iter()
            .map(|hood| hood.last().map(|&(_, d)| d).unwrap_or(0.0))
            .collect();

        let lrd: Vec<f64> = neighborhoods
            .iter()
            .map(|hood| {
                let reach: f64 = hood.iter().map(|&(j, d)| d.max(k_distance[j])).sum();
                1.0 / (reach / k as f64 + DENSITY_EPSILON)
            })
            .collect();

        let scores: Vec<f64> = neighborhoods
            .iter()
            .enumerate()
            .map(|(i, hood)| {
                let ratio: f64 = hood.iter().map(|&(j, _)| lrd[j] / lrd[i]).sum();
                -(ratio / k as f64)
            })
            .collect();

        let threshold = stats::percentile(&scores, 100.0 * self.contamination)
            .ok_or(LofError::TooFewSamples(n))?;
        let outliers = scores.iter().map(|&s| s < threshold).collect();

        Ok(LofFit {
            scores,
            threshold,
            outliers,
            neighbors: k,
        })
    }
}

/// The `k` samples closest to `samples[i]`, excluding itself. Ties keep input
/// order.
fn k_nearest(samples: &[f64], i: usize, k: usize) -> Vec<(usize, f64)> {
    let mut distances: Vec<(usize, f64)> = samples
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(j, v)| (j, (v - samples[i]).abs()))
        .collect();
    distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    distances.truncate(k);
    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lof() -> LocalOutlierFactor {
        LocalOutlierFactor::new(5, 0.1)
    }

    #[test]
    fn large_value_is_outlier() {
        let fit = lof().fit_predict(&[10.0, 12.0, 11.0, 9.0, 13.0, 500.0]).unwrap();
        assert_eq!(fit.outliers, vec![false, false, false, false, false, true]);
        assert_eq!(fit.neighbors, 4);
    }

    #[test]
    fn small_value_is_outlier() {
        let fit = lof().fit_predict(&[10.0, 12.0, 11.0, 9.0, 13.0, 1.0]).unwrap();
        assert!(fit.outliers[5]);
    }

    #[test]
    fn typical_value_is_inlier() {
        let fit = lof().fit_predict(&[10.0, 12.0, 11.0, 9.0, 13.0, 11.0]).unwrap();
        assert!(!fit.outliers[5]);
    }

    #[test]
    fn larger_sample_uses_full_neighbourhood() {
        let samples = [10.0, 12.0, 11.0, 9.0, 13.0, 10.0, 12.0, 11.0, 500.0];
        let fit = lof().fit_predict(&samples).unwrap();
        assert_eq!(fit.neighbors, 5);
        assert!(fit.outliers[8]);
        assert_eq!(fit.outliers.iter().filter(|&&o| o).count(), 1);
    }

    #[test]
    fn constant_sample_has_no_outliers() {
        let fit = lof().fit_predict(&[100.0; 6]).unwrap();
        assert!(fit.outliers.iter().all(|&o| !o));
        for s in &fit.scores {
            assert!((s + 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(lof().fit_predict(&[1.0, 2.0]).unwrap_err(), LofError::TooFewSamples(2));
        assert_eq!(
            lof().fit_predict(&[1.0, f64::NAN, 3.0, 4.0]).unwrap_err(),
            LofError::NonFinite(1)
        );
        assert_eq!(
            LocalOutlierFactor::new(5, 0.0).fit_predict(&[1.0, 2.0, 3.0]).unwrap_err(),
            LofError::InvalidContamination(0.0)
        );
    }
}
