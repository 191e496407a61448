use thiserror::Error;

pub type Point = [f64; 2];

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Error, PartialEq)]
pub enum KMeansError {
    #[error("cannot cluster an empty point set")]
    Empty,
    #[error("cannot form {k} clusters from {n} points")]
    InvalidK { k: usize, n: usize },
    #[error("point {0} has non-finite coordinates")]
    NonFinite(usize),
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<Point>,
    /// Lloyd rounds run before the centroids settled or the cap was hit.
    pub iterations: usize,
}

/// Lloyd's k-means in the plane.
///
/// Seeding is deterministic: the first point becomes the first centroid and
/// every following centroid is the point farthest from those already chosen.
/// A cluster that loses all its members keeps its previous centroid.
pub fn fit(points: &[Point], k: usize) -> Result<KMeansFit, KMeansError> {
    if points.is_empty() {
        return Err(KMeansError::Empty);
    }
    if k == 0 || k > points.len() {
        return Err(KMeansError::InvalidK { k, n: points.len() });
    }
    if let Some(i) = points
        .iter()
        .position(|p| !(p[0].is_finite() && p[1].is_finite()))
    {
        return Err(KMeansError::NonFinite(i));
    }

    let mut centroids = seed(points, k);
    let mut labels = vec![0; points.len()];
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(&centroids, p).0;
        }

        let mut sums = vec![[0.0, 0.0]; k];
        let mut counts = vec![0usize; k];
        for (&label, p) in labels.iter().zip(points) {
            sums[label][0] += p[0];
            sums[label][1] += p[1];
            counts[label] += 1;
        }

        let mut shift = 0.0;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let updated = [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64];
            shift += sq_dist(&centroids[c], &updated);
            centroids[c] = updated;
        }

        if shift <= TOLERANCE * TOLERANCE {
            break;
        }
    }

    Ok(KMeansFit {
        centroids,
        iterations,
    })
}

fn seed(points: &[Point], k: usize) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[0]);
    while centroids.len() < k {
        let farthest = points
            .iter()
            .map(|p| (p, nearest(&centroids, p).1))
            .fold((&points[0], f64::NEG_INFINITY), |best, cand| {
                if cand.1 > best.1 {
                    cand
                } else {
                    best
                }
            })
            .0;
        centroids.push(*farthest);
    }
    centroids
}

/// Index of and squared distance to the closest centroid.
fn nearest(centroids: &[Point], p: &Point) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, sq_dist(c, p)))
        .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best })
}

fn sq_dist(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}
