//! Iterative perpendicular-distance line simplification.
//!
//! A repeated left-to-right scan over a working index list. For every
//! consecutive triple the middle point is dropped if it lies closer than the
//! tolerance to the line joining its neighbours; scanning stays at the same
//! position after a drop because the neighbourhood changed. Passes repeat
//! until one removes nothing.
//!
//! This is not recursive Douglas-Peucker. The result is order dependent and
//! not guaranteed minimal, but it only ever removes points, always keeps both
//! endpoints, and is idempotent at a fixed tolerance.

use log::debug;
use crate::geo_utils::perpendicular_distance;
use crate::TracePoint;

/// Configuration for route simplification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimplifyConfig {
    /// Maximum perpendicular deviation (meters) of a removed point.
    /// A tolerance of zero or less disables simplification.
    /// Default: 8.0 meters
    pub tolerance: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self { tolerance: 8.0 }
    }
}

/// Indices of the points retained by simplification, in ascending order.
///
/// Returns every index unchanged when `tolerance <= 0` or there are fewer
/// than three points.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::{TracePoint, simplify::simplify_indices};
///
/// let points = vec![
///     TracePoint::new(0.0, 0.0),
///     TracePoint::new(0.0, 0.001),
///     TracePoint::new(0.0, 0.002),
/// ];
/// assert_eq!(simplify_indices(&points, 10.0), vec![0, 2]);
/// ```
pub fn simplify_indices(points: &[TracePoint], tolerance: f64) -> Vec<usize> {
    let mut kept: Vec<usize> = (0..points.len()).collect();
    if tolerance <= 0.0 || points.len() < 3 {
        return kept;
    }

    let mut passes = 0;
    loop {
        passes += 1;
        let before = kept.len();

        // A dropped point is judged against the last retained one, so the
        // pass rebuilds the list instead of shifting the tail on removal.
        let mut next = Vec::with_capacity(before);
        next.push(kept[0]);
        for w in kept.windows(2).skip(1) {
            let anchor = next[next.len() - 1];
            let offset = perpendicular_distance(&points[anchor], &points[w[1]], &points[w[0]]);
            if offset.abs() < tolerance {
                continue;
            }
            next.push(w[0]);
        }
        next.push(kept[before - 1]);
        kept = next;

        if kept.len() == before {
            break;
        }
    }

    debug!(
        "[Simplify] {} -> {} points in {} passes (tolerance {}m)",
        points.len(),
        kept.len(),
        passes,
        tolerance
    );
    kept
}

/// Simplified copy of `points`, keeping every field of the retained points.
pub fn simplify(points: &[TracePoint], tolerance: f64) -> Vec<TracePoint> {
    simplify_indices(points, tolerance)
        .into_iter()
        .map(|i| points[i])
        .collect()
}
