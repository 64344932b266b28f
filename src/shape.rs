//! # Shape Classification
//!
//! Classifies a trace as out-and-back, circular, one-way or hybrid, and
//! decides the rotational direction of circular and one-way traces.
//!
//! ## Algorithm
//! 1. Loop closure: the end lies within `closure_factor × match_distance`
//!    of the start
//! 2. Point matching: a point is matched when any point at least
//!    `match_buffer` indices later lies within `match_distance`. Candidates
//!    come from an R-tree over all points; the buffer keeps neighbours from
//!    matching each other
//! 3. `percent_shared = matched / n × 200` since at most half the points of
//!    a retraced path can find a later partner
//! 4. Direction: bearings from the start to evenly strided points are
//!    unwrapped across ±π and swept; a positive net turn is clockwise

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{Result, TraceError};
use crate::geo_utils::{bearing, haversine_distance, meters_to_degrees};
use crate::TracePoint;

/// Overall shape of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    OutAndBack,
    Circular,
    OneWay,
    Hybrid,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::OutAndBack => "out-and-back",
            Shape::Circular => "circular",
            Shape::OneWay => "one-way",
            Shape::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotational direction of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Clockwise,
    AntiClockwise,
    /// Not evaluated for this shape, or the bearing sweep was too narrow
    Indeterminate,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Clockwise => "clockwise",
            Direction::AntiClockwise => "anti-clockwise",
            Direction::Indeterminate => "",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for shape and direction classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShapeConfig {
    /// Maximum distance (meters) for two points to count as matched.
    /// Default: 25.0 meters
    pub match_distance: f64,
    /// Index gap before a later point may match an earlier one.
    /// Default: 50
    pub match_buffer: usize,
    /// Start/end separation, as a multiple of `match_distance`, below which
    /// the trace returns to its start.
    /// Default: 10.0
    pub closure_factor: f64,
    /// Shared percentage above which a trace is out-and-back.
    /// Default: 90.0
    pub out_and_back_shared: f64,
    /// Shared percentage below which a trace is circular or one-way.
    /// Default: 10.0
    pub unshared: f64,
    /// Number of bearing samples taken along the trace for direction.
    /// Default: 20
    pub direction_samples: usize,
    /// Minimum bearing sweep (radians) for a direction to be reported.
    /// Default: π/2
    pub min_bearing_sweep: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            match_distance: 25.0,
            match_buffer: 50,
            closure_factor: 10.0,
            out_and_back_shared: 90.0,
            unshared: 10.0,
            direction_samples: 20,
            min_bearing_sweep: FRAC_PI_2,
        }
    }
}

impl ShapeConfig {
    /// Reject settings that make every point match itself or disable sampling.
    pub fn validate(&self) -> Result<()> {
        if self.match_distance.is_nan() || self.match_distance <= 0.0 {
            return Err(TraceError::InvalidConfiguration(format!(
                "match distance must be positive, got {}",
                self.match_distance
            )));
        }
        if self.match_buffer == 0 {
            return Err(TraceError::InvalidConfiguration(
                "match buffer must be at least 1 point".to_string(),
            ));
        }
        if self.closure_factor.is_nan() || self.closure_factor <= 0.0 {
            return Err(TraceError::InvalidConfiguration(format!(
                "closure factor must be positive, got {}",
                self.closure_factor
            )));
        }
        if self.direction_samples == 0 {
            return Err(TraceError::InvalidConfiguration(
                "direction needs at least 1 bearing sample".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// R-tree Indexed Point for Spatial Queries
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lng: f64,
    lat: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.lng - point[0];
        let dlat = self.lat - point[1];
        dlng * dlng + dlat * dlat
    }
}

fn build_rtree(points: &[TracePoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint { idx: i, lng: p.lng, lat: p.lat })
        .collect();
    RTree::bulk_load(indexed)
}

// =============================================================================
// Shape
// =============================================================================

/// Whether the trace ends near where it started.
pub fn returns_to_start(points: &[TracePoint], config: &ShapeConfig) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            haversine_distance(first, last) < config.match_distance * config.closure_factor
        }
        _ => false,
    }
}

/// Percentage of points retraced later in the trace (0–200 scale folded so a
/// fully retraced out-and-back approaches 100).
pub fn percent_shared(points: &[TracePoint], config: &ShapeConfig) -> f64 {
    let n = points.len();
    let limit = n.saturating_sub(1 + config.match_buffer);
    if limit == 0 {
        return 0.0;
    }

    let tree = build_rtree(points);
    // Pad the degree window so the haversine check is the only filter
    let margin = 1.1;

    let matched = (0..limit)
        .filter(|&i| {
            let p = &points[i];
            let radius = meters_to_degrees(config.match_distance, p.lat) * margin;
            tree.locate_within_distance([p.lng, p.lat], radius * radius).any(|candidate| {
                candidate.idx >= i + config.match_buffer
                    && haversine_distance(p, &points[candidate.idx]) < config.match_distance
            })
        })
        .count();

    matched as f64 / n as f64 * 100.0 * 2.0
}

/// Classify the overall shape of a trace.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::{TracePoint, shape::{classify_shape, Shape, ShapeConfig}};
///
/// let line: Vec<TracePoint> = (0..100).map(|i| TracePoint::new(0.0, i as f64 * 0.001)).collect();
/// assert_eq!(classify_shape(&line, &ShapeConfig::default()), Shape::OneWay);
/// ```
pub fn classify_shape(points: &[TracePoint], config: &ShapeConfig) -> Shape {
    let closed = returns_to_start(points, config);
    let shared = percent_shared(points, config);
    debug!("[Shape] closed={} shared={:.1}%", closed, shared);

    if shared > config.out_and_back_shared {
        Shape::OutAndBack
    } else if shared < config.unshared {
        if closed {
            Shape::Circular
        } else {
            Shape::OneWay
        }
    } else {
        Shape::Hybrid
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Rotational direction for circular and one-way shapes.
///
/// Any other shape has no meaningful direction and yields
/// [`Direction::Indeterminate`].
pub fn classify_direction(points: &[TracePoint], shape: Shape, config: &ShapeConfig) -> Direction {
    match shape {
        Shape::Circular | Shape::OneWay => bearing_sweep(points, config),
        Shape::OutAndBack | Shape::Hybrid => Direction::Indeterminate,
    }
}

/// Sweep of bearings from the start point to strided points along the trace.
pub fn bearing_sweep(points: &[TracePoint], config: &ShapeConfig) -> Direction {
    let Some(start) = points.first() else {
        return Direction::Indeterminate;
    };
    let stride = (points.len() / config.direction_samples.max(1)).max(1);

    let mut offset = 0.0;
    let mut previous: Option<(f64, f64)> = None; // (raw, unwrapped)
    let mut max = f64::MIN;
    let mut min = f64::MAX;
    let mut turns: i64 = 0;

    for p in points.iter().skip(stride).step_by(stride) {
        if p.same_position(start) {
            continue;
        }
        let raw = bearing(start, p);

        let unwrapped = match previous {
            Some((prev_raw, prev_unwrapped)) => {
                let jump = raw - prev_raw;
                if jump > FRAC_PI_2 {
                    offset -= 2.0 * PI;
                } else if jump < -FRAC_PI_2 {
                    offset += 2.0 * PI;
                }
                let unwrapped = raw + offset;
                let delta = unwrapped - prev_unwrapped;
                if delta > 0.0 {
                    turns += 1;
                } else if delta < 0.0 {
                    turns -= 1;
                }
                unwrapped
            }
            None => raw,
        };

        max = max.max(unwrapped);
        min = min.min(unwrapped);
        previous = Some((raw, unwrapped));
    }

    if previous.is_none() || max - min < config.min_bearing_sweep {
        return Direction::Indeterminate;
    }

    match turns.signum() {
        1 => Direction::Clockwise,
        -1 => Direction::AntiClockwise,
        _ => Direction::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on a circle around (0, 0), starting due north and moving
    /// clockwise on a north-up map.
    fn clockwise_circle(n: usize, radius_deg: f64) -> Vec<TracePoint> {
        (0..n)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / n as f64;
                TracePoint::new(radius_deg * t.sin(), radius_deg * t.cos())
            })
            .collect()
    }

    fn out_and_back(n_each_way: usize) -> Vec<TracePoint> {
        let out: Vec<TracePoint> = (0..n_each_way)
            .map(|i| TracePoint::new(0.0, i as f64 * 0.00005))
            .collect();
        let back = out.iter().rev().map(|p| TracePoint::new(0.00002, p.lat));
        out.iter().copied().chain(back).collect()
    }

    #[test]
    fn test_circle_is_circular() {
        let circle = clockwise_circle(100, 0.0045);
        let config = ShapeConfig::default();
        assert!(returns_to_start(&circle, &config));
        assert!(percent_shared(&circle, &config) < 10.0);
        assert_eq!(classify_shape(&circle, &config), Shape::Circular);
    }

    #[test]
    fn test_out_and_back() {
        let trace = out_and_back(500);
        let config = ShapeConfig::default();
        assert!(percent_shared(&trace, &config) > 90.0);
        assert_eq!(classify_shape(&trace, &config), Shape::OutAndBack);
    }

    #[test]
    fn test_straight_line_is_one_way() {
        let line: Vec<TracePoint> = (0..200).map(|i| TracePoint::new(0.0, i as f64 * 0.0002)).collect();
        let config = ShapeConfig::default();
        assert!(!returns_to_start(&line, &config));
        assert_eq!(percent_shared(&line, &config), 0.0);
        assert_eq!(classify_shape(&line, &config), Shape::OneWay);
    }

    #[test]
    fn test_partially_retraced_is_hybrid() {
        // Lollipop: out along a stem, around a loop, back down half the stem
        let mut trace: Vec<TracePoint> = (0..200).map(|i| TracePoint::new(0.0, i as f64 * 0.00005)).collect();
        let top = 199.0 * 0.00005;
        let loop_points = (1..200).map(|k| {
            let t = 2.0 * PI * k as f64 / 200.0;
            TracePoint::new(0.002 * t.sin(), top + 0.002 * (1.0 - t.cos()))
        });
        trace.extend(loop_points);
        trace.extend((100..200).rev().map(|i| TracePoint::new(0.00001, i as f64 * 0.00005)));

        let config = ShapeConfig::default();
        let shared = percent_shared(&trace, &config);
        assert!(shared > 10.0 && shared < 90.0, "shared = {shared}");
        assert_eq!(classify_shape(&trace, &config), Shape::Hybrid);
    }

    #[test]
    fn test_short_trace_has_no_matches() {
        let config = ShapeConfig::default();
        let short = vec![TracePoint::new(0.0, 0.0), TracePoint::new(0.0, 0.0001)];
        assert_eq!(percent_shared(&short, &config), 0.0);
    }

    #[test]
    fn test_clockwise_circle_direction() {
        let circle = clockwise_circle(100, 0.0045);
        let config = ShapeConfig::default();
        assert_eq!(bearing_sweep(&circle, &config), Direction::Clockwise);
        assert_eq!(classify_direction(&circle, Shape::Circular, &config), Direction::Clockwise);
    }

    #[test]
    fn test_anticlockwise_circle_direction() {
        let mut circle = clockwise_circle(100, 0.0045);
        circle[1..].reverse();
        let config = ShapeConfig::default();
        assert_eq!(bearing_sweep(&circle, &config), Direction::AntiClockwise);
    }

    #[test]
    fn test_straight_line_direction_indeterminate() {
        let line: Vec<TracePoint> = (0..100).map(|i| TracePoint::new(i as f64 * 0.001, 0.0)).collect();
        assert_eq!(bearing_sweep(&line, &ShapeConfig::default()), Direction::Indeterminate);
    }

    #[test]
    fn test_direction_not_evaluated_for_out_and_back() {
        let circle = clockwise_circle(100, 0.0045);
        let config = ShapeConfig::default();
        assert_eq!(classify_direction(&circle, Shape::OutAndBack, &config), Direction::Indeterminate);
        assert_eq!(classify_direction(&circle, Shape::Hybrid, &config), Direction::Indeterminate);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ShapeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_match_buffer_rejected() {
        let config = ShapeConfig { match_buffer: 0, ..ShapeConfig::default() };
        assert!(matches!(config.validate(), Err(TraceError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_positive_closure_factor_rejected() {
        for closure_factor in [0.0, -1.0, f64::NAN] {
            let config = ShapeConfig { closure_factor, ..ShapeConfig::default() };
            assert!(matches!(config.validate(), Err(TraceError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_zero_direction_samples_rejected() {
        let config = ShapeConfig { direction_samples: 0, ..ShapeConfig::default() };
        assert!(matches!(config.validate(), Err(TraceError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_positive_match_distance_rejected() {
        let config = ShapeConfig { match_distance: 0.0, ..ShapeConfig::default() };
        assert!(matches!(config.validate(), Err(TraceError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Shape::OutAndBack.to_string(), "out-and-back");
        assert_eq!(Direction::AntiClockwise.to_string(), "anti-clockwise");
    }
}
