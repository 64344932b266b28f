//! # Geographic Utilities
//!
//! Core geographic computation utilities for GPS trace analysis.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`bearing`] | Initial bearing from one point towards another |
//! | [`perpendicular_distance`] | Signed offset of a point from a great-circle line |
//! | [`polyline_length`] | Total length of a trace in meters |
//! | [`compute_bounds`] | Bounding box of a trace |
//! | [`merge_bounds`] | Outer bounding box of several boxes |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use trace_analyzer::{TracePoint, geo_utils};
//!
//! let trace = vec![
//!     TracePoint::new(-0.1278, 51.5074),  // London
//!     TracePoint::new(-0.1290, 51.5080),
//!     TracePoint::new(-0.1300, 51.5090),
//! ];
//!
//! let length = geo_utils::polyline_length(&trace);
//! println!("Trace length: {:.0}m", length);
//!
//! let bounds = geo_utils::compute_bounds(&trace).unwrap();
//! println!("Bounds: {:.4}N to {:.4}N", bounds.min_lat, bounds.max_lat);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere with the WGS84 equatorial
//! radius (6,378,137 m). The error against the ellipsoid is well below GPS
//! noise at the scale of a single activity.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::{BoundingRect, Coord, LineString};
use crate::{Bounds, TracePoint};

/// Sphere radius used for every distance computation, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Symmetric in its arguments and exactly `0.0` for identical points.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::{TracePoint, geo_utils};
///
/// let london = TracePoint::new(-0.1278, 51.5074);
/// let paris = TracePoint::new(2.3522, 48.8566);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 344_000.0).abs() < 2000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &TracePoint, p2: &TracePoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlng = (p2.lng - p1.lng).to_radians() / 2.0;

    let a = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlng.sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `p1` towards `p2` in radians, in `(-π, π]`.
///
/// Measured clockwise from true north. The bearing between two identical
/// points is meaningless; this returns `0.0` for them and callers that care
/// must check first.
#[inline]
pub fn bearing(p1: &TracePoint, p2: &TracePoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlng = (p2.lng - p1.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    y.atan2(x)
}

/// Signed cross-track distance in meters from `p3` to the great-circle line
/// through `p1` and `p2`.
///
/// The sign tells which side of the line `p3` lies on; compare the magnitude
/// against a tolerance. When `p1` and `p2` coincide the line has no direction,
/// so the plain distance from `p1` to `p3` is returned instead.
pub fn perpendicular_distance(p1: &TracePoint, p2: &TracePoint, p3: &TracePoint) -> f64 {
    let d13 = haversine_distance(p1, p3);
    if p1.same_position(p2) {
        return d13;
    }
    let delta = bearing(p1, p3) - bearing(p1, p2);
    ((d13 / EARTH_RADIUS_M).sin() * delta.sin()).clamp(-1.0, 1.0).asin() * EARTH_RADIUS_M
}

/// Calculate the total length of a polyline in meters.
///
/// Empty or single-point input returns 0.0.
pub fn polyline_length(points: &[TracePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Conservative for spatial filtering: the longitude scale shrinks with
/// `cos(latitude)` so the result is never smaller than the latitude degrees.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a trace.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::{TracePoint, geo_utils};
///
/// let trace = vec![
///     TracePoint::new(-0.1300, 51.5000),
///     TracePoint::new(-0.1200, 51.5100),
///     TracePoint::new(-0.1250, 51.5050),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&trace).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[TracePoint]) -> Option<Bounds> {
    let line: LineString<f64> = points.iter().map(|p| Coord { x: p.lng, y: p.lat }).collect();
    let rect = line.bounding_rect()?;

    Some(Bounds {
        min_lng: rect.min().x,
        min_lat: rect.min().y,
        max_lng: rect.max().x,
        max_lat: rect.max().y,
    })
}

/// Element-wise min/max over several bounding boxes.
///
/// Returns `None` when given no boxes.
pub fn merge_bounds(boxes: &[Bounds]) -> Option<Bounds> {
    let (first, rest) = boxes.split_first()?;

    Some(rest.iter().fold(*first, |acc, b| Bounds {
        min_lng: acc.min_lng.min(b.min_lng),
        min_lat: acc.min_lat.min(b.min_lat),
        max_lng: acc.max_lng.max(b.max_lng),
        max_lat: acc.max_lat.max(b.max_lat),
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================
