//! Tests for geo_utils module

use trace_analyzer::geo_utils::*;
use trace_analyzer::{Bounds, TracePoint};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[test]
fn test_haversine_distance_symmetric() {
    let london = TracePoint::new(-0.1278, 51.5074);
    let paris = TracePoint::new(2.3522, 48.8566);
    assert_eq!(haversine_distance(&london, &paris), haversine_distance(&paris, &london));
}

#[test]
fn test_one_millidegree_of_latitude() {
    let a = TracePoint::new(0.0, 0.0);
    let b = TracePoint::new(0.0, 0.001);
    assert!(approx_eq(haversine_distance(&a, &b), 111.319, 0.001));
}

#[test]
fn test_bearing_cardinal_directions() {
    let origin = TracePoint::new(0.0, 0.0);
    assert!(approx_eq(bearing(&origin, &TracePoint::new(0.0, 1.0)), 0.0, 1e-9));
    assert!(approx_eq(bearing(&origin, &TracePoint::new(1.0, 0.0)), std::f64::consts::FRAC_PI_2, 1e-9));
    assert!(approx_eq(bearing(&origin, &TracePoint::new(-1.0, 0.0)), -std::f64::consts::FRAC_PI_2, 1e-9));
}

#[test]
fn test_perpendicular_distance_sides() {
    let a = TracePoint::new(0.0, 0.0);
    let b = TracePoint::new(0.0, 0.01);
    let east = TracePoint::new(0.0001, 0.005);
    let west = TracePoint::new(-0.0001, 0.005);

    let d_east = perpendicular_distance(&a, &b, &east);
    let d_west = perpendicular_distance(&a, &b, &west);
    assert!(approx_eq(d_east.abs(), 11.13, 0.05));
    assert!(approx_eq(d_east, -d_west, 1e-6));
}

#[test]
fn test_perpendicular_distance_degenerate_line() {
    let a = TracePoint::new(0.0, 0.0);
    let c = TracePoint::new(0.0, 0.001);
    assert_eq!(perpendicular_distance(&a, &a, &c), haversine_distance(&a, &c));
}

#[test]
fn test_polyline_length() {
    let line: Vec<TracePoint> = (0..11).map(|i| TracePoint::new(0.0, i as f64 * 0.001)).collect();
    assert!(approx_eq(polyline_length(&line), 1113.19, 0.01));
    assert_eq!(polyline_length(&line[..1]), 0.0);
}

#[test]
fn test_compute_bounds_empty() {
    assert!(compute_bounds(&[]).is_none());
}

#[test]
fn test_merge_bounds() {
    let a = Bounds { min_lng: 0.0, min_lat: 0.0, max_lng: 1.0, max_lat: 1.0 };
    let b = Bounds { min_lng: 0.5, min_lat: -1.0, max_lng: 2.0, max_lat: 0.5 };
    let merged = merge_bounds(&[a, b]).unwrap();
    assert_eq!(merged, Bounds { min_lng: 0.0, min_lat: -1.0, max_lng: 2.0, max_lat: 1.0 });
    assert_eq!(merged.center(), TracePoint::new(1.0, 0.0));
}
