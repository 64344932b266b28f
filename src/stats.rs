//! # Trace Statistics
//!
//! A single forward pass over a trace producing distance, duration, moving
//! time/distance, km and mile splits and point spacing, merged with the
//! elevation summary.
//!
//! Stats are derived from a [`Trace`] once and never updated in place; a
//! changed trace needs a full recomputation.

use log::debug;

use crate::elevation::{analyze_elevation, ElevationConfig, ElevationSummary, HillSegment};
use crate::error::Result;
use crate::geo_utils::haversine_distance;
use crate::{Bounds, Trace};

/// Kilometres to statute miles.
pub const KM_TO_MILES: f64 = 0.6213711922;

/// Meters per second to kilometers per hour.
const MPS_TO_KMH: f64 = 3.6;

/// Configuration for statistics aggregation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatsConfig {
    /// Segments slower than this (km/h) are GPS jitter or standing still and
    /// are left out of moving time and moving distance.
    /// Default: 1.4 km/h
    pub moving_speed_threshold: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { moving_speed_threshold: 1.4 }
    }
}

/// A point where cumulative distance crossed a whole km or mile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitMarker {
    pub point_index: usize,
    /// Minutes per unit since the previous marker, 0 without time data
    pub pace: f64,
}

/// Min/max/average of an optional per-point sample (heart rate, cadence).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleSummary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

impl SampleSummary {
    /// Summary of the given samples, `None` when there are none.
    pub fn from_samples(samples: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::MAX;
        let mut max = f64::MIN;

        for s in samples {
            count += 1;
            sum += s;
            min = min.min(s);
            max = max.max(s);
        }

        (count > 0).then(|| Self { min, max, average: sum / count as f64 })
    }
}

/// Derived statistics of a trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Total distance in meters
    pub distance: f64,
    /// Elapsed seconds, `None` without time data
    pub duration: Option<f64>,
    /// Seconds spent above the moving speed threshold
    pub moving_time: Option<f64>,
    /// Meters covered above the moving speed threshold
    pub moving_distance: Option<f64>,
    /// Moving distance over moving time, km/h
    pub average_speed: Option<f64>,
    /// Sum of positive raw elevation steps (>= 0)
    pub ascent: f64,
    /// Sum of negative raw elevation steps (<= 0)
    pub descent: f64,
    /// (min, max) raw elevation
    pub elevation_range: Option<(f64, f64)>,
    pub hills: Vec<HillSegment>,
    pub km_splits: Vec<SplitMarker>,
    pub mile_splits: Vec<SplitMarker>,
    /// Largest gap between consecutive points, meters
    pub p2p_max: f64,
    /// Mean gap between consecutive points, meters
    pub p2p_average: f64,
    pub bounds: Bounds,
    pub heart_rate: Option<SampleSummary>,
    pub cadence: Option<SampleSummary>,
}

/// Emits a marker each time a cumulative distance, converted to some unit,
/// passes the next whole unit.
struct SplitTracker {
    /// Units per kilometre
    per_km: f64,
    next: f64,
    last_units: f64,
    last_time: f64,
    markers: Vec<SplitMarker>,
}

impl SplitTracker {
    fn new(per_km: f64) -> Self {
        Self { per_km, next: 1.0, last_units: 0.0, last_time: 0.0, markers: Vec::new() }
    }

    fn update(&mut self, index: usize, cum_distance: f64, cum_time: f64) {
        let units = cum_distance / 1000.0 * self.per_km;
        if units >= self.next {
            self.mark(index, units, cum_time);
            // One marker per point even if a single step spans several units
            self.next = units.floor() + 1.0;
        }
    }

    /// Force a closing marker at the last point unless one is already there.
    fn finish(mut self, index: usize, cum_distance: f64, cum_time: f64) -> Vec<SplitMarker> {
        if self.markers.last().map(|m| m.point_index) != Some(index) {
            self.mark(index, cum_distance / 1000.0 * self.per_km, cum_time);
        }
        self.markers
    }

    fn mark(&mut self, index: usize, units: f64, cum_time: f64) {
        let covered = units - self.last_units;
        let elapsed = cum_time - self.last_time;
        let pace = if covered > 0.0 && elapsed > 0.0 {
            elapsed / 60.0 / covered
        } else {
            0.0
        };

        self.markers.push(SplitMarker { point_index: index, pace });
        self.last_units = units;
        self.last_time = cum_time;
    }
}

/// Compute the statistics of a trace in one pass.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::{PathKind, Trace, TracePoint};
/// use trace_analyzer::elevation::ElevationConfig;
/// use trace_analyzer::stats::{compute_stats, StatsConfig};
///
/// let points: Vec<TracePoint> = (0..20).map(|i| TracePoint::new(0.0, i as f64 * 0.001)).collect();
/// let trace = Trace::new(points, PathKind::Route).unwrap();
/// let stats = compute_stats(&trace, &StatsConfig::default(), &ElevationConfig::default()).unwrap();
///
/// assert!((stats.distance - 2115.07).abs() < 0.1);
/// assert_eq!(stats.km_splits.len(), 3);
/// ```
pub fn compute_stats(trace: &Trace, config: &StatsConfig, elevation: &ElevationConfig) -> Result<Stats> {
    let points = trace.points();
    let n = points.len();
    let has_time = trace.has_time();

    let mut segment_distances = Vec::with_capacity(n);
    let mut segment_times = Vec::with_capacity(n);
    segment_distances.push(0.0);
    segment_times.push(0.0);

    let mut distance = 0.0;
    let mut duration = 0.0;
    let mut moving_time = 0.0;
    let mut moving_distance = 0.0;
    let mut p2p_max: f64 = 0.0;

    let mut km = SplitTracker::new(1.0);
    let mut miles = SplitTracker::new(KM_TO_MILES);

    for (i, pair) in points.windows(2).enumerate() {
        let index = i + 1;
        let step = haversine_distance(&pair[0], &pair[1]);
        let seconds = pair[1].time.unwrap_or(0.0);

        distance += step;
        duration += seconds;
        p2p_max = p2p_max.max(step);

        if seconds > 0.0 && step / seconds * MPS_TO_KMH > config.moving_speed_threshold {
            moving_time += seconds;
            moving_distance += step;
        }

        km.update(index, distance, duration);
        miles.update(index, distance, duration);

        segment_distances.push(step);
        segment_times.push(seconds);
    }

    let last = n.saturating_sub(1);
    let km_splits = km.finish(last, distance, duration);
    let mile_splits = miles.finish(last, distance, duration);

    let summary = match trace.elevations() {
        Some(elevations) => analyze_elevation(
            &elevations,
            &segment_distances,
            has_time.then_some(segment_times.as_slice()),
            elevation,
        )?,
        None => ElevationSummary::default(),
    };

    let average_speed = (has_time && moving_time > 0.0).then(|| moving_distance / moving_time * MPS_TO_KMH);

    debug!(
        "[Stats] {:.0}m over {} points, {} hills, {} km splits",
        distance,
        n,
        summary.hills.len(),
        km_splits.len()
    );

    Ok(Stats {
        distance,
        duration: has_time.then_some(duration),
        moving_time: has_time.then_some(moving_time),
        moving_distance: has_time.then_some(moving_distance),
        average_speed,
        ascent: summary.ascent,
        descent: summary.descent,
        elevation_range: summary.range,
        hills: summary.hills,
        km_splits,
        mile_splits,
        p2p_max,
        p2p_average: if n > 1 { distance / (n - 1) as f64 } else { 0.0 },
        bounds: trace.bounds(),
        heart_rate: SampleSummary::from_samples(points.iter().filter_map(|p| p.heart_rate)),
        cadence: SampleSummary::from_samples(points.iter().filter_map(|p| p.cadence)),
    })
}
