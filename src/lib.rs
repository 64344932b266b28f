//! # Trace Analyzer
//!
//! Geometry and statistics engine for GPS traces.
//!
//! This library provides:
//! - Iterative perpendicular-distance simplification of drawn routes
//! - Shape classification (loop, out-and-back, one-way, hybrid) and direction
//! - Distance, moving time, km/mile splits, ascent/descent and hill detection
//! - Colour-tagged segments and line features for map rendering
//!
//! ## Features
//!
//! - **`parallel`** - Analyse batches of traces in parallel with rayon
//! - **`serde`** - Serialize configuration and results
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trace_analyzer::{analyze, AnalysisConfig, PathKind, TraceInput};
//!
//! let points: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 * 0.0005, 51.5)).collect();
//! let input = TraceInput::new(points, PathKind::Route);
//!
//! let analysis = analyze(&input, &AnalysisConfig::default()).unwrap();
//! println!(
//!     "{} points kept, {:.0}m, {}",
//!     analysis.trace.len(),
//!     analysis.stats.distance,
//!     analysis.shape
//! );
//! ```

use geo::Coord;
use log::{debug, info, warn};

pub mod error;
pub use error::{OptionExt, Result, TraceError};

// Distance, bearing and bounding box math
pub mod geo_utils;

// Route simplification
pub mod simplify;
pub use simplify::{simplify_indices, SimplifyConfig};

// Smoothing, slopes and hills
pub mod elevation;
pub use elevation::{ElevationConfig, ElevationSource, HillSegment, Smoothing};

// Loop / out-and-back / one-way classification
pub mod shape;
pub use shape::{Direction, Shape, ShapeConfig};

// Distance, time and split aggregation
pub mod stats;
pub use stats::{SplitMarker, Stats, StatsConfig};

// Colour-tagged segments and map features
pub mod segments;
pub use segments::{ColourConfig, ColourPolicy, ColouredSegment, FeatureCollection, LineFeature, Rgb};

// ============================================================================
// Core Types
// ============================================================================

/// Round a coordinate to 6 decimal places (~0.11 m).
#[inline]
fn round_coordinate(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// A single sample of a trace.
///
/// Coordinates are rounded to 6 decimal places on construction. `time` is the
/// number of seconds elapsed since the previous point, not a timestamp.
///
/// # Example
/// ```
/// use trace_analyzer::TracePoint;
/// let point = TracePoint::new(-0.1278, 51.5074).with_elevation(35.0);
/// assert_eq!(point.elev, Some(35.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TracePoint {
    pub lng: f64,
    pub lat: f64,
    pub elev: Option<f64>,
    pub time: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
}

impl TracePoint {
    /// Create a point from longitude and latitude.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng: round_coordinate(lng),
            lat: round_coordinate(lat),
            elev: None,
            time: None,
            heart_rate: None,
            cadence: None,
        }
    }

    pub fn with_elevation(mut self, elev: f64) -> Self {
        self.elev = Some(elev);
        self
    }

    /// Seconds elapsed since the previous point.
    pub fn with_time(mut self, seconds: f64) -> Self {
        self.time = Some(seconds);
        self
    }

    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub fn with_cadence(mut self, rpm: f64) -> Self {
        self.cadence = Some(rpm);
        self
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// Same longitude and latitude, ignoring samples.
    #[inline]
    pub fn same_position(&self, other: &TracePoint) -> bool {
        self.lng == other.lng && self.lat == other.lat
    }
}

impl From<&TracePoint> for Coord<f64> {
    fn from(p: &TracePoint) -> Self {
        Coord { x: p.lng, y: p.lat }
    }
}

/// Origin of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathKind {
    /// Drawn or imported; no time, heart rate or cadence. Always simplified.
    Route,
    /// Recorded by a device; never simplified.
    Track,
}

/// Bounding box of a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> TracePoint {
        TracePoint::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

/// An ordered sequence of at least two points with its [`PathKind`].
///
/// The trace owns its points; statistics and segments refer back to them by
/// index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Trace {
    points: Vec<TracePoint>,
    kind: PathKind,
    bounds: Bounds,
}

impl Trace {
    pub const MIN_POINTS: usize = 2;

    /// Validate points into a trace.
    ///
    /// Fails with [`TraceError::InvalidTrace`] for fewer than two points and
    /// [`TraceError::InvalidInput`] for out-of-range coordinates. Time, heart
    /// rate and cadence are dropped from routes.
    pub fn new(mut points: Vec<TracePoint>, kind: PathKind) -> Result<Self> {
        if points.len() < Self::MIN_POINTS {
            return Err(TraceError::InvalidTrace {
                point_count: points.len(),
                minimum_required: Self::MIN_POINTS,
            });
        }
        for p in points.iter_mut() {
            p.lng = round_coordinate(p.lng);
            p.lat = round_coordinate(p.lat);
        }
        if let Some(i) = points.iter().position(|p| !p.is_valid()) {
            return Err(TraceError::InvalidInput(format!("point {i} has invalid coordinates")));
        }

        if kind == PathKind::Route {
            let mut dropped = false;
            for p in points.iter_mut() {
                dropped |= p.time.is_some() || p.heart_rate.is_some() || p.cadence.is_some();
                p.time = None;
                p.heart_rate = None;
                p.cadence = None;
            }
            if dropped {
                warn!("[TraceAnalyzer] Route carried time/heart rate/cadence samples; dropped");
            }
        }

        let bounds = geo_utils::compute_bounds(&points).ok_or_invalid_trace(points.len(), Self::MIN_POINTS)?;
        Ok(Self { points, kind, bounds })
    }

    /// Build a trace from a parallel-array input record.
    pub fn from_input(input: &TraceInput) -> Result<Self> {
        let n = input.points.len();
        let optional = [
            ("elevations", &input.elevations),
            ("times", &input.times),
            ("heart rate", &input.heart_rate),
            ("cadence", &input.cadence),
        ];
        for (name, values) in optional {
            if let Some(values) = values {
                if values.len() != n {
                    return Err(TraceError::InvalidInput(format!(
                        "{} {} for {} points",
                        values.len(),
                        name,
                        n
                    )));
                }
            }
        }

        let sample = |values: &Option<Vec<f64>>, i: usize| values.as_ref().map(|v| v[i]);
        let points = input
            .points
            .iter()
            .enumerate()
            .map(|(i, &(lng, lat))| TracePoint {
                elev: sample(&input.elevations, i),
                time: sample(&input.times, i),
                heart_rate: sample(&input.heart_rate, i),
                cadence: sample(&input.cadence, i),
                ..TracePoint::new(lng, lat)
            })
            .collect();

        Self::new(points, input.kind)
    }

    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a trace holds at least two points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Elevation of every point, or `None` if any point lacks one.
    pub fn elevations(&self) -> Option<Vec<f64>> {
        self.points.iter().map(|p| p.elev).collect()
    }

    /// Whether any point carries elapsed time.
    pub fn has_time(&self) -> bool {
        self.points.iter().any(|p| p.time.is_some())
    }

    /// Fill in missing elevations from an injected source.
    ///
    /// Points that already have an elevation keep it.
    pub fn fill_elevations(mut self, source: &dyn ElevationSource) -> Result<Self> {
        for p in self.points.iter_mut().filter(|p| p.elev.is_none()) {
            p.elev = Some(source.elevation_at(p)?);
        }
        Ok(self)
    }

    /// The trace analysed downstream, with the indices of the kept points.
    ///
    /// Routes are simplified; tracks are returned whole.
    pub fn simplified(&self, config: &SimplifyConfig) -> (Trace, Vec<usize>) {
        match self.kind {
            PathKind::Track => (self.clone(), (0..self.points.len()).collect()),
            PathKind::Route => {
                let kept = simplify_indices(&self.points, config.tolerance);
                let points: Vec<TracePoint> = kept.iter().map(|&i| self.points[i]).collect();
                let bounds = geo_utils::compute_bounds(&points).unwrap_or(self.bounds);
                (Trace { points, kind: self.kind, bounds }, kept)
            }
        }
    }
}

/// Input record handed over by the surrounding system.
///
/// All optional arrays must have one entry per point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceInput {
    /// `(lng, lat)` pairs
    pub points: Vec<(f64, f64)>,
    pub elevations: Option<Vec<f64>>,
    /// Seconds since the previous point
    pub times: Option<Vec<f64>>,
    pub heart_rate: Option<Vec<f64>>,
    pub cadence: Option<Vec<f64>>,
    pub kind: PathKind,
    /// Per-point match counts, only needed for contour colouring
    pub match_counts: Option<Vec<i32>>,
}

impl TraceInput {
    pub fn new(points: Vec<(f64, f64)>, kind: PathKind) -> Self {
        Self {
            points,
            elevations: None,
            times: None,
            heart_rate: None,
            cadence: None,
            kind,
            match_counts: None,
        }
    }

    pub fn with_elevations(mut self, elevations: Vec<f64>) -> Self {
        self.elevations = Some(elevations);
        self
    }

    pub fn with_times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_heart_rate(mut self, heart_rate: Vec<f64>) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_cadence(mut self, cadence: Vec<f64>) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn with_match_counts(mut self, match_counts: Vec<i32>) -> Self {
        self.match_counts = Some(match_counts);
        self
    }
}

/// Configuration for a full analysis.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    pub simplify: SimplifyConfig,
    pub elevation: ElevationConfig,
    pub shape: ShapeConfig,
    pub stats: StatsConfig,
    pub colour: ColourConfig,
}

impl AnalysisConfig {
    /// Reject values outside their valid domain.
    pub fn validate(&self) -> Result<()> {
        self.elevation.validate()?;
        self.colour.validate()?;
        self.shape.validate()?;
        Ok(())
    }
}

/// Everything derived from one trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PathAnalysis {
    /// The analysed trace: simplified for routes, as recorded for tracks
    pub trace: Trace,
    /// Indices of `trace` points in the input
    pub kept_indices: Vec<usize>,
    pub stats: Stats,
    pub shape: Shape,
    pub direction: Direction,
    /// Tiles `[0, trace.len() - 1]`
    pub segments: Vec<ColouredSegment>,
    pub bounds: Bounds,
}

impl PathAnalysis {
    pub fn simplified_points(&self) -> &[TracePoint] {
        self.trace.points()
    }

    /// Line features for the coloured segments.
    pub fn features(&self) -> FeatureCollection {
        segments::build_features(self.trace.points(), &self.segments)
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Validate an input record and analyse it.
///
/// # Example
/// ```
/// use trace_analyzer::{analyze, AnalysisConfig, PathKind, Shape, TraceInput};
///
/// let points: Vec<(f64, f64)> = (0..3).map(|i| (0.0, i as f64 * 0.01)).collect();
/// let analysis = analyze(&TraceInput::new(points, PathKind::Route), &AnalysisConfig::default()).unwrap();
///
/// assert_eq!(analysis.kept_indices, vec![0, 2]);
/// assert_eq!(analysis.shape, Shape::OneWay);
/// ```
pub fn analyze(input: &TraceInput, config: &AnalysisConfig) -> Result<PathAnalysis> {
    let trace = Trace::from_input(input)?;
    analyze_trace(&trace, input.match_counts.as_deref(), config)
}

/// Analyse an already validated trace.
///
/// `match_counts`, when given, has one entry per point of `trace` (before
/// simplification).
pub fn analyze_trace(trace: &Trace, match_counts: Option<&[i32]>, config: &AnalysisConfig) -> Result<PathAnalysis> {
    config.validate()?;
    debug!("[TraceAnalyzer] Analysing {:?} with {} points", trace.kind(), trace.len());

    let (analysed, kept_indices) = trace.simplified(&config.simplify);
    if analysed.len() != trace.len() {
        debug!("[TraceAnalyzer] Simplified {} -> {} points", trace.len(), analysed.len());
    }

    let stats = stats::compute_stats(&analysed, &config.stats, &config.elevation)?;
    let shape = shape::classify_shape(analysed.points(), &config.shape);
    let direction = shape::classify_direction(analysed.points(), shape, &config.shape);
    debug!("[TraceAnalyzer] Shape {}, direction {:?}", shape, direction);

    let counts = match match_counts {
        Some(counts) if counts.len() != trace.len() => {
            return Err(TraceError::InvalidInput(format!(
                "{} match counts for {} points",
                counts.len(),
                trace.len()
            )));
        }
        Some(counts) => Some(kept_indices.iter().map(|&i| counts[i]).collect::<Vec<i32>>()),
        None => None,
    };

    let segments = segments::colour_segments(
        analysed.points(),
        analysed.kind(),
        &stats.hills,
        counts.as_deref(),
        &config.colour,
    )?;

    info!(
        "[TraceAnalyzer] {:.0}m, {} hills, {} segments, {}",
        stats.distance,
        stats.hills.len(),
        segments.len(),
        shape
    );

    Ok(PathAnalysis {
        bounds: analysed.bounds(),
        trace: analysed,
        kept_indices,
        stats,
        shape,
        direction,
        segments,
    })
}

/// Analyse independent inputs, in parallel with the `parallel` feature.
///
/// Results are in input order; one failing input does not affect the others.
pub fn analyze_batch(inputs: &[TraceInput], config: &AnalysisConfig) -> Vec<Result<PathAnalysis>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs.par_iter().map(|input| analyze(input, config)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(|input| analyze(input, config)).collect()
    }
}

/// Outer bounding box of several analyses.
pub fn outer_bounds(analyses: &[PathAnalysis]) -> Option<Bounds> {
    let boxes: Vec<Bounds> = analyses.iter().map(|a| a.bounds).collect();
    geo_utils::merge_bounds(&boxes)
}

// ============================================================================
// Tests
// ============================================================================
