//! # Elevation Analysis
//!
//! Smoothing of raw elevation samples, slope classification and hill
//! detection.
//!
//! ## Algorithm
//! 1. Smooth the raw samples with the configured [`Smoothing`] strategy
//! 2. Compute a forward gradient for every edge `i -> i+1`; the distance
//!    denominator accumulates until the smoothed elevation changes
//! 3. Classify each gradient as flat, ascending or descending
//! 4. At every change of classification, close the current run if its net
//!    height change exceeds the hill threshold; otherwise fold it into the
//!    next run by keeping its start
//!
//! Ascent and descent are summed from the raw per-step deltas and do not
//! depend on the hill threshold.

use crate::error::{Result, TraceError};
use crate::TracePoint;

/// Injected elevation lookup (e.g. a raster tile cache owned by the caller).
pub trait ElevationSource {
    /// Elevation in meters at the given point.
    fn elevation_at(&self, point: &TracePoint) -> Result<f64>;
}

impl<F> ElevationSource for F
where
    F: Fn(&TracePoint) -> Result<f64>,
{
    fn elevation_at(&self, point: &TracePoint) -> Result<f64> {
        self(point)
    }
}

/// Low-pass strategy applied to raw elevations before slope analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Smoothing {
    /// Centred moving average over an odd window. Near the ends the window
    /// shrinks symmetrically instead of padding.
    MovingAverage { window: usize },
    /// Exponential filter `f[i] = raw[i]·α + f[i-1]·(1-α)`.
    LowPass { alpha: f64 },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::MovingAverage { window: 7 }
    }
}

impl Smoothing {
    /// Exponential filter with the usual α of 0.3.
    pub fn low_pass() -> Self {
        Smoothing::LowPass { alpha: 0.3 }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Smoothing::MovingAverage { window } if window % 2 == 0 => Err(
                TraceError::InvalidConfiguration(format!("smoothing window must be odd, got {window}")),
            ),
            Smoothing::LowPass { alpha } if !(alpha > 0.0 && alpha <= 1.0) => Err(
                TraceError::InvalidConfiguration(format!("low-pass alpha must be in (0, 1], got {alpha}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Slope classification of a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slope {
    Flat,
    Ascending,
    Descending,
}

/// Configuration for elevation analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ElevationConfig {
    /// Smoothing applied before gradients are computed.
    /// Default: moving average over 7 samples
    pub smoothing: Smoothing,
    /// Gradient (percent) beyond which an edge counts as a slope.
    /// Default: 2.0
    pub slope_threshold: f64,
    /// Net height change (meters) a run needs to be reported as a hill.
    /// Default: 20.0
    pub hill_threshold: f64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::default(),
            slope_threshold: 2.0,
            hill_threshold: 20.0,
        }
    }
}

impl ElevationConfig {
    pub fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        if !(self.slope_threshold >= 0.0) || !(self.hill_threshold >= 0.0) {
            return Err(TraceError::InvalidConfiguration(
                "slope and hill thresholds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maximum and average gradient of a hill, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gradient {
    /// Steepest edge of the final slope run, signed by the hill direction
    pub max: f64,
    /// Net height change over net distance
    pub ave: f64,
}

/// A sustained climb or descent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HillSegment {
    /// First point index of the hill
    pub start_index: usize,
    /// Last point index owned by the hill (its final edge leaves this point)
    pub end_index: usize,
    /// Net smoothed height change in meters (negative for descents)
    pub delta_height: f64,
    /// Distance covered in meters
    pub delta_distance: f64,
    /// Elapsed seconds, 0 without time data
    pub delta_time: f64,
    /// Minutes per kilometre, 0 without time data
    pub pace: f64,
    /// Meters per hour, 0 without time data
    pub ascent_rate: f64,
    pub gradient: Gradient,
}

impl HillSegment {
    pub fn is_ascent(&self) -> bool {
        self.delta_height > 0.0
    }
}

/// Output of [`analyze_elevation`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevationSummary {
    /// Sum of positive raw steps (>= 0)
    pub ascent: f64,
    /// Sum of negative raw steps (<= 0)
    pub descent: f64,
    pub hills: Vec<HillSegment>,
    /// (min, max) of the raw samples
    pub range: Option<(f64, f64)>,
}

// =============================================================================
// Smoothing
// =============================================================================

/// Apply the chosen smoothing strategy.
pub fn smooth(elevations: &[f64], smoothing: &Smoothing) -> Result<Vec<f64>> {
    match *smoothing {
        Smoothing::MovingAverage { window } => moving_average(elevations, window),
        Smoothing::LowPass { alpha } => low_pass(elevations, alpha),
    }
}

/// Centred moving average with a symmetric window that shrinks at the edges.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::elevation::moving_average;
///
/// let smoothed = moving_average(&[100.0, 105.0, 90.0, 95.0, 150.0], 7).unwrap();
/// assert_eq!(smoothed[0], 100.0);
/// assert_eq!(smoothed[2], 108.0);
/// ```
pub fn moving_average(elevations: &[f64], window: usize) -> Result<Vec<f64>> {
    Smoothing::MovingAverage { window }.validate()?;

    let n = elevations.len();
    let half = window / 2;

    Ok((0..n)
        .map(|i| {
            let k = half.min(i).min(n - 1 - i);
            let span = &elevations[i - k..=i + k];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect())
}

/// Exponential low-pass filter seeded with the first sample.
pub fn low_pass(elevations: &[f64], alpha: f64) -> Result<Vec<f64>> {
    Smoothing::LowPass { alpha }.validate()?;

    let mut filtered: Vec<f64> = Vec::with_capacity(elevations.len());
    for &raw in elevations {
        let value = match filtered.last() {
            Some(&prev) => raw * alpha + prev * (1.0 - alpha),
            None => raw,
        };
        filtered.push(value);
    }
    Ok(filtered)
}

// =============================================================================
// Slopes and Hills
// =============================================================================

/// Classify a gradient (percent) against a symmetric threshold.
#[inline]
pub fn classify_slope(gradient_percent: f64, threshold: f64) -> Slope {
    if gradient_percent < -threshold {
        Slope::Descending
    } else if gradient_percent > threshold {
        Slope::Ascending
    } else {
        Slope::Flat
    }
}

/// Forward gradient (percent) of every edge `i -> i+1`.
///
/// `segment_distances[i]` is the distance from point `i-1` to point `i`.
/// The distance denominator keeps growing over edges where the elevation
/// does not change and resets once it does, so a small change after a long
/// level stretch yields a shallow gradient and a change over a tiny step may
/// spike. Zero distance yields a zero gradient. Both slices must have one
/// entry per point.
pub fn edge_gradients(smoothed: &[f64], segment_distances: &[f64]) -> Result<Vec<f64>> {
    if segment_distances.len() != smoothed.len() {
        return Err(TraceError::InvalidInput(format!(
            "{} segment distances for {} elevations",
            segment_distances.len(),
            smoothed.len()
        )));
    }
    let mut since_change = 0.0;

    Ok(smoothed
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            since_change += segment_distances[i + 1];
            let rise = w[1] - w[0];
            if rise == 0.0 {
                return 0.0;
            }
            let gradient = if since_change > 0.0 {
                rise / since_change * 100.0
            } else {
                0.0
            };
            since_change = 0.0;
            gradient
        })
        .collect())
}

/// Sum of positive and negative raw elevation steps.
pub fn ascent_descent(elevations: &[f64]) -> (f64, f64) {
    elevations
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(up, down), step| {
            if step > 0.0 {
                (up + step, down)
            } else {
                (up, down + step)
            }
        })
}

/// Smooth elevations, accumulate ascent/descent and detect hills.
///
/// `segment_distances` and `segment_times` are per point, holding the
/// distance/seconds from the previous point (index 0 is ignored). All slices
/// must have the same length.
pub fn analyze_elevation(
    elevations: &[f64],
    segment_distances: &[f64],
    segment_times: Option<&[f64]>,
    config: &ElevationConfig,
) -> Result<ElevationSummary> {
    config.validate()?;
    let n = elevations.len();
    if segment_distances.len() != n || segment_times.is_some_and(|t| t.len() != n) {
        return Err(TraceError::InvalidInput(format!(
            "elevation analysis needs {n} distances and times per point"
        )));
    }

    let (ascent, descent) = ascent_descent(elevations);
    let range = elevations.iter().fold(None, |acc: Option<(f64, f64)>, &e| match acc {
        Some((lo, hi)) => Some((lo.min(e), hi.max(e))),
        None => Some((e, e)),
    });

    let mut summary = ElevationSummary { ascent, descent, hills: Vec::new(), range };
    if n < 2 {
        return Ok(summary);
    }

    let smoothed = smooth(elevations, &config.smoothing)?;
    let gradients = edge_gradients(&smoothed, segment_distances)?;

    let cum_distance = prefix_sums(segment_distances);
    let cum_time = segment_times.map(prefix_sums);
    let hill = HillBuilder {
        smoothed: &smoothed,
        cum_distance: &cum_distance,
        cum_time: cum_time.as_deref(),
        threshold: config.hill_threshold,
    };

    let mut start = 0;
    let mut current = classify_slope(gradients[0], config.slope_threshold);
    let mut max_gradient: f64 = 0.0;

    for (i, &gradient) in gradients.iter().enumerate() {
        let slope = classify_slope(gradient, config.slope_threshold);
        if slope != current {
            if let Some(segment) = hill.build(start, i, i - 1, max_gradient) {
                summary.hills.push(segment);
                start = i;
            }
            current = slope;
            max_gradient = 0.0;
        }
        max_gradient = max_gradient.max(gradient.abs());
    }

    if let Some(segment) = hill.build(start, n - 1, n - 1, max_gradient) {
        summary.hills.push(segment);
    }

    Ok(summary)
}

fn prefix_sums(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i > 0 {
                total += v;
            }
            total
        })
        .collect()
}

struct HillBuilder<'a> {
    smoothed: &'a [f64],
    cum_distance: &'a [f64],
    cum_time: Option<&'a [f64]>,
    threshold: f64,
}

impl HillBuilder<'_> {
    /// A hill from `start` measured to `now`, owning points up to `end_index`,
    /// or `None` if the net change stays within the threshold.
    fn build(&self, start: usize, now: usize, end_index: usize, max_gradient: f64) -> Option<HillSegment> {
        let delta_height = self.smoothed[now] - self.smoothed[start];
        if delta_height.abs() <= self.threshold {
            return None;
        }

        let delta_distance = self.cum_distance[now] - self.cum_distance[start];
        let delta_time = self.cum_time.map_or(0.0, |t| t[now] - t[start]);
        let pace = if delta_distance > 0.0 && delta_time > 0.0 {
            (delta_time / 60.0) / (delta_distance / 1000.0)
        } else {
            0.0
        };
        let ascent_rate = if delta_time > 0.0 {
            delta_height / delta_time * 3600.0
        } else {
            0.0
        };
        let ave = if delta_distance > 0.0 {
            delta_height / delta_distance * 100.0
        } else {
            0.0
        };

        Some(HillSegment {
            start_index: start,
            end_index,
            delta_height,
            delta_distance,
            delta_time,
            pace,
            ascent_rate,
            gradient: Gradient {
                max: max_gradient.copysign(delta_height),
                ave,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn raw_config() -> ElevationConfig {
        ElevationConfig {
            smoothing: Smoothing::MovingAverage { window: 1 },
            ..ElevationConfig::default()
        }
    }

    #[test]
    fn test_moving_average_shrinks_at_edges() {
        let smoothed = moving_average(&[100.0, 105.0, 90.0, 95.0, 150.0], 7).unwrap();
        assert_eq!(smoothed[0], 100.0);
        assert!(approx_eq(smoothed[1], 295.0 / 3.0, 1e-9));
        assert_eq!(smoothed[2], 108.0);
        assert!(approx_eq(smoothed[3], 335.0 / 3.0, 1e-9));
        assert_eq!(smoothed[4], 150.0);
    }

    #[test]
    fn test_moving_average_even_window_rejected() {
        assert!(matches!(
            moving_average(&[1.0, 2.0, 3.0], 4),
            Err(TraceError::InvalidConfiguration(_))
        ));
        assert!(moving_average(&[1.0], 0).is_err());
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let raw = [3.0, 9.0, 1.0, 4.0];
        assert_eq!(moving_average(&raw, 1).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_low_pass_filter() {
        let filtered = low_pass(&[10.0, 20.0, 20.0], 0.3).unwrap();
        assert_eq!(filtered[0], 10.0);
        assert!(approx_eq(filtered[1], 13.0, 1e-9));
        assert!(approx_eq(filtered[2], 15.1, 1e-9));
        assert!(low_pass(&[1.0], 0.0).is_err());
        assert!(low_pass(&[1.0], 1.5).is_err());
    }

    #[test]
    fn test_smoothing_strategies_differ() {
        let raw = [0.0, 0.0, 30.0, 0.0, 0.0];
        let ma = smooth(&raw, &Smoothing::MovingAverage { window: 3 }).unwrap();
        let lp = smooth(&raw, &Smoothing::low_pass()).unwrap();
        assert_ne!(ma, lp);
    }

    #[test]
    fn test_classify_slope() {
        assert_eq!(classify_slope(5.0, 2.0), Slope::Ascending);
        assert_eq!(classify_slope(-5.0, 2.0), Slope::Descending);
        assert_eq!(classify_slope(2.0, 2.0), Slope::Flat);
        assert_eq!(classify_slope(-2.0, 2.0), Slope::Flat);
    }

    #[test]
    fn test_edge_gradients_accumulate_over_level_stretch() {
        let smoothed = [100.0, 100.0, 100.0, 102.0];
        let distances = [0.0, 50.0, 50.0, 100.0];
        let g = edge_gradients(&smoothed, &distances).unwrap();
        assert_eq!(g[0], 0.0);
        assert_eq!(g[1], 0.0);
        assert!(approx_eq(g[2], 1.0, 1e-9)); // 2m over 200m
    }

    #[test]
    fn test_edge_gradients_zero_distance() {
        let g = edge_gradients(&[100.0, 105.0], &[0.0, 0.0]).unwrap();
        assert_eq!(g, vec![0.0]);
    }

    #[test]
    fn test_edge_gradients_per_edge_distances_rejected() {
        // One distance per edge instead of one per point
        let result = edge_gradients(&[100.0, 102.0, 104.0], &[50.0, 50.0]);
        assert!(matches!(result, Err(TraceError::InvalidInput(_))));
    }

    #[test]
    fn test_single_hill_with_folded_wobble() {
        let elevations = [100.0, 105.0, 90.0, 95.0, 150.0];
        let distances = [0.0, 100.0, 100.0, 100.0, 100.0];
        let summary = analyze_elevation(&elevations, &distances, None, &raw_config()).unwrap();

        assert_eq!(summary.hills.len(), 1);
        let hill = &summary.hills[0];
        assert_eq!(hill.start_index, 0);
        assert_eq!(hill.end_index, 4);
        assert_eq!(hill.delta_height, 50.0);
        assert_eq!(hill.delta_distance, 400.0);
        assert!(approx_eq(hill.gradient.max, 55.0, 1e-9));
        assert!(approx_eq(hill.gradient.ave, 12.5, 1e-9));
        assert_eq!(hill.pace, 0.0);
    }

    #[test]
    fn test_ascent_descent_from_raw_steps() {
        let elevations = [100.0, 105.0, 90.0, 95.0, 150.0];
        let distances = [0.0, 100.0, 100.0, 100.0, 100.0];
        let summary = analyze_elevation(&elevations, &distances, None, &ElevationConfig::default()).unwrap();
        assert_eq!(summary.ascent, 65.0);
        assert_eq!(summary.descent, -15.0);
        assert_eq!(summary.range, Some((90.0, 150.0)));
    }

    #[test]
    fn test_climb_then_descent() {
        let mut elevations: Vec<f64> = (0..=10).map(|i| 100.0 + i as f64 * 5.0).collect();
        elevations.extend((1..=10).map(|i| 150.0 - i as f64 * 5.0));
        let distances: Vec<f64> = (0..elevations.len()).map(|i| if i == 0 { 0.0 } else { 50.0 }).collect();
        let times: Vec<f64> = (0..elevations.len()).map(|i| if i == 0 { 0.0 } else { 30.0 }).collect();

        let summary = analyze_elevation(&elevations, &distances, Some(&times), &raw_config()).unwrap();
        assert_eq!(summary.hills.len(), 2);

        let up = &summary.hills[0];
        assert_eq!((up.start_index, up.end_index), (0, 9));
        assert_eq!(up.delta_height, 50.0);
        assert!(up.is_ascent());
        assert_eq!(up.delta_time, 300.0);
        assert!(approx_eq(up.pace, 10.0, 1e-9)); // 5 min over 500 m
        assert!(approx_eq(up.ascent_rate, 600.0, 1e-9));
        assert!(approx_eq(up.gradient.max, 10.0, 1e-9));

        let down = &summary.hills[1];
        assert_eq!((down.start_index, down.end_index), (10, 20));
        assert_eq!(down.delta_height, -50.0);
        assert!(approx_eq(down.gradient.max, -10.0, 1e-9));
        assert!(down.ascent_rate < 0.0);
    }

    #[test]
    fn test_hills_do_not_overlap() {
        let elevations: Vec<f64> = (0..60).map(|i| ((i as f64) / 6.0).sin() * 40.0 + 200.0).collect();
        let distances: Vec<f64> = (0..60).map(|i| if i == 0 { 0.0 } else { 40.0 }).collect();
        let summary = analyze_elevation(&elevations, &distances, None, &ElevationConfig::default()).unwrap();

        assert!(!summary.hills.is_empty());
        for pair in summary.hills.windows(2) {
            assert!(pair[0].end_index < pair[1].start_index);
        }
        for hill in &summary.hills {
            assert!(hill.start_index <= hill.end_index);
            assert!(hill.end_index < 60);
            assert!(hill.delta_height.abs() > 20.0);
        }
    }

    #[test]
    fn test_flat_profile_has_no_hills() {
        let elevations = vec![50.0; 20];
        let distances: Vec<f64> = (0..20).map(|i| if i == 0 { 0.0 } else { 10.0 }).collect();
        let summary = analyze_elevation(&elevations, &distances, None, &ElevationConfig::default()).unwrap();
        assert!(summary.hills.is_empty());
        assert_eq!(summary.ascent, 0.0);
        assert_eq!(summary.descent, 0.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = analyze_elevation(&[1.0, 2.0], &[0.0], None, &ElevationConfig::default());
        assert!(matches!(result, Err(TraceError::InvalidInput(_))));
    }

    #[test]
    fn test_closure_as_elevation_source() {
        let source = |p: &TracePoint| -> Result<f64> { Ok(p.lat * 1000.0) };
        let value = source.elevation_at(&TracePoint::new(0.0, 0.5)).unwrap();
        assert_eq!(value, 500.0);
    }
}
