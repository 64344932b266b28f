//! # Coloured Segments
//!
//! Partitions a trace into contiguous, non-overlapping index ranges, each
//! tagged with a colour, and turns them into line features for a map.
//!
//! A segment `[start_index, end_index]` owns its points and the edges that
//! leave them, so segments tile `[0, n-1]` exactly and the final point of the
//! trace always belongs to the last segment. When rendered, a segment's line
//! runs on to the first point of the next segment so adjacent lines join.
//!
//! Three policies produce segments:
//! - **Uniform**: one colour for the whole trace
//! - **Slope**: hills coloured up/down, gaps between them filled as flat
//! - **Contour**: discrete levels from an external per-point match count

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::elevation::HillSegment;
use crate::error::{OptionExt, Result, TraceError};
use crate::{PathKind, TracePoint};

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` form for map styling.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Colours for slope-based segments.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlopePalette {
    pub up: Rgb,
    pub down: Rgb,
    pub flat: Rgb,
}

impl Default for SlopePalette {
    fn default() -> Self {
        Self {
            up: Rgb::new(220, 40, 40),
            down: Rgb::new(40, 160, 60),
            flat: Rgb::new(120, 120, 140),
        }
    }
}

/// How segments are coloured.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColourPolicy {
    /// Whole trace in one colour: fixed for routes, random per track
    #[default]
    Uniform,
    /// Up/down/flat from the detected hills
    Slope,
    /// Discrete levels from per-point match counts. Two levels colour edges
    /// whose endpoints are both matched; more levels spread the counts over
    /// `range` (min/max of the non-zero counts when `None`).
    Contour {
        levels: usize,
        range: Option<(i32, i32)>,
    },
}

/// Configuration for segment colouring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ColourConfig {
    pub policy: ColourPolicy,
    /// Uniform colour of routes.
    /// Default: #1e50dc
    pub route_colour: Rgb,
    pub slope: SlopePalette,
    /// Contour palette runs from `contour_low` (level 0) to `contour_high`.
    pub contour_low: Rgb,
    pub contour_high: Rgb,
    /// Seed for random track colours; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ColourConfig {
    fn default() -> Self {
        Self {
            policy: ColourPolicy::Uniform,
            route_colour: Rgb::new(30, 80, 220),
            slope: SlopePalette::default(),
            contour_low: Rgb::new(255, 230, 0),
            contour_high: Rgb::new(200, 0, 0),
            seed: None,
        }
    }
}

impl ColourConfig {
    pub fn validate(&self) -> Result<()> {
        if let ColourPolicy::Contour { levels, range } = &self.policy {
            if *levels < 2 {
                return Err(TraceError::InvalidConfiguration(format!(
                    "contour colouring needs at least 2 levels, got {levels}"
                )));
            }
            if let Some((lo, hi)) = range {
                if lo > hi {
                    return Err(TraceError::InvalidConfiguration(format!(
                        "contour range is inverted: {lo} > {hi}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A contiguous index range of a trace drawn in one colour.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColouredSegment {
    pub start_index: usize,
    pub end_index: usize,
    /// `None` for background (unmatched) segments
    pub colour: Option<Rgb>,
}

impl ColouredSegment {
    fn new(start_index: usize, end_index: usize, colour: Option<Rgb>) -> Self {
        Self { start_index, end_index, colour }
    }
}

// =============================================================================
// Palettes
// =============================================================================

/// `n` colours evenly interpolated from `from` to `to`, each channel rounded up.
///
/// # Example
///
/// ```rust
/// use trace_analyzer::segments::{palette, Rgb};
///
/// let colours = palette(Rgb::new(0, 0, 0), Rgb::new(255, 255, 255), 3);
/// assert_eq!(colours[1], Rgb::new(128, 128, 128));
/// ```
pub fn palette(from: Rgb, to: Rgb, n: usize) -> Vec<Rgb> {
    let channel = |a: u8, b: u8, ratio: f64| -> u8 {
        (a as f64 + (b as f64 - a as f64) * ratio).ceil().clamp(0.0, 255.0) as u8
    };

    (0..n)
        .map(|i| {
            let ratio = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            Rgb::new(
                channel(from.r, to.r, ratio),
                channel(from.g, to.g, ratio),
                channel(from.b, to.b, ratio),
            )
        })
        .collect()
}

/// A random colour, reproducible when seeded.
pub fn random_colour(seed: Option<u64>) -> Rgb {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Rgb::new(rng.gen(), rng.gen(), rng.gen())
}

// =============================================================================
// Policies
// =============================================================================

/// One segment covering the whole trace.
pub fn uniform_segments(point_count: usize, colour: Rgb) -> Vec<ColouredSegment> {
    if point_count == 0 {
        return Vec::new();
    }
    vec![ColouredSegment::new(0, point_count - 1, Some(colour))]
}

/// Hill segments coloured up/down, with flat segments filling the gaps before,
/// between and after them.
pub fn slope_segments(point_count: usize, hills: &[HillSegment], colours: &SlopePalette) -> Vec<ColouredSegment> {
    let mut segments = Vec::with_capacity(hills.len() * 2 + 1);
    let mut cursor = 0;

    for hill in hills {
        if hill.start_index > cursor {
            segments.push(ColouredSegment::new(cursor, hill.start_index - 1, Some(colours.flat)));
        }
        let colour = if hill.is_ascent() { colours.up } else { colours.down };
        segments.push(ColouredSegment::new(hill.start_index, hill.end_index, Some(colour)));
        cursor = hill.end_index + 1;
    }

    if cursor < point_count {
        segments.push(ColouredSegment::new(cursor, point_count - 1, Some(colours.flat)));
    }
    segments
}

/// Level of every edge `i -> i+1`, `-1` for background.
pub fn contour_levels(match_counts: &[i32], levels: usize, range: Option<(i32, i32)>) -> Result<Vec<i32>> {
    if levels < 2 {
        return Err(TraceError::InvalidConfiguration(format!(
            "contour colouring needs at least 2 levels, got {levels}"
        )));
    }

    let edge_minimums = match_counts.windows(2).map(|w| w[0].min(w[1]));

    if levels == 2 {
        return Ok(edge_minimums.map(|m| if m > 0 { 1 } else { -1 }).collect());
    }

    let range = range.or_else(|| {
        let matched = match_counts.iter().copied().filter(|&c| c > 0);
        Some((matched.clone().min()?, matched.max()?))
    });
    let Some((lo, hi)) = range else {
        // Nothing matched anywhere
        return Ok(edge_minimums.map(|_| -1).collect());
    };

    let n = levels as f64;
    let top = levels as i32 - 1;
    let span = (hi - lo) as f64;
    let shift = span / (n - 1.0) / 2.0;

    Ok(edge_minimums
        .map(|m| {
            if m <= 0 {
                -1
            } else if span <= 0.0 {
                top
            } else {
                let level = ((m - lo) as f64 + shift) / (span + 2.0 * shift) * n;
                (level.ceil() as i32 - 1).clamp(0, top)
            }
        })
        .collect())
}

/// Merge runs of equal edge level into segments coloured from `colours`.
///
/// The last segment always closes at the final point, so even a two-point
/// trace produces a segment.
pub fn level_segments(edge_levels: &[i32], colours: &[Rgb]) -> Vec<ColouredSegment> {
    let Some(&last_level) = edge_levels.last() else {
        return Vec::new();
    };
    let colour_of = |level: i32| usize::try_from(level).ok().and_then(|l| colours.get(l).copied());

    let mut segments = Vec::new();
    let mut start = 0;
    for e in 1..edge_levels.len() {
        if edge_levels[e] != edge_levels[e - 1] {
            segments.push(ColouredSegment::new(start, e - 1, colour_of(edge_levels[e - 1])));
            start = e;
        }
    }
    segments.push(ColouredSegment::new(start, edge_levels.len(), colour_of(last_level)));
    segments
}

/// Colour a trace of `points` according to the configured policy.
pub fn colour_segments(
    points: &[TracePoint],
    kind: PathKind,
    hills: &[HillSegment],
    match_counts: Option<&[i32]>,
    config: &ColourConfig,
) -> Result<Vec<ColouredSegment>> {
    let n = points.len();

    match &config.policy {
        ColourPolicy::Uniform => {
            let colour = match kind {
                PathKind::Route => config.route_colour,
                PathKind::Track => random_colour(config.seed),
            };
            Ok(uniform_segments(n, colour))
        }
        ColourPolicy::Slope => Ok(slope_segments(n, hills, &config.slope)),
        ColourPolicy::Contour { levels, range } => {
            let counts = match_counts.ok_or_missing("contour colouring requires match counts")?;
            if counts.len() != n {
                return Err(TraceError::InvalidInput(format!(
                    "{} match counts for {} points",
                    counts.len(),
                    n
                )));
            }
            let edge_levels = contour_levels(counts, *levels, *range)?;
            let colours = palette(config.contour_low, config.contour_high, *levels);
            Ok(level_segments(&edge_levels, &colours))
        }
    }
}

// =============================================================================
// Features
// =============================================================================

/// One renderable line.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineFeature {
    pub start_index: usize,
    pub end_index: usize,
    pub colour: Option<Rgb>,
    /// `[lng, lat]` pairs
    pub coordinates: Vec<[f64; 2]>,
}

/// Lines ready for a map layer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureCollection {
    pub features: Vec<LineFeature>,
}

/// Emit one line feature per segment.
///
/// Each line extends to the first point of the following segment. Segments
/// that would render as a single point are skipped.
pub fn build_features(points: &[TracePoint], segments: &[ColouredSegment]) -> FeatureCollection {
    let Some(last) = points.len().checked_sub(1) else {
        return FeatureCollection::default();
    };

    let features = segments
        .iter()
        .filter_map(|segment| {
            let end = (segment.end_index + 1).min(last);
            if segment.start_index >= end {
                return None;
            }
            Some(LineFeature {
                start_index: segment.start_index,
                end_index: segment.end_index,
                colour: segment.colour,
                coordinates: points[segment.start_index..=end].iter().map(|p| [p.lng, p.lat]).collect(),
            })
        })
        .collect();

    FeatureCollection { features }
}
