//! Example of analysing a recorded loop.
//!
//! Run with: cargo run --example analyze_trace

use trace_analyzer::{analyze, AnalysisConfig, ColourConfig, ColourPolicy, PathKind, TraceInput};

fn main() {
    env_logger::init();

    // A ~3km loop around a hill, one point every ~30m, 10s apart
    let center: (f64, f64) = (-0.1278, 51.5074);
    let n = 100;
    let radius_deg = 0.0045;

    let mut points = Vec::with_capacity(n + 1);
    let mut elevations = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
        points.push((
            center.0 + radius_deg * angle.sin() / center.1.to_radians().cos(),
            center.1 + radius_deg * angle.cos(),
        ));
        // Climb for the first half, descend for the second
        elevations.push(30.0 + 40.0 * (angle / 2.0).sin());
    }
    let times: Vec<f64> = (0..=n).map(|i| if i == 0 { 0.0 } else { 10.0 }).collect();

    let input = TraceInput::new(points, PathKind::Track)
        .with_elevations(elevations)
        .with_times(times);

    let config = AnalysisConfig {
        colour: ColourConfig {
            policy: ColourPolicy::Slope,
            ..ColourConfig::default()
        },
        ..AnalysisConfig::default()
    };

    let analysis = match analyze(&input, &config) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return;
        }
    };
    let stats = &analysis.stats;

    println!("Trace Analysis Example\n");
    println!("Shape: {} ({})", analysis.shape, analysis.direction);
    println!("Distance: {:.0}m", stats.distance);
    if let (Some(moving), Some(speed)) = (stats.moving_time, stats.average_speed) {
        println!("Moving time: {:.0}s, average {:.1} km/h", moving, speed);
    }
    println!("Ascent: {:.0}m, descent: {:.0}m", stats.ascent, stats.descent);

    println!("\nHills:");
    for hill in &stats.hills {
        println!(
            "   {}..{}: {:+.0}m over {:.0}m, max gradient {:.1}%",
            hill.start_index, hill.end_index, hill.delta_height, hill.delta_distance, hill.gradient.max
        );
    }

    println!("\nKm splits:");
    for split in &stats.km_splits {
        println!("   point {}: {:.2} min/km", split.point_index, split.pace);
    }

    println!("\nSegments:");
    for feature in analysis.features().features {
        let colour = feature.colour.map(|c| c.to_hex()).unwrap_or_else(|| "none".into());
        println!(
            "   {}..{} {} ({} coordinates)",
            feature.start_index,
            feature.end_index,
            colour,
            feature.coordinates.len()
        );
    }
}
