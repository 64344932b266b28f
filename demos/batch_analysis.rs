//! Example of analysing many drawn routes at once.
//!
//! Run with: cargo run --example batch_analysis --features parallel

use std::time::Instant;
use trace_analyzer::{analyze_batch, outer_bounds, AnalysisConfig, PathKind, TraceInput};

fn main() {
    println!("Batch Trace Analysis Example\n");

    let starts = [
        ("london", -0.1278, 51.5074),
        ("paris", 2.3522, 48.8566),
        ("nyc", -74.0060, 40.7128),
    ];

    // Zig-zag routes of increasing length from each start
    let mut names = Vec::new();
    let mut inputs = Vec::new();
    for (name, lng, lat) in starts {
        for variant in 1..=50 {
            let points: Vec<(f64, f64)> = (0..variant * 20)
                .map(|i| {
                    let zig = if i % 2 == 0 { 0.0 } else { 0.0002 };
                    (lng + i as f64 * 0.0003, lat + zig)
                })
                .collect();
            names.push(format!("{}-{}", name, variant));
            inputs.push(TraceInput::new(points, PathKind::Route));
        }
    }
    // One broken input; the rest of the batch still succeeds
    names.push("broken".to_string());
    inputs.push(TraceInput::new(vec![(0.0, 0.0)], PathKind::Route));

    let config = AnalysisConfig::default();

    let start = Instant::now();
    let results = analyze_batch(&inputs, &config);
    let elapsed = start.elapsed();

    let mut analyses = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(analysis) => analyses.push((i, analysis)),
            Err(e) => println!("{}: {}", names[i], e),
        }
    }

    println!("\nAnalysed {} of {} traces in {:?}", analyses.len(), inputs.len(), elapsed);
    for (i, analysis) in analyses.iter().filter(|(i, _)| names[*i].ends_with("-50")) {
        println!(
            "   {}: {} -> {} points, {:.0}m, {}",
            names[*i],
            inputs[*i].points.len(),
            analysis.trace.len(),
            analysis.stats.distance,
            analysis.shape
        );
    }

    let all: Vec<_> = analyses.into_iter().map(|(_, a)| a).collect();
    if let Some(bounds) = outer_bounds(&all) {
        println!(
            "\nOuter bounds: ({:.4}, {:.4}) - ({:.4}, {:.4})",
            bounds.min_lng, bounds.min_lat, bounds.max_lng, bounds.max_lat
        );
    }
}
