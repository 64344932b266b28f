//! Tests for serialization of configuration and results

#![cfg(feature = "serde")]

use trace_analyzer::{analyze, AnalysisConfig, ColourPolicy, PathKind, Shape, SimplifyConfig, TraceInput};

#[test]
fn test_config_from_partial_json() {
    let json = r#"{ "simplify": { "tolerance": 4.0 }, "colour": { "seed": 7 } }"#;
    let config: AnalysisConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.simplify, SimplifyConfig { tolerance: 4.0 });
    assert_eq!(config.colour.seed, Some(7));
    assert_eq!(config.colour.policy, ColourPolicy::Uniform);
    assert_eq!(config.shape, AnalysisConfig::default().shape);
}

#[test]
fn test_config_round_trip_with_contour_policy() {
    let mut config = AnalysisConfig::default();
    config.colour.policy = ColourPolicy::Contour { levels: 5, range: Some((1, 12)) };

    let json = serde_json::to_string(&config).unwrap();
    let parsed: AnalysisConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_input_from_json() {
    let json = r#"{
        "points": [[0.0, 0.0], [0.0, 0.01], [0.0, 0.02]],
        "elevations": [10.0, 12.0, 11.0],
        "times": null,
        "heart_rate": null,
        "cadence": null,
        "kind": "Route",
        "match_counts": null
    }"#;
    let input: TraceInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.points.len(), 3);
    assert_eq!(input.kind, PathKind::Route);

    let analysis = analyze(&input, &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.shape, Shape::OneWay);
}

#[test]
fn test_analysis_serializes() {
    let input = TraceInput::new(vec![(0.0, 0.0), (0.0, 0.01), (0.01, 0.01)], PathKind::Route);
    let analysis = analyze(&input, &AnalysisConfig::default()).unwrap();

    let value = serde_json::to_value(&analysis).unwrap();
    assert_eq!(value["shape"], "OneWay");
    assert_eq!(value["kept_indices"].as_array().map(|a| a.len()), Some(3));
    assert!(value["stats"]["distance"].as_f64().unwrap() > 2000.0);
    assert_eq!(value["segments"].as_array().map(|a| a.len()), Some(1));
}
