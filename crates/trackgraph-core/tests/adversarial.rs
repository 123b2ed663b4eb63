//! Adversarial input tests for the track compiler.
//!
//! Malformed or inconsistent descriptions must come back as errors that
//! point at the offending record, never as panics.

use trackgraph_core::error::CompileError;
use trackgraph_core::test_utils::*;
use trackgraph_core::{compile, compile_with, CompileOptions, DEFAULT_MAX_NODES};

#[test]
fn empty_input_compiles_to_empty_graph() {
    let track = compile("").unwrap();
    assert_eq!(track.graph().node_count(), 0);
    assert_eq!(track.mutexes().group_count(), 0);
    assert!(track.calibration().is_none());
}

#[test]
fn comments_and_blank_lines_only() {
    let track = compile("# nothing here\n\n   \n# still nothing\n").unwrap();
    assert_eq!(track.graph().node_count(), 0);
}

#[test]
fn unknown_keyword_is_a_parse_error() {
    let err = compile("sensor A : 0 -> B @ B : 1 -> A\nsignal X").unwrap_err();
    assert!(matches!(err, CompileError::Parse { line: 2, .. }));
}

#[test]
fn zero_distance_is_a_parse_error() {
    let input = format!("{TWO_SENSOR_LOOP}\ndist S2 S1 0mm");
    let err = compile(&input).unwrap_err();
    assert!(matches!(err, CompileError::Parse { line: 4, .. }));
}

#[test]
fn distance_without_unit_is_a_parse_error() {
    let input = format!("{TWO_SENSOR_LOOP}\ndist S2 S1 40");
    assert!(matches!(
        compile(&input),
        Err(CompileError::Parse { line: 4, .. })
    ));
}

#[test]
fn huge_address_is_rejected_by_limit() {
    let options = CompileOptions {
        max_sensor_address: Some(1023),
        ..CompileOptions::default()
    };
    let input = "sensor A : 4000000 -> B @ B : 4000001 -> A";
    let err = compile_with(input, &options).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SensorAddressOutOfRange { address: 4000000, max: 1023, line: 1, .. }
    ));
}

#[test]
fn huge_address_hits_default_node_limit() {
    let err = compile("sensor A : 4000000000 -> B @ B : 0 -> A").unwrap_err();
    assert_eq!(
        err,
        CompileError::TooManyNodes {
            count: 4_000_000_001,
            max: DEFAULT_MAX_NODES,
        }
    );
}

#[test]
fn address_overflow_is_a_parse_error() {
    let err = compile("sensor A : 99999999999 -> B @ B : 1 -> A").unwrap_err();
    assert!(matches!(err, CompileError::Parse { line: 1, .. }));
}

#[test]
fn self_loop_sensor_pair() {
    // A sensor that leads straight back into itself is consistent as long
    // as its reverse does the same.
    let input = "sensor A : 0 -> A @ B : 1 -> B\ndist A A 10mm";
    let track = compile(input).unwrap();
    let graph = track.graph();
    let e = graph.edge_from_names("A", "A", 0).unwrap();
    assert_eq!(graph.edge(e).unwrap().distance_mm(), 10);
    assert_eq!(
        graph.reverse_edge(e),
        Some(graph.edge_from_names("B", "B", 0).unwrap())
    );
}

#[test]
fn successor_pointing_at_own_reverse_is_stranded() {
    let input = "\
sensor A : 0 -> B @ B : 1 -> C
sensor C : 2 -> B @ D : 3 -> A
";
    let err = compile(input).unwrap_err();
    assert!(matches!(err, CompileError::StrandedEdge { .. }));
}

#[test]
fn mutex_naming_exit_edge_fails() {
    let input = format!("{}mutex EX1 EN1\n", line_track());
    let err = compile(&input).unwrap_err();
    assert!(matches!(err, CompileError::UnknownEdge { .. }));
}

#[test]
fn calibration_through_exit_fails() {
    let input = format!("{}calib S3\ncalib EX2\n", line_track());
    let err = compile(&input).unwrap_err();
    assert!(matches!(err, CompileError::InvalidCalibrationCycle { .. }));
}

#[test]
fn duplicate_declaration_reports_second_line() {
    let input = format!("{}enter S1 -> A1 @ X9\n", line_track());
    let err = compile(&input).unwrap_err();
    assert_eq!(err.line(), Some(line_track().lines().count() + 1));
}

#[test]
fn very_long_names_are_fine() {
    let a = "A".repeat(4096);
    let b = "B".repeat(4096);
    let input = format!("sensor {a} : 0 -> {b} @ {b} : 1 -> {a}");
    let track = compile(&input).unwrap();
    assert_eq!(track.graph().node_count(), 2);
}
