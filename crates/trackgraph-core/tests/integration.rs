//! Integration tests for the track compiler.
//!
//! Each test compiles a complete description and checks the graph a
//! runtime would see: node layout, edge distances, reverse kinds, mutex
//! groups and the calibration loop.

use trackgraph_core::error::CompileError;
use trackgraph_core::id::*;
use trackgraph_core::node::{NodeTag, ReverseKind};
use trackgraph_core::pathfind::shortest_path_by_name;
use trackgraph_core::test_utils::*;
use trackgraph_core::{compile, compile_with, CompileOptions};

// ===========================================================================
// Scenario A: a single sensor pair
// ===========================================================================
//
// S1 -> S2 forward, S2 -> S1 backward, one distance declared.

#[test]
fn sensor_pair_distance_fills_both_directions() {
    let input = "sensor S1 : 0 -> S2 @ S2 : 1 -> S1\ndist S1 S2 500mm\n";
    let track = compile(input).unwrap();
    let graph = track.graph();

    let s1 = graph.node(NodeId(0)).unwrap();
    let s2 = graph.node(NodeId(1)).unwrap();
    assert_eq!((s1.name(), s1.address()), ("S1", 0));
    assert_eq!((s2.name(), s2.address()), ("S2", 1));
    assert_eq!(s1.reverse(), s2.id());
    assert_eq!(s2.reverse(), s1.id());

    let forward = graph.edge(s1.edge(0).unwrap()).unwrap();
    assert_eq!(forward.dest(), s2.id());
    assert_eq!(forward.distance_mm(), 500);
    assert_eq!(forward.reverse_kind(), ReverseKind::Ahead);

    let backward = graph.edge(s2.edge(0).unwrap()).unwrap();
    assert_eq!(backward.distance_mm(), 500);
    assert!(s1.edge(1).is_none());
}

// ===========================================================================
// Scenario B: switch with no mutex declarations
// ===========================================================================

#[test]
fn branch_edges_sit_in_straight_and_curved_slots() {
    let input = "\
switch B : 5 -> X/(Y) @ M -> Z
sensor X : 0 -> M2 @ XR : 1 -> M
sensor Y : 2 -> M2 @ YR : 3 -> M
sensor Z : 4 -> B2 @ ZR : 5 -> B
switch B2 : 6 -> XR/(YR) @ M2 -> ZR
";
    let track = compile(input).unwrap();
    let graph = track.graph();
    let b = graph.node_by_name("B").unwrap();
    assert_eq!(b.tag(), NodeTag::Branch);
    assert_eq!(b.kind().switch_number(), Some(5));

    let straight = graph.edge(b.edge(0).unwrap()).unwrap();
    let curved = graph.edge(b.edge(1).unwrap()).unwrap();
    assert_eq!(graph.name_of(straight.dest()), "X");
    assert_eq!(graph.name_of(curved.dest()), "Y");
    assert!(!straight.is_curved());
    assert!(curved.is_curved());

    let table = track.mutexes();
    assert_eq!(table.group_size(straight.id()), 1);
    assert_eq!(table.group_size(curved.id()), 1);
    assert_ne!(table.group_of(straight.id()), table.group_of(curved.id()));
}

// ===========================================================================
// Scenario C: mutex on a branch edge
// ===========================================================================

#[test]
fn mutex_on_branch_edge_covers_siblings_and_reverses() {
    let input = format!("{}mutex BR1 P1\n", passing_loop_track());
    let track = compile(&input).unwrap();
    let graph = track.graph();
    let table = track.mutexes();

    let members: Vec<EdgeId> = [("BR1", "P1"), ("BR1", "Q1"), ("P2", "MR1"), ("Q2", "MR1")]
        .iter()
        .map(|(s, d)| graph.edge_from_names(s, d, 0).unwrap())
        .collect();
    let group = table.group_of(members[0]).unwrap();
    for &e in &members {
        assert_eq!(table.group_of(e), Some(group));
        assert_eq!(table.group_size(e), 4);
    }
    let declared = table.group(group).unwrap();
    assert!(declared.declared);
    assert_eq!(declared.members.len(), 4);
}

// ===========================================================================
// Scenario D: distance without an edge
// ===========================================================================

#[test]
fn distance_without_edge_is_rejected() {
    let input = format!("{}dist A1 A3 50mm\n", passing_loop_track());
    let err = compile(&input).unwrap_err();
    match err {
        CompileError::OrphanDistance { src, dest, line } => {
            assert_eq!((src.as_str(), dest.as_str()), ("A1", "A3"));
            assert_eq!(line, passing_loop_track().lines().count() + 1);
        }
        other => panic!("expected OrphanDistance, got {other:?}"),
    }
}

// ===========================================================================
// Scenario E: calibration triangle
// ===========================================================================

#[test]
fn calibration_triangle() {
    let track = compile(CALIB_TRIANGLE).unwrap();
    let graph = track.graph();
    let cycle = track.calibration().unwrap();
    let got: Vec<(String, u64)> = cycle
        .sensors
        .iter()
        .map(|s| (graph.name_of(s.node), s.distance_mm))
        .collect();
    assert_eq!(
        got,
        vec![("A".into(), 300), ("B".into(), 100), ("C".into(), 200)]
    );
    assert!(cycle.branches.is_empty());
    assert_eq!(cycle.nodes.len(), 3);
}

// ===========================================================================
// Generated rings
// ===========================================================================

#[test]
fn ring_with_sidings_compiles_and_calibrates() {
    let segments = [
        RingSegment::plain(400),
        RingSegment::siding(800, true),
        RingSegment::plain(300),
        RingSegment::siding(600, false),
    ];
    let input = ring_track(&segments, 2) + &ring_mutexes(&segments);
    let track = compile(&input).unwrap();
    let graph = track.graph();

    assert_eq!(graph.sensor_count(), 8 + 8);
    assert_eq!(track.mutexes().declared_groups().count(), 2);

    let cycle = track.calibration().unwrap();
    assert_eq!(cycle.branches.len(), 2);
    assert!(cycle.branches[0].curved);
    assert!(!cycle.branches[1].curved);
    let recorded: u64 = cycle.sensors.iter().map(|s| s.distance_mm).sum();
    assert_eq!(recorded, cycle.total_distance(graph));
}

#[test]
fn route_through_ring_prefers_straight_siding() {
    let segments = [
        RingSegment::plain(100),
        RingSegment::siding(400, true),
        RingSegment::plain(100),
    ];
    let track = compile(&ring_track(&segments, 0)).unwrap();
    let path = shortest_path_by_name(track.graph(), "F1", "F2").unwrap();
    let names: Vec<String> = path.nodes.iter().map(|&n| track.graph().name_of(n)).collect();
    assert_eq!(names, ["F1", "BA1", "P1", "MB1", "F2"]);
    assert_eq!(path.distance_mm, 4 * 100);
}

#[test]
fn strict_distances_accept_fully_measured_track() {
    let options = CompileOptions {
        require_distances: true,
        ..CompileOptions::default()
    };
    compile_with(&passing_loop_track(), &options).unwrap();
    compile_with(&line_track(), &options).unwrap();
}
