//! Shortest routes over the compiled graph, weighted by edge distance.

use crate::graph::TrackGraph;
use crate::id::{EdgeId, NodeId};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A route between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackPath {
    /// Visited nodes, both endpoints included.
    pub nodes: Vec<NodeId>,
    /// `edges[i]` leads from `nodes[i]` to `nodes[i + 1]`.
    pub edges: Vec<EdgeId>,
    pub distance_mm: u64,
}

/// Dijkstra from `src` to `dest`. `None` if `dest` cannot be reached or
/// either id is out of range.
pub fn shortest_path(graph: &TrackGraph, src: NodeId, dest: NodeId) -> Option<TrackPath> {
    let n = graph.node_count();
    if src.index() >= n || dest.index() >= n {
        return None;
    }

    let mut dist = vec![u64::MAX; n];
    let mut via: Vec<Option<EdgeId>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    dist[src.index()] = 0;
    heap.push(Reverse((0u64, src)));

    while let Some(Reverse((d, node))) = heap.pop() {
        if node == dest {
            break;
        }
        if d > dist[node.index()] {
            continue;
        }
        for edge in graph.outgoing(node) {
            let next = d + u64::from(edge.distance_mm());
            let slot = &mut dist[edge.dest().index()];
            if next < *slot {
                *slot = next;
                via[edge.dest().index()] = Some(edge.id());
                heap.push(Reverse((next, edge.dest())));
            }
        }
    }

    if dist[dest.index()] == u64::MAX {
        return None;
    }

    let mut edges = Vec::new();
    let mut at = dest;
    while at != src {
        let edge_id = via[at.index()]?;
        edges.push(edge_id);
        at = graph.edge(edge_id)?.src();
    }
    edges.reverse();

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(src);
    for &e in &edges {
        nodes.push(graph.edge(e)?.dest());
    }

    Some(TrackPath {
        nodes,
        edges,
        distance_mm: dist[dest.index()],
    })
}

/// [`shortest_path`] by node name.
pub fn shortest_path_by_name(graph: &TrackGraph, src: &str, dest: &str) -> Option<TrackPath> {
    shortest_path(graph, graph.node_id(src)?, graph.node_id(dest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::test_utils::*;

    fn names(graph: &TrackGraph, path: &TrackPath) -> Vec<String> {
        path.nodes.iter().map(|&n| graph.name_of(n)).collect()
    }

    #[test]
    fn prefers_the_shorter_siding() {
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        let path = shortest_path_by_name(graph, "A1", "A3").unwrap();
        assert_eq!(names(graph, &path), ["A1", "BR1", "P1", "MR2", "A3"]);
        assert_eq!(path.distance_mm, 100 + 200 + 200 + 100);
        assert_eq!(path.edges.len(), path.nodes.len() - 1);
    }

    #[test]
    fn same_node_is_empty_route() {
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        let a1 = graph.node_id("A1").unwrap();
        let path = shortest_path(graph, a1, a1).unwrap();
        assert_eq!(path.nodes, vec![a1]);
        assert!(path.edges.is_empty());
        assert_eq!(path.distance_mm, 0);
    }

    #[test]
    fn direction_matters() {
        // A1 and its reverse A2 run on opposite sides of the loop.
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        assert!(shortest_path_by_name(graph, "A1", "A2").is_none());
    }

    #[test]
    fn exit_is_a_dead_end() {
        let track = compile(&line_track()).unwrap();
        let graph = track.graph();
        let path = shortest_path_by_name(graph, "EN1", "EX2").unwrap();
        assert_eq!(
            names(graph, &path),
            ["EN1", "S1", "SP1", "S3", "EX2"]
        );
        assert_eq!(path.distance_mm, 50 + 120 + 80 + 60);
        assert!(shortest_path_by_name(graph, "EX2", "EN1").is_none());
    }

    #[test]
    fn unknown_endpoints_are_unreachable() {
        let track = compile(TWO_SENSOR_LOOP).unwrap();
        let graph = track.graph();
        assert!(shortest_path(graph, NodeId(0), NodeId(99)).is_none());
        assert!(shortest_path_by_name(graph, "S1", "nowhere").is_none());
    }
}
