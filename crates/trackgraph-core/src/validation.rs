//! Consistency checks for the linked track graph.
//!
//! Distance attachment runs while the linker still owns the edge list; the
//! structural checks run on the finished [`TrackGraph`].

use crate::error::CompileError;
use crate::graph::{Edge, TrackGraph, TrackNode};
use crate::id::NodeId;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Distances
// ---------------------------------------------------------------------------

/// A resolved distance for one directed node pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceEntry {
    pub millimeters: u32,
    /// Line of the `dist` record it came from.
    pub line: usize,
    /// Filled in for the reverse direction rather than declared.
    pub implied: bool,
}

/// Attach every resolved distance to the edge it names.
///
/// A distance whose pair is not an edge fails with `OrphanDistance`. Edges
/// left without a distance fail with `MissingDistance` when `require_all` is
/// set and keep distance 0 otherwise.
pub fn attach_distances(
    nodes: &[TrackNode],
    edges: &mut [Edge],
    distances: HashMap<(NodeId, NodeId), DistanceEntry>,
    require_all: bool,
) -> Result<(), CompileError> {
    let name = |id: NodeId| {
        nodes
            .get(id.index())
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    // Report the earliest offending line first, declared direction before
    // the implied one.
    let mut entries: Vec<((NodeId, NodeId), DistanceEntry)> = distances.into_iter().collect();
    entries.sort_by_key(|&((src, dest), entry)| (entry.line, entry.implied, src, dest));

    let mut attached = vec![false; edges.len()];
    for ((src, dest), entry) in entries {
        let edge = nodes
            .get(src.index())
            .into_iter()
            .flat_map(|n| n.edge_ids())
            .find(|e| edges[e.index()].dest == dest);
        match edge {
            Some(e) => {
                edges[e.index()].distance_mm = entry.millimeters;
                attached[e.index()] = true;
            }
            None => {
                return Err(CompileError::OrphanDistance {
                    src: name(src),
                    dest: name(dest),
                    line: entry.line,
                });
            }
        }
    }

    for (edge, done) in edges.iter().zip(&attached) {
        if *done {
            continue;
        }
        if require_all {
            return Err(CompileError::MissingDistance {
                src: name(edge.src),
                dest: name(edge.dest),
            });
        }
        tracing::warn!(
            src = %name(edge.src),
            dest = %name(edge.dest),
            "no distance declared for edge, using 0mm"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

/// Run every structural check on a linked graph.
pub fn check_graph(graph: &TrackGraph) -> Result<(), CompileError> {
    check_reverse_symmetry(graph)?;
    check_edge_ownership(graph)?;
    check_reversible_edges(graph)?;
    Ok(())
}

/// `reverse(reverse(n)) == n` for every node.
pub fn check_reverse_symmetry(graph: &TrackGraph) -> Result<(), CompileError> {
    for node in graph.nodes() {
        let back = graph.reverse(node.reverse);
        if back != Some(node.id) {
            return Err(CompileError::AsymmetricReverse {
                name: node.name.clone(),
                got: back.map(|id| graph.name_of(id)).unwrap_or_default(),
            });
        }
    }
    Ok(())
}

/// Every edge a node lists must name that node as its source.
pub fn check_edge_ownership(graph: &TrackGraph) -> Result<(), CompileError> {
    for node in graph.nodes() {
        for edge_id in node.edge_ids() {
            let claimed = graph.edge(edge_id).map(|e| e.src);
            if claimed != Some(node.id) {
                return Err(CompileError::InternalEdgeOwnershipMismatch {
                    edge: edge_id.0,
                    claimed: claimed.map(|id| graph.name_of(id)).unwrap_or_default(),
                    owner: node.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// For every edge `a -> b`, `reverse(b)` must have an edge to `reverse(a)`.
pub fn check_reversible_edges(graph: &TrackGraph) -> Result<(), CompileError> {
    for edge in graph.edges() {
        if graph.reverse_edge(edge.id).is_none() {
            let rev_src = graph.reverse(edge.dest).unwrap_or(edge.dest);
            let rev_dest = graph.reverse(edge.src).unwrap_or(edge.src);
            return Err(CompileError::StrandedEdge {
                src: graph.name_of(edge.src),
                dest: graph.name_of(edge.dest),
                rev_src: graph.name_of(rev_src),
                rev_dest: graph.name_of(rev_dest),
            });
        }
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
