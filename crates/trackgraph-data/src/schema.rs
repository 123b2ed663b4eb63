//! Serde output schema for compiled tracks.
//!
//! These structs define the emitted format a runtime loads: a flat node
//! table indexed by node id, with each node's outgoing edges inlined. They
//! are written as JSON, RON, TOML, or bitcode by [`crate::emit`].

use serde::{Deserialize, Serialize};
use trackgraph_core::compile::CompiledTrack;
use trackgraph_core::graph::{Edge, TrackNode};
use trackgraph_core::mutex::MutexTable;
use trackgraph_core::node::{NodeTag, ReverseKind};

// ===========================================================================
// Track
// ===========================================================================

/// A compiled track as emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Name the track was compiled under.
    pub name: String,
    pub node_count: u32,
    /// Declared sensors, dummies excluded.
    pub sensor_count: u32,
    /// Node table. `nodes[i].index == i`.
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub calibration: Option<CalibrationRecord>,
}

// ===========================================================================
// Nodes and edges
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub index: u32,
    pub kind: NodeTag,
    /// Empty for dummies.
    pub name: String,
    /// Sensor address, switch number for branches and merges, 0 otherwise.
    pub num: u32,
    /// Index of the reverse node.
    pub reverse: u32,
    /// Used edge slots only; a branch has two, an exit or dummy none.
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// 0 ahead/straight, 1 curved.
    pub slot: u8,
    pub dest: u32,
    pub reverse_kind: ReverseKind,
    /// `2 * src + slot` of the reverse edge.
    pub reverse_slot: u32,
    pub distance_mm: u32,
    pub mutex_group: u32,
    pub mutex_size: u32,
}

// ===========================================================================
// Calibration
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub sensors: Vec<CalibrationSensorRecord>,
    #[serde(default)]
    pub branches: Vec<CalibrationBranchRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSensorRecord {
    pub node: u32,
    pub distance_mm: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBranchRecord {
    pub node: u32,
    pub curved: bool,
}

// ===========================================================================
// Conversion
// ===========================================================================

impl TrackRecord {
    /// Flatten a compiled track into the output schema.
    pub fn from_compiled(name: &str, track: &CompiledTrack) -> Self {
        let graph = track.graph();
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| node_record(track, node))
            .collect();
        let calibration = track.calibration().map(|cycle| CalibrationRecord {
            sensors: cycle
                .sensors
                .iter()
                .map(|s| CalibrationSensorRecord {
                    node: s.node.0,
                    distance_mm: s.distance_mm,
                })
                .collect(),
            branches: cycle
                .branches
                .iter()
                .map(|b| CalibrationBranchRecord {
                    node: b.node.0,
                    curved: b.curved,
                })
                .collect(),
        });

        TrackRecord {
            name: name.to_string(),
            node_count: graph.node_count() as u32,
            sensor_count: graph.sensor_count() as u32,
            nodes,
            calibration,
        }
    }

    pub fn node_by_name(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| !n.name.is_empty() && n.name == name)
    }

    /// Total number of emitted edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.edges.len()).sum()
    }
}

fn node_record(track: &CompiledTrack, node: &TrackNode) -> NodeRecord {
    let graph = track.graph();
    let num = node
        .kind()
        .address()
        .or_else(|| node.kind().switch_number())
        .unwrap_or(0);
    let edges = graph
        .outgoing(node.id())
        .map(|edge| edge_record(track, track.mutexes(), edge))
        .collect();
    NodeRecord {
        index: node.id().0,
        kind: node.tag(),
        name: node.name().to_string(),
        num,
        reverse: node.reverse().0,
        edges,
    }
}

fn edge_record(track: &CompiledTrack, mutexes: &MutexTable, edge: &Edge) -> EdgeRecord {
    let graph = track.graph();
    // Validation guarantees every edge has a reverse; fall back to self.
    let reverse_slot = graph
        .reverse_edge(edge.id())
        .and_then(|r| graph.edge(r))
        .map_or(edge.slot_index(), Edge::slot_index);
    EdgeRecord {
        slot: edge.slot() as u8,
        dest: edge.dest().0,
        reverse_kind: edge.reverse_kind(),
        reverse_slot: reverse_slot as u32,
        distance_mm: edge.distance_mm(),
        mutex_group: mutexes.group_of(edge.id()).map_or(0, |g| g.0),
        mutex_size: mutexes.group_size(edge.id()) as u32,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
