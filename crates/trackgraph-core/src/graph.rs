use crate::error::CompileError;
use crate::id::*;
use crate::node::{NodeKind, NodeTag, ReverseKind};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// A node in the resolved track graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) reverse: NodeId,
    pub(crate) kind: NodeKind<NodeId>,
    /// Outgoing edges by slot. `None` is an unused slot.
    pub(crate) edges: [Option<EdgeId>; 2],
}

impl TrackNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name. Empty for dummy nodes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same location in the opposite direction.
    pub fn reverse(&self) -> NodeId {
        self.reverse
    }

    pub fn kind(&self) -> &NodeKind<NodeId> {
        &self.kind
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    /// Sensor address, 0 for every other variant.
    pub fn address(&self) -> u32 {
        self.kind.address().unwrap_or(0)
    }

    /// Edge in the given slot (0 or 1), if that slot is used.
    pub fn edge(&self, slot: usize) -> Option<EdgeId> {
        self.edges.get(slot).copied().flatten()
    }

    /// Used edge slots in slot order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().flatten().copied()
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) src: NodeId,
    pub(crate) dest: NodeId,
    pub(crate) slot: u8,
    pub(crate) reverse_kind: ReverseKind,
    pub(crate) distance_mm: u32,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dest(&self) -> NodeId {
        self.dest
    }

    /// Slot on the source node: 0 (ahead/straight) or 1 (curved).
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn reverse_kind(&self) -> ReverseKind {
        self.reverse_kind
    }

    pub fn distance_mm(&self) -> u32 {
        self.distance_mm
    }

    /// Dense index for attaching per-edge data: `2 * src + slot`.
    pub fn slot_index(&self) -> usize {
        (self.src.index() << 1) | self.slot()
    }

    pub fn is_curved(&self) -> bool {
        self.slot == 1
    }
}

// ---------------------------------------------------------------------------
// TrackGraph
// ---------------------------------------------------------------------------

/// The resolved track graph: nodes in identity order and the real edges
/// leaving them.
///
/// Sensor `n` lives at index `n`; unaddressed sensor slots hold dummy nodes.
/// Built once by the linker and read-only afterwards.
#[derive(Debug, Clone)]
pub struct TrackGraph {
    pub(crate) nodes: Vec<TrackNode>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) by_name: HashMap<String, NodeId>,
    pub(crate) sensor_count: usize,
    pub(crate) sensor_slots: usize,
}

impl TrackGraph {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&TrackNode> {
        self.nodes.get(id.index())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub fn nodes(&self) -> &[TrackNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of declared sensors (dummies excluded).
    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    /// Number of leading node slots reserved for sensor addresses
    /// (highest address + 1).
    pub fn sensor_slots(&self) -> usize {
        self.sensor_slots
    }

    /// Size of the per-edge data space indexed by [`Edge::slot_index`].
    pub fn edge_slot_count(&self) -> usize {
        self.nodes.len() * 2
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&TrackNode> {
        self.node_id(name).and_then(|id| self.node(id))
    }

    /// Name of a node, for diagnostics. Unknown ids render as their index.
    pub fn name_of(&self, id: NodeId) -> String {
        self.node(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// The reverse node of `id`.
    pub fn reverse(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).map(|n| n.reverse)
    }

    /// Real edges leaving `id`, in slot order.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.edge_ids())
            .filter_map(|e| self.edge(e))
    }

    /// The edge from `src` to `dest`, if the two nodes are adjacent.
    pub fn edge_between(&self, src: NodeId, dest: NodeId) -> Option<EdgeId> {
        self.outgoing(src).find(|e| e.dest == dest).map(|e| e.id)
    }

    /// Resolve an edge by endpoint names. `line` is the record that asked.
    pub fn edge_from_names(&self, src: &str, dest: &str, line: usize) -> Result<EdgeId, CompileError> {
        let unknown = || CompileError::UnknownEdge {
            src: src.to_string(),
            dest: dest.to_string(),
            line,
        };
        let src_id = self.node_id(src).ok_or_else(unknown)?;
        let dest_id = self.node_id(dest).ok_or_else(unknown)?;
        self.edge_between(src_id, dest_id).ok_or_else(unknown)
    }

    /// The same stretch of track travelled the other way: the edge from
    /// `reverse(dest)` to `reverse(src)`.
    pub fn reverse_edge(&self, id: EdgeId) -> Option<EdgeId> {
        let edge = self.edge(id)?;
        let rev_src = self.reverse(edge.dest)?;
        let rev_dest = self.reverse(edge.src)?;
        self.edge_between(rev_src, rev_dest)
    }

    /// Every edge leaving the source of `id`, including `id` itself.
    pub fn sibling_edges(&self, id: EdgeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge(id)
            .into_iter()
            .flat_map(move |e| self.outgoing(e.src).map(|s| s.id))
    }

    /// Whether the node is a sensor.
    pub fn is_sensor(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.tag() == NodeTag::Sensor)
    }

    /// Whether the node is a branch.
    pub fn is_branch(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.kind.is_branch())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
