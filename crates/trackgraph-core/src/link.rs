//! Turns a [`TrackBuilder`] (names) into a [`TrackGraph`] (identities).
//!
//! Stages, in order: capacity checks, identity assignment, name resolution,
//! edge construction, distance attachment.

use crate::builder::{CalibrationStep, MutexDecl, NodeDecl, Slot, TrackBuilder};
use crate::compile::CompileOptions;
use crate::error::CompileError;
use crate::graph::{Edge, TrackGraph, TrackNode};
use crate::id::{EdgeId, NodeId};
use crate::node::{NodeKind, ReverseKind};
use crate::validation::{self, DistanceEntry};
use std::collections::HashMap;

/// Declarations that are interpreted against the linked graph.
#[derive(Debug, Clone, Default)]
pub struct PendingDecls {
    pub mutexes: Vec<MutexDecl>,
    pub calibration: Vec<CalibrationStep>,
}

/// Link a builder into a graph. Returns the graph and the declarations that
/// still need it (mutex seeds, calibration steps).
pub fn link(
    builder: TrackBuilder,
    options: &CompileOptions,
) -> Result<(TrackGraph, PendingDecls), CompileError> {
    check_capacity(&builder, options)?;

    let order = builder.assign_identities();

    let ids = identity_map(&builder, &order);
    let mut nodes = resolve_ids(&builder, &order, &ids)?;
    let mut edges = make_edges(&mut nodes);
    let distances = resolve_distances(&builder, &ids)?;
    validation::attach_distances(&nodes, &mut edges, distances, options.require_distances)?;

    let sensor_count = builder.sensors().count();
    let sensor_slots = builder.sensor_slots();
    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        sensors = sensor_count,
        "linked track graph"
    );

    let graph = TrackGraph {
        nodes,
        edges,
        by_name: ids,
        sensor_count,
        sensor_slots,
    };
    let pending = PendingDecls {
        mutexes: builder.mutexes,
        calibration: builder.calibration,
    };
    Ok((graph, pending))
}

/// Runs before any slot is allocated, so a huge sensor address fails here
/// instead of sizing the node array.
fn check_capacity(builder: &TrackBuilder, options: &CompileOptions) -> Result<(), CompileError> {
    if let Some(max) = options.max_sensor_address
        && let Some((address, decl)) = builder.sensors().find(|&(address, _)| address > max)
    {
        return Err(CompileError::SensorAddressOutOfRange {
            name: decl.name.clone(),
            address,
            max,
            line: decl.line,
        });
    }

    let count = builder.slot_count();
    let max = options.node_limit();
    if count > max {
        return Err(CompileError::TooManyNodes { count, max });
    }
    Ok(())
}

fn identity_map(builder: &TrackBuilder, order: &[Slot]) -> HashMap<String, NodeId> {
    order
        .iter()
        .enumerate()
        .filter_map(|(position, slot)| match slot {
            Slot::Dummy => None,
            Slot::Declared(i) => Some((builder.decls[*i].name.clone(), NodeId(position as u32))),
        })
        .collect()
}

/// Second pass: rewrite every name into the identity assigned to it.
fn resolve_ids(
    builder: &TrackBuilder,
    order: &[Slot],
    ids: &HashMap<String, NodeId>,
) -> Result<Vec<TrackNode>, CompileError> {
    let mut nodes = Vec::with_capacity(order.len());
    for (position, slot) in order.iter().enumerate() {
        let id = NodeId(position as u32);
        let node = match slot {
            Slot::Dummy => TrackNode {
                id,
                name: String::new(),
                reverse: id,
                kind: NodeKind::Dummy,
                edges: [None, None],
            },
            Slot::Declared(i) => resolve_decl(&builder.decls[*i], id, ids)?,
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn resolve_decl(
    decl: &NodeDecl,
    id: NodeId,
    ids: &HashMap<String, NodeId>,
) -> Result<TrackNode, CompileError> {
    let lookup = |name: String| {
        ids.get(&name)
            .copied()
            .ok_or(CompileError::UnknownNodeName {
                name,
                line: decl.line,
            })
    };
    Ok(TrackNode {
        id,
        name: decl.name.clone(),
        reverse: lookup(decl.reverse.clone())?,
        kind: decl.kind.clone().try_map(lookup)?,
        edges: [None, None],
    })
}

/// Build each node's outgoing edges and record them in its slots.
fn make_edges(nodes: &mut [TrackNode]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for index in 0..nodes.len() {
        let src = nodes[index].id;
        let successors: Vec<(usize, NodeId)> = nodes[index]
            .kind
            .successors()
            .iter()
            .enumerate()
            .filter_map(|(slot, dest)| dest.map(|d| (slot, *d)))
            .collect();

        for (slot, dest) in successors {
            let id = EdgeId(edges.len() as u32);
            edges.push(Edge {
                id,
                src,
                dest,
                slot: slot as u8,
                reverse_kind: reverse_kind(nodes, src, dest),
                distance_mm: 0,
            });
            nodes[index].edges[slot] = Some(id);
        }
    }
    edges
}

/// Which branch choice of `reverse(dest)` leads back to `reverse(src)`.
fn reverse_kind(nodes: &[TrackNode], src: NodeId, dest: NodeId) -> ReverseKind {
    let rev_src = nodes[src.index()].reverse;
    let rev_dest = nodes[dest.index()].reverse;
    match nodes[rev_dest.index()].kind.straight() {
        None => ReverseKind::Ahead,
        Some(straight) if straight == rev_src => ReverseKind::Straight,
        Some(_) => ReverseKind::Curved,
    }
}

/// Resolve `dist` records to node pairs, adding the implicit reverse
/// direction for each. Later declarations win.
///
/// When a pair is its own reverse (two sensors that are each other's
/// reverse), the implied direction is the opposite edge `dest -> src`.
fn resolve_distances(
    builder: &TrackBuilder,
    ids: &HashMap<String, NodeId>,
) -> Result<HashMap<(NodeId, NodeId), DistanceEntry>, CompileError> {
    let mut out: HashMap<(NodeId, NodeId), DistanceEntry> = HashMap::new();
    for decl in builder.distances() {
        let lookup = |name: &str| {
            ids.get(name)
                .copied()
                .zip(builder.decl_by_name(name))
                .ok_or_else(|| CompileError::UnknownNodeName {
                    name: name.to_string(),
                    line: decl.line,
                })
        };
        let (src, src_decl) = lookup(&decl.src)?;
        let (dest, dest_decl) = lookup(&decl.dest)?;
        let (rev_src, _) = lookup(&dest_decl.reverse)?;
        let (rev_dest, _) = lookup(&src_decl.reverse)?;

        let declared = (src, dest);
        let mut reverse = (rev_src, rev_dest);
        if reverse == declared
            && dest_decl.kind.successors().contains(&Some(&decl.src))
        {
            reverse = (dest, src);
        }

        let entry = DistanceEntry {
            millimeters: decl.millimeters,
            line: decl.line,
            implied: false,
        };
        let implied = DistanceEntry {
            implied: true,
            ..entry
        };
        for (pair, entry) in [(declared, entry), (reverse, implied)] {
            if let Some(previous) = out.insert(pair, entry)
                && previous.millimeters != entry.millimeters
                && previous.line != entry.line
            {
                tracing::warn!(
                    src = %decl.src,
                    dest = %decl.dest,
                    previous = previous.millimeters,
                    line = decl.line,
                    "distance redeclared, keeping the later value"
                );
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::DEFAULT_MAX_NODES;
    use crate::node::NodeTag;
    use crate::record::parse_records;
    use crate::test_utils::*;

    fn link_str(input: &str) -> Result<(TrackGraph, PendingDecls), CompileError> {
        let builder = TrackBuilder::from_records(parse_records(input)?)?;
        link(builder, &CompileOptions::default())
    }

    #[test]
    fn sensors_sit_at_their_address() {
        let (graph, _) = link_str(&line_track()).unwrap();
        assert_eq!(graph.sensor_count(), 4);
        assert_eq!(graph.sensor_slots(), 6);
        for node in graph.nodes().iter().take(graph.sensor_slots()) {
            match node.tag() {
                NodeTag::Sensor => assert_eq!(node.address() as usize, node.id().index()),
                NodeTag::Dummy => assert_eq!(node.reverse(), node.id()),
                other => panic!("unexpected {other:?} among sensor slots"),
            }
        }
        assert_eq!(graph.node(NodeId(2)).unwrap().tag(), NodeTag::Dummy);
    }

    #[test]
    fn unknown_successor_fails_with_line() {
        let err = link_str("sensor A : 0 -> B @ C : 1 -> A\nsensor B : 2 -> NOPE @ D : 3 -> C")
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownNodeName {
                name: "NOPE".into(),
                line: 2,
            }
        );
    }

    #[test]
    fn unknown_name_in_distance_fails() {
        let input = format!("{TWO_SENSOR_LOOP}\ndist S1 GHOST 10mm");
        let err = link_str(&input).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownNodeName { ref name, line: 4 } if name == "GHOST"
        ));
    }

    #[test]
    fn branch_edges_fill_both_slots() {
        let (graph, _) = link_str(&passing_loop_track()).unwrap();
        let br = graph.node_by_name("BR1").unwrap();
        let straight = graph.edge(br.edge(0).unwrap()).unwrap();
        let curved = graph.edge(br.edge(1).unwrap()).unwrap();
        assert_eq!(graph.name_of(straight.dest()), "P1");
        assert_eq!(graph.name_of(curved.dest()), "Q1");
        assert_eq!(straight.distance_mm(), 200);
        assert_eq!(curved.distance_mm(), 250);
    }

    #[test]
    fn reverse_kind_inspects_reverse_of_destination() {
        let (graph, _) = link_str(&passing_loop_track()).unwrap();
        let kind = |src: &str, dest: &str| {
            let e = graph.edge_from_names(src, dest, 0).unwrap();
            graph.edge(e).unwrap().reverse_kind()
        };
        assert_eq!(kind("P1", "MR2"), ReverseKind::Straight);
        assert_eq!(kind("Q1", "MR2"), ReverseKind::Curved);
        assert_eq!(kind("P2", "MR1"), ReverseKind::Straight);
        assert_eq!(kind("Q2", "MR1"), ReverseKind::Curved);
        assert_eq!(kind("A1", "BR1"), ReverseKind::Ahead);
        assert_eq!(kind("BR1", "P1"), ReverseKind::Ahead);
    }

    #[test]
    fn exits_have_no_edges() {
        let (graph, _) = link_str(&line_track()).unwrap();
        let exit = graph.node_by_name("EX1").unwrap();
        assert_eq!(exit.edge_ids().count(), 0);
        assert_eq!(exit.reverse(), graph.node_id("EN1").unwrap());
    }

    #[test]
    fn sensor_address_limit() {
        let builder = TrackBuilder::from_records(parse_records(&line_track()).unwrap()).unwrap();
        let options = CompileOptions {
            max_sensor_address: Some(3),
            ..CompileOptions::default()
        };
        let err = link(builder, &options).unwrap_err();
        assert!(matches!(
            err,
            CompileError::SensorAddressOutOfRange { address: 4, max: 3, .. }
        ));
    }

    #[test]
    fn node_count_limit() {
        let builder = TrackBuilder::from_records(parse_records(&line_track()).unwrap()).unwrap();
        let options = CompileOptions {
            max_nodes: Some(8),
            ..CompileOptions::default()
        };
        let err = link(builder, &options).unwrap_err();
        assert_eq!(err, CompileError::TooManyNodes { count: 12, max: 8 });
    }

    #[test]
    fn self_reverse_pair_fills_opposite_edge() {
        let (graph, _) = link_str(TWO_SENSOR_LOOP).unwrap();
        let forward = graph.edge_from_names("S1", "S2", 0).unwrap();
        let back = graph.edge_from_names("S2", "S1", 0).unwrap();
        assert_eq!(graph.edge(forward).unwrap().distance_mm(), 500);
        assert_eq!(graph.edge(back).unwrap().distance_mm(), 500);
    }

    #[test]
    fn huge_sensor_address_is_rejected_before_allocation() {
        let err = link_str("sensor A : 4000000000 -> B @ B : 0 -> A").unwrap_err();
        assert_eq!(
            err,
            CompileError::TooManyNodes {
                count: 4_000_000_001,
                max: DEFAULT_MAX_NODES,
            }
        );
    }

    #[test]
    fn node_limit_is_capped_for_u32_slots() {
        let options = CompileOptions {
            max_nodes: Some(usize::MAX),
            ..CompileOptions::default()
        };
        assert_eq!(options.node_limit(), (u32::MAX / 2) as usize);
    }

    #[test]
    fn pending_declarations_are_handed_on() {
        let (_, pending) = link_str(CALIB_TRIANGLE).unwrap();
        assert_eq!(pending.calibration.len(), 4);
        assert!(pending.mutexes.is_empty());
    }
}
