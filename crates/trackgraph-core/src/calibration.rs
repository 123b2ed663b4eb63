//! Calibration loop extraction.
//!
//! The track description may name a closed loop of nodes (`calib` records).
//! Walking it yields, for every sensor on the loop, the track distance from
//! the previous sensor, and for every branch the way it has to be thrown.

use crate::builder::CalibrationStep;
use crate::error::CompileError;
use crate::graph::TrackGraph;
use crate::id::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A sensor on the loop and the distance travelled since the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSensor {
    pub node: NodeId,
    /// Sum of edge distances, so wider than a single edge.
    pub distance_mm: u64,
}

/// A branch on the loop and whether the loop takes its curved edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBranch {
    pub node: NodeId,
    pub curved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationCycle {
    /// Loop nodes in declaration order, without the closing repeat.
    pub nodes: Vec<NodeId>,
    /// `edges[i]` leads from `nodes[i]` to `nodes[(i + 1) % len]`.
    pub edges: Vec<EdgeId>,
    /// Sensors in loop order.
    pub sensors: Vec<CalibrationSensor>,
    /// Branches in order of first appearance.
    pub branches: Vec<CalibrationBranch>,
}

impl CalibrationCycle {
    /// Sum of the edge distances around the loop.
    pub fn total_distance(&self, graph: &TrackGraph) -> u64 {
        self.edges
            .iter()
            .filter_map(|&e| graph.edge(e))
            .map(|e| u64::from(e.distance_mm()))
            .sum()
    }
}

/// Extract the calibration loop. `Ok(None)` when no steps were declared.
pub fn extract(
    graph: &TrackGraph,
    steps: &[CalibrationStep],
) -> Result<Option<CalibrationCycle>, CompileError> {
    let mut steps = steps;
    if steps.len() > 1 && steps.first().map(|s| &s.node) == steps.last().map(|s| &s.node) {
        steps = &steps[..steps.len() - 1];
    }
    let Some(first) = steps.first() else {
        return Ok(None);
    };

    let nodes = steps
        .iter()
        .map(|step| {
            graph
                .node_id(&step.node)
                .ok_or_else(|| CompileError::UnknownNodeName {
                    name: step.node.clone(),
                    line: step.line,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = nodes.len();
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let (src, dest) = (nodes[i], nodes[(i + 1) % n]);
        let edge = graph
            .edge_between(src, dest)
            .ok_or_else(|| CompileError::InvalidCalibrationCycle {
                reason: format!(
                    "no edge from '{}' to '{}'",
                    graph.name_of(src),
                    graph.name_of(dest)
                ),
                line: steps[i].line,
            })?;
        edges.push(edge);
    }

    let mut sensors: Vec<CalibrationSensor> = Vec::new();
    let mut branches: Vec<CalibrationBranch> = Vec::new();
    let mut span: u64 = 0;
    for (&node, &edge_id) in nodes.iter().zip(&edges) {
        if graph.is_sensor(node) {
            sensors.push(CalibrationSensor {
                node,
                distance_mm: span,
            });
            span = 0;
        }
        let Some(edge) = graph.edge(edge_id) else {
            continue;
        };
        if graph.is_branch(node) {
            let curved = edge.is_curved();
            match branches.iter_mut().find(|b| b.node == node) {
                Some(existing) => existing.curved = curved,
                None => branches.push(CalibrationBranch { node, curved }),
            }
        }
        span += u64::from(edge.distance_mm());
    }

    let Some(head) = sensors.first_mut() else {
        return Err(CompileError::InvalidCalibrationCycle {
            reason: "loop passes no sensor".to_string(),
            line: first.line,
        });
    };
    head.distance_mm += span;

    tracing::debug!(
        nodes = n,
        sensors = sensors.len(),
        branches = branches.len(),
        "calibration loop extracted"
    );
    Ok(Some(CalibrationCycle {
        nodes,
        edges,
        sensors,
        branches,
    }))
}
