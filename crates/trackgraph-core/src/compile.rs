//! The compile pipeline: records in, a validated [`CompiledTrack`] out.
//!
//! ```text
//! parse -> register -> link -> check -> mutex closure -> calibration
//! ```
//!
//! Each run is independent; nothing is shared between compilations.

use crate::builder::TrackBuilder;
use crate::calibration::{self, CalibrationCycle};
use crate::error::CompileError;
use crate::graph::TrackGraph;
use crate::link;
use crate::mutex::MutexTable;
use crate::record::parse_records;
use crate::validation;
use serde::{Deserialize, Serialize};

/// Node limit used when `max_nodes` is not set.
pub const DEFAULT_MAX_NODES: usize = 1 << 16;

/// Knobs for one compilation. Every field is optional in config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Upper bound on the node array, dummies included. Defaults to
    /// [`DEFAULT_MAX_NODES`].
    pub max_nodes: Option<usize>,
    /// Highest sensor address the runtime can index.
    pub max_sensor_address: Option<u32>,
    /// Fail instead of warning when an edge has no declared distance.
    pub require_distances: bool,
}

impl CompileOptions {
    /// The node limit in effect. Edge slots are `2 * node + slot` in a
    /// `u32`, which caps any configured value.
    pub fn node_limit(&self) -> usize {
        self.max_nodes
            .unwrap_or(DEFAULT_MAX_NODES)
            .min((u32::MAX / 2) as usize)
    }
}

/// A fully linked and validated track.
#[derive(Debug, Clone)]
pub struct CompiledTrack {
    graph: TrackGraph,
    mutexes: MutexTable,
    calibration: Option<CalibrationCycle>,
}

impl CompiledTrack {
    pub fn graph(&self) -> &TrackGraph {
        &self.graph
    }

    pub fn mutexes(&self) -> &MutexTable {
        &self.mutexes
    }

    /// The calibration loop, if the input declared one.
    pub fn calibration(&self) -> Option<&CalibrationCycle> {
        self.calibration.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn graph_mut_for_tests(&mut self) -> &mut TrackGraph {
        &mut self.graph
    }
}

/// Compile with default options.
pub fn compile(input: &str) -> Result<CompiledTrack, CompileError> {
    compile_with(input, &CompileOptions::default())
}

pub fn compile_with(input: &str, options: &CompileOptions) -> Result<CompiledTrack, CompileError> {
    let records = parse_records(input)?;
    tracing::debug!(records = records.len(), "parsed track records");

    let builder = TrackBuilder::from_records(records)?;
    tracing::debug!(declared = builder.declared_count(), "registered nodes");

    let (graph, pending) = link::link(builder, options)?;
    validation::check_graph(&graph)?;

    let mutexes = MutexTable::build(&graph, &pending.mutexes)?;
    let calibration = calibration::extract(&graph, &pending.calibration)?;

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        groups = mutexes.group_count(),
        calibrated = calibration.is_some(),
        "compiled track"
    );
    Ok(CompiledTrack {
        graph,
        mutexes,
        calibration,
    })
}

/// Compile several named inputs. Results keep the input order.
///
/// Runs on the rayon pool with the `parallel` feature, serially otherwise.
pub fn compile_many<'a>(
    inputs: &[(&'a str, &str)],
    options: &CompileOptions,
) -> Vec<(&'a str, Result<CompiledTrack, CompileError>)> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|&(name, input)| (name, compile_with(input, options)))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        inputs
            .iter()
            .map(|&(name, input)| (name, compile_with(input, options)))
            .collect()
    }
}
