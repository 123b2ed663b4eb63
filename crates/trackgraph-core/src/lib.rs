//! Trackgraph Core -- the compiler from track descriptions to track graphs.
//!
//! A track description is a line-oriented list of records (sensor pairs,
//! switches, separators, entry/exit pairs, distances, mutex seeds and a
//! calibration loop). Compiling it yields a fully linked, validated,
//! bidirectional graph that a train control runtime can index directly.
//!
//! # Pipeline
//!
//! [`compile::compile`] runs these stages in order and stops at the first
//! error:
//!
//! 1. **Parse** -- every line becomes a typed [`record::Record`].
//! 2. **Register** -- [`builder::TrackBuilder`] collects node declarations
//!    by name and rejects duplicate names and sensor addresses.
//! 3. **Link** -- identities are assigned (sensor `n` at index `n`, dummies
//!    in unused address slots), names are resolved, edges are created and
//!    distances attached in both directions.
//! 4. **Check** -- reverse symmetry, edge ownership and edge reversibility.
//! 5. **Mutex closure** -- declared edge groups are closed under reverse and
//!    branch-sibling, merged on overlap, and the rest become singletons.
//! 6. **Calibration** -- the declared loop is walked to derive per-sensor
//!    distances and branch orientations.
//!
//! # Key Types
//!
//! - [`compile::CompiledTrack`] -- Result of a compilation.
//! - [`graph::TrackGraph`] -- Node and edge arenas with name lookup.
//! - [`node::NodeKind`] -- Node variants, generic over how successors are
//!   referenced (names before linking, ids after).
//! - [`mutex::MutexTable`] -- Partition of the edges into mutex groups.
//! - [`calibration::CalibrationCycle`] -- Extracted calibration loop.
//! - [`pathfind::shortest_path`] -- Distance-weighted routes.

pub mod builder;
pub mod calibration;
pub mod compile;
pub mod error;
pub mod graph;
pub mod id;
pub mod link;
pub mod mutex;
pub mod node;
pub mod pathfind;
pub mod record;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use compile::{
    compile, compile_many, compile_with, CompileOptions, CompiledTrack, DEFAULT_MAX_NODES,
};
pub use error::CompileError;
