//! Node and edge variants shared by the unresolved and resolved graphs.
//!
//! [`NodeKind`] is generic over its reference type: the builder holds
//! `NodeKind<String>` (successors named) and the linker turns it into
//! `NodeKind<NodeId>` (successors resolved). The two states never mix.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// Variant-specific payload of a node, parameterized by how successors are
/// referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind<R> {
    /// A sensor with a globally unique address.
    Sensor { address: u32, ahead: R },
    /// A non-sensing boundary.
    Separator { ahead: R },
    /// A turn-out in the branching direction.
    Branch { number: u32, straight: R, curved: R },
    /// A turn-out in the merging direction.
    Merge { number: u32, ahead: R },
    /// Track end point, facing in.
    Enter { ahead: R },
    /// Track end point, facing out. No outgoing edge.
    Exit,
    /// Fills an unused sensor address.
    Dummy,
}

/// The variant of a node without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Dummy,
    Sensor,
    Branch,
    Merge,
    Enter,
    Exit,
    Separator,
}

impl NodeTag {
    /// Number of real outgoing edges a node of this variant has.
    pub fn edge_count(self) -> usize {
        match self {
            NodeTag::Dummy | NodeTag::Exit => 0,
            NodeTag::Branch => 2,
            NodeTag::Sensor | NodeTag::Merge | NodeTag::Enter | NodeTag::Separator => 1,
        }
    }
}

/// Which branch choice of the destination's reverse node an edge
/// corresponds to when travelled backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseKind {
    /// The reverse node is not a branch.
    Ahead,
    /// The reverse node is a branch and this edge pairs with its straight edge.
    Straight,
    /// The reverse node is a branch and this edge pairs with its curved edge.
    Curved,
}

impl ReverseKind {
    /// Slot on the reverse node that holds the matching edge.
    pub fn slot(self) -> usize {
        match self {
            ReverseKind::Ahead | ReverseKind::Straight => 0,
            ReverseKind::Curved => 1,
        }
    }
}

impl<R> NodeKind<R> {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Sensor { .. } => NodeTag::Sensor,
            NodeKind::Separator { .. } => NodeTag::Separator,
            NodeKind::Branch { .. } => NodeTag::Branch,
            NodeKind::Merge { .. } => NodeTag::Merge,
            NodeKind::Enter { .. } => NodeTag::Enter,
            NodeKind::Exit => NodeTag::Exit,
            NodeKind::Dummy => NodeTag::Dummy,
        }
    }

    /// Successors in slot order: `[straight, curved]` for branches, the
    /// single successor in slot 0 otherwise.
    pub fn successors(&self) -> [Option<&R>; 2] {
        match self {
            NodeKind::Sensor { ahead, .. }
            | NodeKind::Separator { ahead }
            | NodeKind::Merge { ahead, .. }
            | NodeKind::Enter { ahead } => [Some(ahead), None],
            NodeKind::Branch {
                straight, curved, ..
            } => [Some(straight), Some(curved)],
            NodeKind::Exit | NodeKind::Dummy => [None, None],
        }
    }

    /// Sensor address, or `None` for every other variant.
    pub fn address(&self) -> Option<u32> {
        match self {
            NodeKind::Sensor { address, .. } => Some(*address),
            _ => None,
        }
    }

    /// Switch number for branches and merges.
    pub fn switch_number(&self) -> Option<u32> {
        match self {
            NodeKind::Branch { number, .. } | NodeKind::Merge { number, .. } => Some(*number),
            _ => None,
        }
    }

    /// Rewrite every successor reference through `f`, stopping at the first
    /// error.
    pub fn try_map<S, E>(self, mut f: impl FnMut(R) -> Result<S, E>) -> Result<NodeKind<S>, E> {
        Ok(match self {
            NodeKind::Sensor { address, ahead } => NodeKind::Sensor {
                address,
                ahead: f(ahead)?,
            },
            NodeKind::Separator { ahead } => NodeKind::Separator { ahead: f(ahead)? },
            NodeKind::Branch {
                number,
                straight,
                curved,
            } => NodeKind::Branch {
                number,
                straight: f(straight)?,
                curved: f(curved)?,
            },
            NodeKind::Merge { number, ahead } => NodeKind::Merge {
                number,
                ahead: f(ahead)?,
            },
            NodeKind::Enter { ahead } => NodeKind::Enter { ahead: f(ahead)? },
            NodeKind::Exit => NodeKind::Exit,
            NodeKind::Dummy => NodeKind::Dummy,
        })
    }
}

impl NodeKind<NodeId> {
    /// Straight successor if this is a branch.
    pub fn straight(&self) -> Option<NodeId> {
        match self {
            NodeKind::Branch { straight, .. } => Some(*straight),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, NodeKind::Branch { .. })
    }
}
