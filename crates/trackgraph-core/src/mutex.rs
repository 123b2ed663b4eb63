//! Mutex groups: sets of edges the runtime must never reserve together.
//!
//! A declared group is seeded with named edges and closed under two rules
//! until nothing changes:
//!
//! 1. an edge and its reverse edge share a group;
//! 2. all edges leaving a branch share a group.
//!
//! A closed group that overlaps an earlier one is merged into it. Edges no
//! declaration reaches get a singleton group each, so the groups partition
//! the edge set.

use crate::builder::MutexDecl;
use crate::error::CompileError;
use crate::graph::TrackGraph;
use crate::id::{EdgeId, MutexGroupId};
use std::collections::{BTreeSet, HashMap};

/// One mutex group. Members are in ascending edge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexGroup {
    pub id: MutexGroupId,
    pub members: Vec<EdgeId>,
    /// Whether the group came from a `mutex` declaration.
    pub declared: bool,
}

impl MutexGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.members.binary_search(&edge).is_ok()
    }
}

/// Partition of every edge of a graph into mutex groups.
#[derive(Debug, Clone, Default)]
pub struct MutexTable {
    groups: Vec<MutexGroup>,
    /// Indexed by `EdgeId`.
    group_of: Vec<MutexGroupId>,
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

/// One closure step: `set` plus the reverse edge of every member and every
/// sibling of a member whose source is a branch.
pub fn expand(graph: &TrackGraph, set: &BTreeSet<EdgeId>) -> BTreeSet<EdgeId> {
    let mut next = set.clone();
    for &edge in set {
        if let Some(rev) = graph.reverse_edge(edge) {
            next.insert(rev);
        }
        let Some(src) = graph.edge(edge).map(|e| e.src()) else {
            continue;
        };
        if graph.is_branch(src) {
            next.extend(graph.sibling_edges(edge));
        }
    }
    next
}

/// Iterate [`expand`] until a pass adds nothing.
pub fn close(graph: &TrackGraph, seed: BTreeSet<EdgeId>) -> BTreeSet<EdgeId> {
    let mut current = seed;
    let mut rounds = 0usize;
    loop {
        let next = expand(graph, &current);
        rounds += 1;
        if next.len() == current.len() {
            tracing::trace!(rounds, size = current.len(), "mutex closure converged");
            return current;
        }
        current = next;
    }
}

/// Whether `set` is closed under both rules.
pub fn is_closed(graph: &TrackGraph, set: &BTreeSet<EdgeId>) -> bool {
    expand(graph, set).len() == set.len()
}

// ---------------------------------------------------------------------------
// MutexTable
// ---------------------------------------------------------------------------

impl MutexTable {
    /// Close every declaration in order, merge overlapping groups, then give
    /// every remaining edge its own group.
    pub fn build(graph: &TrackGraph, decls: &[MutexDecl]) -> Result<Self, CompileError> {
        let mut closed: Vec<BTreeSet<EdgeId>> = Vec::new();
        let mut owner: HashMap<EdgeId, usize> = HashMap::new();

        for decl in decls {
            let seed = decl
                .edges
                .iter()
                .map(|(src, dest)| graph.edge_from_names(src, dest, decl.line))
                .collect::<Result<BTreeSet<_>, _>>()?;
            let set = close(graph, seed);

            let overlapping: BTreeSet<usize> =
                set.iter().filter_map(|e| owner.get(e)).copied().collect();
            let target = match overlapping.first() {
                None => {
                    closed.push(set);
                    closed.len() - 1
                }
                Some(&first) => {
                    tracing::warn!(
                        line = decl.line,
                        groups = overlapping.len(),
                        "mutex group overlaps an earlier group, merging"
                    );
                    let mut merged = std::mem::take(&mut closed[first]);
                    merged.extend(set);
                    for &other in overlapping.iter().skip(1) {
                        merged.extend(std::mem::take(&mut closed[other]));
                    }
                    closed[first] = merged;
                    first
                }
            };
            for &edge in &closed[target] {
                owner.insert(edge, target);
            }
        }

        let mut table = MutexTable {
            groups: Vec::new(),
            group_of: vec![MutexGroupId(u32::MAX); graph.edge_count()],
        };
        for set in closed.into_iter().filter(|s| !s.is_empty()) {
            table.push_group(set.into_iter().collect(), true);
        }
        let declared = table.groups.len();
        for edge in graph.edges() {
            if table.group_of[edge.id().index()].0 == u32::MAX {
                table.push_group(vec![edge.id()], false);
            }
        }
        tracing::debug!(
            declared,
            total = table.groups.len(),
            "mutex groups assigned"
        );
        Ok(table)
    }

    fn push_group(&mut self, members: Vec<EdgeId>, declared: bool) {
        let id = MutexGroupId(self.groups.len() as u32);
        for edge in &members {
            self.group_of[edge.index()] = id;
        }
        self.groups.push(MutexGroup {
            id,
            members,
            declared,
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn groups(&self) -> &[MutexGroup] {
        &self.groups
    }

    pub fn group(&self, id: MutexGroupId) -> Option<&MutexGroup> {
        self.groups.get(id.index())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group an edge belongs to.
    pub fn group_of(&self, edge: EdgeId) -> Option<MutexGroupId> {
        self.group_of.get(edge.index()).copied()
    }

    /// Size of the group an edge belongs to; 0 for unknown edges.
    pub fn group_size(&self, edge: EdgeId) -> usize {
        self.group_of(edge)
            .and_then(|g| self.group(g))
            .map_or(0, MutexGroup::len)
    }

    /// Groups that came from `mutex` declarations.
    pub fn declared_groups(&self) -> impl Iterator<Item = &MutexGroup> + '_ {
        self.groups.iter().filter(|g| g.declared)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::test_utils::*;

    fn edge(graph: &TrackGraph, src: &str, dest: &str) -> EdgeId {
        graph.edge_from_names(src, dest, 0).unwrap()
    }

    #[test]
    fn undeclared_edges_get_singletons() {
        let track = compile(&passing_loop_track()).unwrap();
        let table = track.mutexes();
        assert_eq!(table.group_count(), track.graph().edge_count());
        for e in track.graph().edges() {
            assert_eq!(table.group_size(e.id()), 1);
        }
        assert_eq!(table.declared_groups().count(), 0);
    }

    #[test]
    fn branch_edge_pulls_in_siblings_and_reverses() {
        let input = format!("{}\nmutex BR1 P1\n", passing_loop_track());
        let track = compile(&input).unwrap();
        let graph = track.graph();
        let table = track.mutexes();

        let expected = [
            edge(graph, "BR1", "P1"),
            edge(graph, "BR1", "Q1"),
            edge(graph, "P2", "MR1"),
            edge(graph, "Q2", "MR1"),
        ];
        let group = table.group_of(expected[0]).unwrap();
        for e in expected {
            assert_eq!(table.group_of(e), Some(group));
            assert_eq!(table.group_size(e), 4);
        }
        assert_eq!(group, MutexGroupId(0));
        assert_eq!(table.group_count(), graph.edge_count() - 3);
    }

    #[test]
    fn closure_reaches_through_merge_reverse() {
        // P1 -> MR2 reverses to BR2 -> P2, a branch edge, which pulls in
        // BR2 -> Q2 and its reverse Q1 -> MR2.
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        let seed = BTreeSet::from([edge(graph, "P1", "MR2")]);
        let set = close(graph, seed);
        let expected = BTreeSet::from([
            edge(graph, "P1", "MR2"),
            edge(graph, "BR2", "P2"),
            edge(graph, "BR2", "Q2"),
            edge(graph, "Q1", "MR2"),
        ]);
        assert_eq!(set, expected);
        assert!(is_closed(graph, &set));
    }

    #[test]
    fn closing_a_closed_set_is_a_no_op() {
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        let set = close(graph, BTreeSet::from([edge(graph, "BR1", "Q1")]));
        assert_eq!(close(graph, set.clone()), set);
        assert_eq!(expand(graph, &set), set);
    }

    #[test]
    fn plain_edge_pairs_with_its_reverse() {
        let track = compile(&passing_loop_track()).unwrap();
        let graph = track.graph();
        let set = close(graph, BTreeSet::from([edge(graph, "A3", "A5")]));
        assert_eq!(
            set,
            BTreeSet::from([edge(graph, "A3", "A5"), edge(graph, "A6", "A4")])
        );
    }

    #[test]
    fn overlapping_declarations_merge() {
        let input = format!(
            "{}\nmutex BR1 P1\nmutex A3 A5\nmutex Q2 MR1 : A4 BR2\n",
            passing_loop_track()
        );
        let track = compile(&input).unwrap();
        let graph = track.graph();
        let table = track.mutexes();

        // Third declaration touches the first group (Q2 -> MR1), so they merge;
        // the second stays on its own.
        let declared: Vec<&MutexGroup> = table.declared_groups().collect();
        assert_eq!(declared.len(), 2);
        let first = table.group_of(edge(graph, "BR1", "P1")).unwrap();
        assert_eq!(table.group_of(edge(graph, "A4", "BR2")), Some(first));
        assert_eq!(table.group_of(edge(graph, "MR2", "A3")), Some(first));
        assert_eq!(table.group_size(edge(graph, "BR1", "P1")), 6);
        let second = table.group_of(edge(graph, "A3", "A5")).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.group_size(edge(graph, "A6", "A4")), 2);
    }

    #[test]
    fn later_declaration_bridging_two_groups_merges_all() {
        let input = format!(
            "{}\nmutex A1 BR1\nmutex A3 A5\nmutex BR1 P1 : A3 A5 : A1 BR1\n",
            passing_loop_track()
        );
        let track = compile(&input).unwrap();
        let graph = track.graph();
        let table = track.mutexes();
        assert_eq!(table.declared_groups().count(), 1);
        let g = table.group_of(edge(graph, "A1", "BR1")).unwrap();
        assert_eq!(table.group_of(edge(graph, "A6", "A4")), Some(g));
        assert_eq!(table.group_of(edge(graph, "Q2", "MR1")), Some(g));
    }

    #[test]
    fn unknown_edge_in_declaration_fails() {
        let input = format!("{}\nmutex A1 A3\n", passing_loop_track());
        let err = compile(&input).unwrap_err();
        match err {
            CompileError::UnknownEdge { src, dest, .. } => {
                assert_eq!(src, "A1");
                assert_eq!(dest, "A3");
            }
            other => panic!("expected UnknownEdge, got {other:?}"),
        }
    }

    #[test]
    fn every_edge_in_exactly_one_group() {
        let input = format!("{}\nmutex BR2 Q2 : A5 A1\n", passing_loop_track());
        let track = compile(&input).unwrap();
        let table = track.mutexes();
        let mut seen = vec![0usize; track.graph().edge_count()];
        for group in table.groups() {
            for e in &group.members {
                seen[e.index()] += 1;
                assert_eq!(table.group_of(*e), Some(group.id));
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }
}
