//! Monotone status propagation and usefulness back-propagation over a
//! [`StatusGraph`].

use crate::graph::{Combinator, StatusGraph, VertexKind};
use crate::name::Name;
use crate::status::{status_and, status_or, Status};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashMap;

/// A mutable valuation over a [`StatusGraph`]'s vertices, plus the
/// `useful` bitset computed by [`StatusMap::backpropagate_useful`].
pub struct StatusMap<'g> {
    graph: &'g StatusGraph,
    current: Vec<Status>,
    useful: Vec<bool>,
}

impl<'g> StatusMap<'g> {
    /// Builds the initial valuation: every vertex starts at
    /// `unreachable`, then each `non_entity_sources` vertex is forced to
    /// `pass` and each task vertex is seeded from `task_status` (falling
    /// back to `pending` if the store has no value for it yet). Changes
    /// made during seeding enqueue their downstream vertices, so the
    /// first call to [`StatusMap::iterate`] picks up where this leaves
    /// off.
    pub fn new(graph: &'g StatusGraph, task_status: impl Fn(&Name) -> Option<Status>) -> Self {
        let n = graph.len();
        let mut map = Self {
            graph,
            current: vec![Status::Unreachable; n],
            useful: vec![false; n],
        };

        let mut dirty = vec![false; n];
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        let mut cross_dirty = vec![false; n];
        let mut cross_dirty_list = Vec::new();

        for &rank in graph.non_entity_sources() {
            map.set_status(rank, Status::Pass, &mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
        }
        for &rank in graph.tasks() {
            let name = &graph.vertex(rank).name;
            let seed = task_status(name).unwrap_or(Status::Pending);
            map.set_status(rank, seed, &mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
        }

        map.drain(&mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
        map
    }

    pub fn status(&self, rank: usize) -> Status {
        self.current[rank]
    }

    pub fn useful(&self, rank: usize) -> bool {
        self.useful[rank]
    }

    /// Sets `rank`'s value directly; used by the scheduler to apply a
    /// `ProofStatusEvent` to its task vertex before re-running
    /// [`StatusMap::iterate`].
    pub fn set_task_status(&mut self, rank: usize, status: Status) {
        let mut dirty = vec![false; self.graph.len()];
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        let mut cross_dirty = vec![false; self.graph.len()];
        let mut cross_dirty_list = Vec::new();
        self.set_status(rank, status, &mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
        self.drain(&mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
    }

    fn set_status(
        &mut self,
        rank: usize,
        new_status: Status,
        heap: &mut BinaryHeap<Reverse<usize>>,
        dirty: &mut [bool],
        cross_dirty: &mut [bool],
        cross_dirty_list: &mut Vec<usize>,
    ) {
        if self.current[rank] == new_status {
            return;
        }
        self.current[rank] = new_status;
        if self.graph.cross_order(rank).is_some() && !cross_dirty[rank] {
            cross_dirty[rank] = true;
            cross_dirty_list.push(rank);
        }
        for &target in self.graph.out_edges(rank) {
            if !dirty[target] {
                dirty[target] = true;
                heap.push(Reverse(target));
            }
        }
    }

    /// Runs the dirty-queue / cross-flush loop to a fixpoint, starting
    /// from whatever is already enqueued. Re-running `iterate` on an
    /// already-settled map is a no-op (idempotent fixpoint).
    pub fn iterate(&mut self) {
        let n = self.graph.len();
        let mut dirty = vec![false; n];
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        let mut cross_dirty = vec![false; n];
        let mut cross_dirty_list = Vec::new();
        // Re-seed the queue from every vertex with a combinator of its
        // own, since after construction or an external task-status
        // change we don't know in advance which ones are already
        // consistent. `Cross` vertices are excluded: they're never an
        // edge target, so recomputing one through its (empty) `or`
        // would collapse it to `unreachable`. Its value only ever comes
        // from the entity->cross flush below, so every entity with a
        // cross pairing is marked cross-dirty directly instead,
        // bypassing `set_status` (which only flushes on a value
        // change, and a settled entity's value won't change this pass).
        for rank in 0..n {
            let kind = self.graph.vertex(rank).kind;
            if kind == VertexKind::Task || kind == VertexKind::Cross {
                continue;
            }
            dirty[rank] = true;
            heap.push(Reverse(rank));
            if self.graph.cross_order(rank).is_some() && !cross_dirty[rank] {
                cross_dirty[rank] = true;
                cross_dirty_list.push(rank);
            }
        }
        self.drain(&mut heap, &mut dirty, &mut cross_dirty, &mut cross_dirty_list);
    }

    fn drain(
        &mut self,
        heap: &mut BinaryHeap<Reverse<usize>>,
        dirty: &mut [bool],
        cross_dirty: &mut [bool],
        cross_dirty_list: &mut Vec<usize>,
    ) {
        loop {
            while let Some(Reverse(v)) = heap.pop() {
                dirty[v] = false;
                let kind = self.graph.vertex(v).kind;
                if kind == VertexKind::Task {
                    continue;
                }
                let combinator = kind.combinator();
                let Some(combinator) = combinator else { continue };
                let inputs = self.graph.in_edges(v).iter().map(|&u| self.current[u]);
                let recomputed = match combinator {
                    Combinator::And => status_and(inputs),
                    Combinator::Or => status_or(inputs),
                };
                self.set_status(v, recomputed, heap, dirty, cross_dirty, cross_dirty_list);
            }

            if cross_dirty_list.is_empty() {
                break;
            }
            let flush = std::mem::take(cross_dirty_list);
            for entity_rank in flush {
                cross_dirty[entity_rank] = false;
                let Some(cross_rank) = self.graph.cross_order(entity_rank) else {
                    continue;
                };
                let value = self.current[entity_rank];
                self.set_status(cross_rank, value, heap, dirty, cross_dirty, cross_dirty_list);
            }
        }
    }

    /// Marks every non-proof sink useful, then back-propagates through
    /// in-edges (max-heap over rank, highest first), also crossing
    /// `cross -> entity` in reverse. Must run after [`StatusMap::iterate`]
    /// has settled the statuses this pass reasons about.
    pub fn backpropagate_useful(&mut self) {
        let n = self.graph.len();
        self.useful = vec![false; n];
        let mut dirty = vec![false; n];
        let mut heap: BinaryHeap<usize> = BinaryHeap::new();

        for &sink in self.graph.sinks() {
            if self.graph.vertex(sink).kind != VertexKind::Proof {
                self.set_useful(sink, &mut heap, &mut dirty);
            }
        }

        while let Some(v) = heap.pop() {
            dirty[v] = false;
            for &pred in self.graph.in_edges(v) {
                self.set_useful(pred, &mut heap, &mut dirty);
            }
            if let Some(entity_rank) = self.graph.cross_order_inv(v) {
                self.set_useful(entity_rank, &mut heap, &mut dirty);
            }
        }
    }

    fn set_useful(&mut self, rank: usize, heap: &mut BinaryHeap<usize>, dirty: &mut [bool]) {
        if self.useful[rank] {
            return;
        }
        if self.current[rank].is_terminal() {
            return;
        }
        self.useful[rank] = true;
        if !dirty[rank] {
            dirty[rank] = true;
            heap.push(rank);
        }
    }

    /// A convenience snapshot of every vertex's status keyed by name,
    /// for reporting. Where several kinds share a name, the entity kind
    /// wins; callers that need a specific kind should use
    /// [`StatusGraph::rank_of`] directly.
    pub fn entity_status_snapshot(&self) -> HashMap<Name, Status> {
        let mut out = HashMap::new();
        for rank in 0..self.graph.len() {
            let key = self.graph.vertex(rank);
            if key.kind == VertexKind::Entity {
                out.insert(key.name.clone(), self.current[rank]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AssertItem, AssumeItem, Invariant, Proof, ProofItem, SolveSet};
    use crate::graph::StatusGraph;
    use crate::entity::EntityModel;

    fn n(s: &str) -> Name {
        Name::root().child_instance(s)
    }

    fn build_simple() -> StatusGraph {
        let mut model = EntityModel::new();
        model.insert_invariant(Invariant {
            name: n("inv"),
            src_loc: "x:1".into(),
            solve: false,
            solves: SolveSet::default(),
        });
        model.insert_proof(Proof {
            name: n("pf"),
            src_loc: "x:2".into(),
            top_level: true,
            automatic: true,
            items: vec![ProofItem::Assert(AssertItem {
                name: n("inv"),
                local: false,
            })],
            solve: false,
            solves: SolveSet::default(),
        });
        model.resolve_solves();
        StatusGraph::build(&model)
    }

    #[test]
    fn pass_propagates_from_task_to_entity() {
        let graph = build_simple();
        let mut map = StatusMap::new(&graph, |name| {
            if *name == n("pf") {
                Some(Status::Pass)
            } else {
                None
            }
        });
        map.iterate();
        let entity_inv = graph.rank_of(&crate::graph::VertexKey::new(
            crate::graph::VertexKind::Entity,
            n("inv"),
        ))
        .unwrap();
        assert_eq!(map.status(entity_inv), Status::Pass);
    }

    #[test]
    fn iterate_is_idempotent() {
        let graph = build_simple();
        let mut map = StatusMap::new(&graph, |name| {
            if *name == n("pf") {
                Some(Status::Pass)
            } else {
                None
            }
        });
        map.iterate();
        let snapshot_before = map.entity_status_snapshot();
        map.iterate();
        let snapshot_after = map.entity_status_snapshot();
        assert_eq!(snapshot_before, snapshot_after);
    }

    /// `p2` cross-assumes `p1`, which pairs `entity(p1)` with a
    /// `cross(p1)` vertex that has no real in-edges of its own. A settled
    /// map's `iterate` must never recompute `cross(p1)` through its empty
    /// `or` (collapsing it to `unreachable`); it must stay pinned to
    /// `entity(p1)` via the flush, no matter how many times `iterate`
    /// runs.
    fn build_cross_assumption() -> StatusGraph {
        let mut model = EntityModel::new();
        model.insert_proof(Proof {
            name: n("p1"),
            src_loc: "x:1".into(),
            top_level: true,
            automatic: false,
            items: vec![],
            solve: false,
            solves: SolveSet::default(),
        });
        model.insert_proof(Proof {
            name: n("p2"),
            src_loc: "x:2".into(),
            top_level: true,
            automatic: false,
            items: vec![ProofItem::Assume(AssumeItem {
                name: n("p1"),
                cross: true,
            })],
            solve: false,
            solves: SolveSet::default(),
        });
        model.resolve_solves();
        StatusGraph::build(&model)
    }

    #[test]
    fn iterate_keeps_cross_vertex_pinned_to_its_entity() {
        let graph = build_cross_assumption();
        let entity_p1 = graph
            .rank_of(&crate::graph::VertexKey::new(crate::graph::VertexKind::Entity, n("p1")))
            .unwrap();
        let cross_p1 = graph
            .rank_of(&crate::graph::VertexKey::new(crate::graph::VertexKind::Cross, n("p1")))
            .unwrap();

        let mut map = StatusMap::new(&graph, |_| None);
        assert_eq!(map.status(entity_p1), Status::Pass);
        assert_eq!(map.status(cross_p1), Status::Pass);

        map.iterate();
        assert_eq!(map.status(cross_p1), map.status(entity_p1));

        map.iterate();
        assert_eq!(map.status(cross_p1), map.status(entity_p1));
    }

    #[test]
    fn sink_entity_is_useful_until_terminal() {
        let graph = build_simple();
        let mut map = StatusMap::new(&graph, |_| None);
        map.iterate();
        map.backpropagate_useful();
        let entity_inv = graph.rank_of(&crate::graph::VertexKey::new(
            crate::graph::VertexKind::Entity,
            n("inv"),
        ))
        .unwrap();
        assert!(map.useful(entity_inv));
    }
}
