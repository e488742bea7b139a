//! The typed multi-kind status dependency graph.
//!
//! Vertices are addressed by `(kind, name)` but, once construction
//! finishes, every algorithm operates on plain integer ranks: the
//! constructor assigns each vertex a rank equal to its emission order
//! from a Tarjan pass over the edge-reversed graph, so sources (tasks
//! and other no-predecessor vertices) get the lowest ranks and sinks the
//! highest. `current_status`/`useful` in [`crate::statusmap`] are then
//! parallel arrays indexed by rank, not hash maps.

use crate::entity::{Entity, EntityModel};
use crate::name::Name;
use crate::order::OrderedMap;
use crate::scc::find_sccs_indexed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Task,
    Proof,
    AssumeProof,
    Entity,
    Cross,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexKey {
    pub kind: VertexKind,
    pub name: Name,
}

impl VertexKey {
    pub fn new(kind: VertexKind, name: Name) -> Self {
        Self { kind, name }
    }
}

/// The combinator a vertex's kind reduces its in-edges with, per the
/// data model table. `Cross` has no combinator of its own: its value is
/// copied from the paired `Entity` vertex in a separate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl VertexKind {
    pub fn combinator(self) -> Option<Combinator> {
        match self {
            VertexKind::Proof | VertexKind::AssumeProof | VertexKind::Export => {
                Some(Combinator::And)
            }
            VertexKind::Entity | VertexKind::Cross => Some(Combinator::Or),
            VertexKind::Task => None,
        }
    }
}

/// The status graph: immutable topology computed once from an
/// [`EntityModel`]. `StatusMap` (in [`crate::statusmap`]) holds the
/// mutable valuation over it.
#[derive(Debug, Clone)]
pub struct StatusGraph {
    vertex_by_rank: Vec<VertexKey>,
    rank_of: OrderedMap<VertexKey, usize>,
    in_edges: Vec<Vec<usize>>,
    out_edges: Vec<Vec<usize>>,
    cross_order_map: Vec<Option<usize>>,
    cross_order_inv_map: Vec<Option<usize>>,
    non_entity_sources: Vec<usize>,
    tasks: Vec<usize>,
    sinks: Vec<usize>,
}

struct EdgeCollector {
    vertices: OrderedMap<VertexKey, ()>,
    edges: Vec<(usize, usize)>,
}

impl EdgeCollector {
    fn new() -> Self {
        Self {
            vertices: OrderedMap::new(),
            edges: Vec::new(),
        }
    }

    fn vertex(&mut self, key: VertexKey) -> usize {
        self.vertices.insert(key, ())
    }

    fn edge(&mut self, from: VertexKey, to: VertexKey) {
        let fi = self.vertex(from);
        let ti = self.vertex(to);
        self.edges.push((fi, ti));
    }
}

impl StatusGraph {
    /// Builds the graph by generating edges from every entity's items
    /// (§4.2), then computing ranks, in/out adjacency, cross-pairing
    /// indices, and the `non_entity_sources`/`tasks`/`sinks` sets (§4.3).
    pub fn build(model: &EntityModel) -> Self {
        let mut collector = EdgeCollector::new();

        for entity in model.entities() {
            match entity {
                Entity::Proof(p) => {
                    let has_asserts = p.asserts().next().is_some();
                    if p.solve && has_asserts {
                        collector.edge(
                            VertexKey::new(VertexKind::Task, p.name.clone()),
                            VertexKey::new(VertexKind::Proof, p.name.clone()),
                        );
                    }
                    for a in p.assumes() {
                        let src_kind = if a.cross { VertexKind::Cross } else { VertexKind::Entity };
                        collector.edge(
                            VertexKey::new(src_kind, a.name.clone()),
                            VertexKey::new(VertexKind::Proof, p.name.clone()),
                        );
                    }
                    for u in p.uses() {
                        collector.edge(
                            VertexKey::new(VertexKind::Export, u.name.clone()),
                            VertexKey::new(VertexKind::Proof, p.name.clone()),
                        );
                        if u.export {
                            collector.edge(
                                VertexKey::new(VertexKind::Export, u.name.clone()),
                                VertexKey::new(VertexKind::Export, p.name.clone()),
                            );
                        }
                    }
                    for x in p.asserts() {
                        collector.edge(
                            VertexKey::new(VertexKind::Proof, p.name.clone()),
                            VertexKey::new(VertexKind::Entity, x.name.clone()),
                        );
                        if !x.local {
                            collector.edge(
                                VertexKey::new(VertexKind::Entity, x.name.clone()),
                                VertexKey::new(VertexKind::AssumeProof, p.name.clone()),
                            );
                        }
                    }
                    collector.edge(
                        VertexKey::new(VertexKind::AssumeProof, p.name.clone()),
                        VertexKey::new(VertexKind::Entity, p.name.clone()),
                    );
                    for e in p.exports() {
                        let src_kind = if e.cross { VertexKind::Cross } else { VertexKind::Entity };
                        collector.edge(
                            VertexKey::new(src_kind, e.name.clone()),
                            VertexKey::new(VertexKind::Export, p.name.clone()),
                        );
                    }
                }
                Entity::Invariant(i) => {
                    if i.solve {
                        collector.edge(
                            VertexKey::new(VertexKind::Task, i.name.clone()),
                            VertexKey::new(VertexKind::Entity, i.name.clone()),
                        );
                    }
                }
            }
        }

        Self::from_collector(collector)
    }

    fn from_collector(collector: EdgeCollector) -> Self {
        let n = collector.vertices.len();

        // reversed_adj[v] holds v's predecessors in the real graph, so
        // that a Tarjan pass over it emits leaf (no-predecessor, i.e.
        // real source) vertices first.
        let mut reversed_adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in &collector.edges {
            reversed_adj[v].push(u);
            out_edges[u].push(v);
            in_edges[v].push(u);
        }

        let components = find_sccs_indexed(&reversed_adj);
        let mut rank_of_orig = vec![0usize; n];
        for (rank, component) in components.into_iter().flatten().enumerate() {
            rank_of_orig[component] = rank;
        }

        let mut vertex_by_rank: Vec<Option<VertexKey>> = vec![None; n];
        for (key, ()) in collector.vertices.iter() {
            let orig_idx = collector.vertices.index_of(key).unwrap();
            vertex_by_rank[rank_of_orig[orig_idx]] = Some(key.clone());
        }
        let vertex_by_rank: Vec<VertexKey> = vertex_by_rank.into_iter().map(|v| v.unwrap()).collect();

        let mut rank_of: OrderedMap<VertexKey, usize> = OrderedMap::new();
        for (rank, key) in vertex_by_rank.iter().enumerate() {
            rank_of.insert(key.clone(), rank);
        }

        let mut out_edges_by_rank: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_edges_by_rank: Vec<Vec<usize>> = vec![Vec::new(); n];
        for orig in 0..n {
            let r = rank_of_orig[orig];
            out_edges_by_rank[r] = out_edges[orig].iter().map(|&t| rank_of_orig[t]).collect();
            in_edges_by_rank[r] = in_edges[orig].iter().map(|&t| rank_of_orig[t]).collect();
            out_edges_by_rank[r].sort_unstable();
            in_edges_by_rank[r].sort_unstable();
        }

        let mut cross_order_map = vec![None; n];
        let mut cross_order_inv_map = vec![None; n];
        for (rank, key) in vertex_by_rank.iter().enumerate() {
            match key.kind {
                VertexKind::Entity => {
                    let cross_key = VertexKey::new(VertexKind::Cross, key.name.clone());
                    cross_order_map[rank] = rank_of.get(&cross_key).copied();
                }
                VertexKind::Cross => {
                    let entity_key = VertexKey::new(VertexKind::Entity, key.name.clone());
                    cross_order_inv_map[rank] = rank_of.get(&entity_key).copied();
                }
                _ => {}
            }
        }

        let non_entity_sources = (0..n)
            .filter(|&r| {
                in_edges_by_rank[r].is_empty()
                    && !matches!(
                        vertex_by_rank[r].kind,
                        VertexKind::Entity | VertexKind::Task | VertexKind::Cross
                    )
            })
            .collect();
        let tasks = (0..n)
            .filter(|&r| matches!(vertex_by_rank[r].kind, VertexKind::Task))
            .collect();
        let sinks = (0..n).filter(|&r| out_edges_by_rank[r].is_empty()).collect();

        Self {
            vertex_by_rank,
            rank_of,
            in_edges: in_edges_by_rank,
            out_edges: out_edges_by_rank,
            cross_order_map,
            cross_order_inv_map,
            non_entity_sources,
            tasks,
            sinks,
        }
    }

    pub fn len(&self) -> usize {
        self.vertex_by_rank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_by_rank.is_empty()
    }

    pub fn vertex(&self, rank: usize) -> &VertexKey {
        &self.vertex_by_rank[rank]
    }

    pub fn rank_of(&self, key: &VertexKey) -> Option<usize> {
        self.rank_of.get(key).copied()
    }

    pub fn in_edges(&self, rank: usize) -> &[usize] {
        &self.in_edges[rank]
    }

    pub fn out_edges(&self, rank: usize) -> &[usize] {
        &self.out_edges[rank]
    }

    pub fn cross_order(&self, rank: usize) -> Option<usize> {
        self.cross_order_map[rank]
    }

    pub fn cross_order_inv(&self, rank: usize) -> Option<usize> {
        self.cross_order_inv_map[rank]
    }

    pub fn non_entity_sources(&self) -> &[usize] {
        &self.non_entity_sources
    }

    pub fn tasks(&self) -> &[usize] {
        &self.tasks
    }

    pub fn sinks(&self) -> &[usize] {
        &self.sinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AssertItem, Invariant, Proof, ProofItem, SolveSet};

    fn n(s: &str) -> Name {
        Name::root().child_instance(s)
    }

    #[test]
    fn simple_proof_asserting_invariant_ranks_source_before_sink() {
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

        let graph = StatusGraph::build(&model);
        let task_pf = graph
            .rank_of(&VertexKey::new(VertexKind::Task, n("pf")))
            .unwrap();
        let proof_pf = graph
            .rank_of(&VertexKey::new(VertexKind::Proof, n("pf")))
            .unwrap();
        let entity_inv = graph
            .rank_of(&VertexKey::new(VertexKind::Entity, n("inv")))
            .unwrap();
        assert!(task_pf < proof_pf);
        assert!(proof_pf < entity_inv);
        assert!(graph.tasks().contains(&task_pf));
        assert!(graph.non_entity_sources().contains(&task_pf) == false);
    }

    #[test]
    fn entity_with_no_predecessors_is_a_sink_not_a_non_entity_source() {
        let mut model = EntityModel::new();
        model.insert_invariant(Invariant {
            name: n("orphan"),
            src_loc: "x:1".into(),
            solve: true,
            solves: SolveSet::default(),
        });
        model.resolve_solves();
        let graph = StatusGraph::build(&model);
        let entity_rank = graph
            .rank_of(&VertexKey::new(VertexKind::Entity, n("orphan")))
            .unwrap();
        assert!(graph.sinks().contains(&entity_rank));
        assert!(!graph.non_entity_sources().contains(&entity_rank));
    }
}
