//! Iterative strongly-connected-component finder.
//!
//! A direct translation of Tarjan's algorithm written non-recursively
//! (real designs nest deep enough that a recursive DFS over the instance
//! hierarchy can blow the stack). Ties among several equally-low-link
//! nodes are broken by insertion order in `order`, so the component
//! list is deterministic across runs given the same vertex order.
//!
//! Components are returned leaves-first: a component with no outgoing
//! edges to components not yet emitted comes out before anything that
//! depends on it, i.e. in reverse topological order relative to the
//! edges given to [`find_sccs`].

use crate::order::OrderedMap;
use std::hash::Hash;

struct Frame {
    node: usize,
    /// Index into this node's adjacency list of the next edge to explore.
    next_edge: usize,
}

/// Find the strongly connected components of a graph given as an
/// adjacency list indexed by vertex id. Returns components in
/// leaves-first (reverse topological) order; within a component,
/// vertices are listed in the order they were pushed onto the DFS stack.
pub fn find_sccs_indexed(adj: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut lowlink: Vec<usize> = vec![0; n];
    let mut on_stack: Vec<bool> = vec![false; n];
    let mut tarjan_stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    for start in 0..n {
        if index[start].is_some() {
            continue;
        }

        let mut dfs: Vec<Frame> = vec![Frame {
            node: start,
            next_edge: 0,
        }];
        index[start] = Some(next_index);
        lowlink[start] = next_index;
        next_index += 1;
        tarjan_stack.push(start);
        on_stack[start] = true;

        while let Some(frame) = dfs.last_mut() {
            let v = frame.node;
            if frame.next_edge < adj[v].len() {
                let w = adj[v][frame.next_edge];
                frame.next_edge += 1;
                if index[w].is_none() {
                    index[w] = Some(next_index);
                    lowlink[w] = next_index;
                    next_index += 1;
                    tarjan_stack.push(w);
                    on_stack[w] = true;
                    dfs.push(Frame { node: w, next_edge: 0 });
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w].unwrap());
                }
            } else {
                dfs.pop();
                if let Some(parent) = dfs.last() {
                    let p = parent.node;
                    lowlink[p] = lowlink[p].min(lowlink[v]);
                }
                if lowlink[v] == index[v].unwrap() {
                    let mut component = Vec::new();
                    loop {
                        let w = tarjan_stack.pop().expect("tarjan stack underflow");
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
    }

    components
}

/// Same algorithm, but keyed by an arbitrary hashable vertex type and
/// driven by an [`OrderedMap`] so callers never have to assign indices
/// themselves. `vertices` fixes the insertion (and therefore tie-break)
/// order; `edges(v)` yields `v`'s out-neighbours.
pub fn find_sccs<T, I>(vertices: &[T], mut edges: impl FnMut(&T) -> I) -> Vec<Vec<T>>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut order: OrderedMap<T, ()> = OrderedMap::new();
    for v in vertices {
        order.insert(v.clone(), ());
    }

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
    for v in vertices {
        let vi = order.index_of(v).expect("vertex just inserted");
        for w in edges(v) {
            // Edges to vertices outside the declared vertex set are
            // ignored rather than silently extending the index space.
            if let Some(wi) = order.index_of(&w) {
                adj[vi].push(wi);
            }
        }
    }

    find_sccs_indexed(&adj)
        .into_iter()
        .map(|component| {
            component
                .into_iter()
                .map(|idx| order.key_at(idx).clone())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cycle_is_one_component() {
        let verts = vec![0, 1, 2];
        let adj = |v: &i32| -> Vec<i32> {
            match v {
                0 => vec![1],
                1 => vec![2],
                2 => vec![0],
                _ => vec![],
            }
        };
        let sccs = find_sccs(&verts, adj);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 3);
    }

    #[test]
    fn dag_gives_leaves_first_singletons() {
        // 0 -> 1 -> 2
        let verts = vec![0, 1, 2];
        let adj = |v: &i32| -> Vec<i32> {
            match v {
                0 => vec![1],
                1 => vec![2],
                _ => vec![],
            }
        };
        let sccs = find_sccs(&verts, adj);
        assert_eq!(sccs, vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn two_independent_cycles_tie_break_by_insertion_order() {
        // 0 <-> 1, 2 <-> 3, no edges between the two pairs.
        let verts = vec![0, 1, 2, 3];
        let adj = |v: &i32| -> Vec<i32> {
            match v {
                0 => vec![1],
                1 => vec![0],
                2 => vec![3],
                3 => vec![2],
                _ => vec![],
            }
        };
        let sccs = find_sccs(&verts, adj);
        assert_eq!(sccs.len(), 2);
        assert_eq!(sccs[0], vec![1, 0]);
        assert_eq!(sccs[1], vec![3, 2]);
    }

    /// Randomized adjacency stress test (spec.md §8 SCC finder laws):
    /// on arbitrary graphs, the result always partitions the vertex set,
    /// every emitted component is strongly connected end to end, and the
    /// order is reverse-topological (no component points backward to one
    /// emitted before it). Seeded from `rand` so failures are reproducible
    /// by pinning the printed seed.
    #[test]
    fn randomized_graphs_satisfy_partition_and_ordering_laws() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let n = rng.gen_range(1..12);
            let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
            for v in 0..n {
                let out_degree = rng.gen_range(0..=3.min(n));
                for _ in 0..out_degree {
                    let w = rng.gen_range(0..n);
                    if !adj[v].contains(&w) {
                        adj[v].push(w);
                    }
                }
            }

            let components = find_sccs_indexed(&adj);

            let mut seen = vec![false; n];
            let mut rank_of = vec![0usize; n];
            for (rank, component) in components.iter().enumerate() {
                for &v in component {
                    assert!(!seen[v], "seed {seed}: vertex {v} appears in two components");
                    seen[v] = true;
                    rank_of[v] = rank;
                }
            }
            assert!(seen.iter().all(|&s| s), "seed {seed}: not every vertex covered");

            for (rank, component) in components.iter().enumerate() {
                for &v in component {
                    for &w in &adj[v] {
                        if component.contains(&w) {
                            continue;
                        }
                        assert!(
                            rank_of[w] < rank,
                            "seed {seed}: edge {v}->{w} crosses from component {rank} into a later one"
                        );
                    }
                }
            }

            for component in &components {
                if component.len() < 2 {
                    continue;
                }
                for &v in component {
                    let reachable = reachable_within(&adj, v, component);
                    assert!(
                        component.iter().all(|w| reachable.contains(w)),
                        "seed {seed}: component {component:?} is not strongly connected from {v}"
                    );
                }
            }
        }
    }

    fn reachable_within(adj: &[Vec<usize>], start: usize, within: &[usize]) -> std::collections::HashSet<usize> {
        let allowed: std::collections::HashSet<usize> = within.iter().copied().collect();
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            if !seen.insert(v) {
                continue;
            }
            for &w in &adj[v] {
                if allowed.contains(&w) && !seen.contains(&w) {
                    stack.push(w);
                }
            }
        }
        seen
    }
}
