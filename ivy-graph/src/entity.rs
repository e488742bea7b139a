//! Proofs, invariants, and the solve-resolution pass.
//!
//! Proof items are a tagged union rather than a shared base class: the
//! status-graph builder only ever needs read access through
//! variant-specific accessors, so there is no benefit (and real cost, in
//! the form of fictitious shared mutable state) to modelling `Use`,
//! `Assume`, `Assert`, `Export` and `Solve` as subclasses of one
//! `ProofItem` type.

use crate::name::Name;
use crate::order::OrderedMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseItem {
    pub name: Name,
    pub export: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeItem {
    pub name: Name,
    pub cross: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertItem {
    pub name: Name,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub name: Name,
    pub cross: bool,
}

/// A per-proof solve directive: applied to `target` only once the
/// enclosing proof's `solve` flag is (transitively) true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveItem {
    pub target: Name,
    pub solver: String,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofItem {
    Use(UseItem),
    Assume(AssumeItem),
    Assert(AssertItem),
    Export(ExportItem),
    Solve(SolveItem),
}

/// A module-level solve directive, from the JSON export's top-level
/// `solve` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSolve {
    pub target: Name,
    pub solver: String,
    pub priority: Option<i64>,
}

/// The set of solvers an entity is to be attempted with, in priority
/// order. Populated by [`EntityModel::resolve_solves`].
#[derive(Debug, Clone, Default)]
pub struct SolveSet {
    /// Insertion-ordered `solver -> priority` as directives named them.
    with: OrderedMap<String, Option<i64>>,
    /// Stable sort of `with` by `priority.unwrap_or(0)` ascending, filled
    /// in once resolution completes. Maps solver -> its index.
    order: OrderedMap<String, usize>,
}

impl SolveSet {
    fn record(&mut self, solver: String, priority: Option<i64>) {
        self.with.insert(solver, priority);
    }

    pub fn is_empty(&self) -> bool {
        self.with.is_empty()
    }

    pub fn solvers(&self) -> impl Iterator<Item = &str> {
        self.with.keys().map(|s| s.as_str())
    }

    pub fn priority(&self, solver: &str) -> Option<i64> {
        self.with.get(&solver.to_string()).copied().flatten()
    }

    /// The index of `solver` in priority order (ascending, ties broken by
    /// declaration order), after [`EntityModel::resolve_solves`] has run.
    pub fn solve_order(&self, solver: &str) -> Option<usize> {
        self.order.get(&solver.to_string()).copied()
    }

    fn finalize_order(&mut self) {
        let mut entries: Vec<(String, Option<i64>)> =
            self.with.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by_key(|(_, pri)| pri.unwrap_or(0));
        self.order = OrderedMap::new();
        for (idx, (solver, _)) in entries.into_iter().enumerate() {
            self.order.insert(solver, idx);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Proof {
    pub name: Name,
    pub src_loc: String,
    pub top_level: bool,
    pub automatic: bool,
    pub items: Vec<ProofItem>,
    pub solve: bool,
    pub solves: SolveSet,
}

impl Proof {
    pub fn uses(&self) -> impl Iterator<Item = &UseItem> {
        self.items.iter().filter_map(|i| match i {
            ProofItem::Use(u) => Some(u),
            _ => None,
        })
    }

    pub fn assumes(&self) -> impl Iterator<Item = &AssumeItem> {
        self.items.iter().filter_map(|i| match i {
            ProofItem::Assume(a) => Some(a),
            _ => None,
        })
    }

    pub fn asserts(&self) -> impl Iterator<Item = &AssertItem> {
        self.items.iter().filter_map(|i| match i {
            ProofItem::Assert(a) => Some(a),
            _ => None,
        })
    }

    pub fn exports(&self) -> impl Iterator<Item = &ExportItem> {
        self.items.iter().filter_map(|i| match i {
            ProofItem::Export(e) => Some(e),
            _ => None,
        })
    }

    pub fn solve_items(&self) -> impl Iterator<Item = &SolveItem> {
        self.items.iter().filter_map(|i| match i {
            ProofItem::Solve(s) => Some(s),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Invariant {
    pub name: Name,
    pub src_loc: String,
    pub solve: bool,
    pub solves: SolveSet,
}

#[derive(Debug, Clone)]
pub enum Entity {
    Proof(Proof),
    Invariant(Invariant),
}

impl Entity {
    pub fn name(&self) -> &Name {
        match self {
            Entity::Proof(p) => &p.name,
            Entity::Invariant(i) => &i.name,
        }
    }

    pub fn solve(&self) -> bool {
        match self {
            Entity::Proof(p) => p.solve,
            Entity::Invariant(i) => i.solve,
        }
    }

    pub fn solves(&self) -> &SolveSet {
        match self {
            Entity::Proof(p) => &p.solves,
            Entity::Invariant(i) => &i.solves,
        }
    }

    pub fn as_proof(&self) -> Option<&Proof> {
        match self {
            Entity::Proof(p) => Some(p),
            Entity::Invariant(_) => None,
        }
    }
}

/// The full set of entities derived from a JSON export, plus the
/// module-level solve directives that seed resolution.
#[derive(Debug, Clone, Default)]
pub struct EntityModel {
    entities: OrderedMap<Name, Entity>,
    module_solves: Vec<ModuleSolve>,
}

const DEFAULT_SOLVER_PLACEHOLDER: &str = "default";

impl EntityModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_proof(&mut self, proof: Proof) {
        self.entities.insert(proof.name.clone(), Entity::Proof(proof));
    }

    pub fn insert_invariant(&mut self, invariant: Invariant) {
        self.entities
            .insert(invariant.name.clone(), Entity::Invariant(invariant));
    }

    pub fn add_module_solve(&mut self, solve: ModuleSolve) {
        self.module_solves.push(solve);
    }

    pub fn get(&self, name: &Name) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.entities.keys()
    }

    /// Runs the solve-resolution pass described for the entity model:
    /// automatic proofs, module-level solves, and proof-item solves
    /// (gated on their enclosing proof's resolved `solve` flag) are
    /// applied to a fixpoint, entities left with `solve = true` and no
    /// solver pick up the `"default"` placeholder, and each entity's
    /// solver list is stable-sorted into `solve_order`.
    pub fn resolve_solves(&mut self) {
        // Step 1: automatic proofs get an implicit top-level solve for
        // their own name. This only ever needs to run once, since
        // `automatic` is immutable input data.
        let automatic_names: Vec<Name> = self
            .entities
            .iter()
            .filter_map(|(name, e)| match e {
                Entity::Proof(p) if p.automatic => Some(name.clone()),
                _ => None,
            })
            .collect();
        for name in &automatic_names {
            if let Some(Entity::Proof(p)) = self.entities.get_mut(name) {
                p.solve = true;
            }
        }

        // Steps 2-3 interact: a proof-item solve only fires once its
        // enclosing proof is solved, but that proof may itself have been
        // solved by a module-level directive processed in the same
        // round, or by a proof-item directive from another proof in a
        // later round. Iterate to a fixpoint.
        loop {
            let mut changed = false;

            for module_solve in self.module_solves.clone() {
                changed |= self.apply_solve_directive(
                    &module_solve.target,
                    &module_solve.solver,
                    module_solve.priority,
                );
            }

            let proof_names: Vec<Name> = self
                .entities
                .iter()
                .filter_map(|(name, e)| match e {
                    Entity::Proof(_) => Some(name.clone()),
                    Entity::Invariant(_) => None,
                })
                .collect();
            for proof_name in proof_names {
                let (enclosing_solve, directives) = match self.entities.get(&proof_name) {
                    Some(Entity::Proof(p)) => (
                        p.solve,
                        p.solve_items()
                            .map(|s| (s.target.clone(), s.solver.clone(), s.priority))
                            .collect::<Vec<_>>(),
                    ),
                    _ => continue,
                };
                if !enclosing_solve {
                    continue;
                }
                for (target, solver, priority) in directives {
                    changed |= self.apply_solve_directive(&target, &solver, priority);
                }
            }

            if !changed {
                break;
            }
        }

        // Step 4: entities solved but left with no solver pick up a
        // single "default" entry with no declared priority.
        let names: Vec<Name> = self.entities.keys().cloned().collect();
        for name in names {
            if let Some(entity) = self.entities.get_mut(&name) {
                let (solve, empty) = match entity {
                    Entity::Proof(p) => (p.solve, p.solves.is_empty()),
                    Entity::Invariant(i) => (i.solve, i.solves.is_empty()),
                };
                if solve && empty {
                    let solves = match entity {
                        Entity::Proof(p) => &mut p.solves,
                        Entity::Invariant(i) => &mut i.solves,
                    };
                    solves.record(DEFAULT_SOLVER_PLACEHOLDER.to_string(), None);
                }
            }
        }

        // Step 5: finalize solve_order everywhere.
        let names: Vec<Name> = self.entities.keys().cloned().collect();
        for name in names {
            if let Some(entity) = self.entities.get_mut(&name) {
                let solves = match entity {
                    Entity::Proof(p) => &mut p.solves,
                    Entity::Invariant(i) => &mut i.solves,
                };
                solves.finalize_order();
            }
        }
    }

    /// Marks `target` as solved and records the `(solver, priority)`
    /// directive against it. Returns whether this changed anything
    /// (used to drive the fixpoint loop in `resolve_solves`).
    fn apply_solve_directive(&mut self, target: &Name, solver: &str, priority: Option<i64>) -> bool {
        let Some(entity) = self.entities.get_mut(target) else {
            return false;
        };
        let (solve_flag, solves) = match entity {
            Entity::Proof(p) => (&mut p.solve, &mut p.solves),
            Entity::Invariant(i) => (&mut i.solve, &mut i.solves),
        };
        let mut changed = false;
        if !*solve_flag {
            *solve_flag = true;
            changed = true;
        }
        if !solves.with.contains_key(&solver.to_string()) {
            solves.record(solver.to_string(), priority);
            changed = true;
        }
        changed
    }
}
