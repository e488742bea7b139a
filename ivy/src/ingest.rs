//! Deserializes the yosys JSON export (spec.md §6) into an
//! [`ivy_graph::EntityModel`].
//!
//! Grounded on the original `yosys_ivy.data.IvyData`/`IvyName` shape
//! (`examples/original_source/src/yosys_ivy/data.py`): a name is a flat
//! array of strings that alternates module and instance identifiers
//! starting with a module (`module_names = parts[::2]`,
//! `instance_names = parts[1::2]`), which is exactly how
//! `ivy_graph::name::Name`'s own `module_names`/`instance_names` accessors
//! split a part list — so ingestion tags each JSON array element by parity
//! rather than inventing a separate wire convention. The richer item shapes
//! (`use_proof`/`assume`/`assert`/`export`/`solve`, `cross`/`local`/`export`/
//! `priority`/`with` flags) come from spec.md §6 directly, which documents
//! the later revision's schema the earlier `data.py` predates.

use serde::Deserialize;

use ivy_graph::entity::{AssertItem, AssumeItem, ExportItem, ModuleSolve as EntityModuleSolve, SolveItem, UseItem};
use ivy_graph::{EntityModel, Invariant, Name, NamePart, Proof, ProofItem};

#[derive(Debug, Deserialize)]
pub struct JsonExport {
    #[serde(default)]
    pub proofs: Vec<JsonProof>,
    #[serde(default)]
    pub invariants: Vec<JsonInvariant>,
    #[serde(default)]
    pub solve: Vec<JsonModuleSolve>,
}

#[derive(Debug, Deserialize)]
pub struct JsonProof {
    pub name: Vec<String>,
    pub srcloc: String,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub automatic: bool,
    #[serde(default)]
    pub use_proof: Vec<JsonItem>,
    #[serde(default)]
    pub assume: Vec<JsonItem>,
    #[serde(default)]
    pub assert: Vec<JsonItem>,
    #[serde(default)]
    pub export: Vec<JsonItem>,
    #[serde(default)]
    pub solve: Vec<JsonItem>,
}

#[derive(Debug, Deserialize)]
pub struct JsonInvariant {
    pub name: Vec<String>,
    #[allow(dead_code)]
    pub srcloc: String,
}

#[derive(Debug, Deserialize)]
pub struct JsonItem {
    pub name: Vec<String>,
    #[serde(default)]
    pub cross: bool,
    #[serde(default)]
    pub export: bool,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub with: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JsonModuleSolve {
    pub name: Vec<String>,
    #[serde(rename = "type", default)]
    #[allow(dead_code)]
    pub kind: Option<String>,
    #[serde(default)]
    pub with: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Tags a flat JSON name array as `Name` parts: even positions are module
/// identifiers, odd positions are instance identifiers (`m0, i0, m1, i1,
/// …`), matching spec.md §3's alternating-tuple definition.
pub fn name_from_parts(parts: &[String]) -> Name {
    let tagged = parts
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i % 2 == 0 {
                NamePart::Module(s.clone())
            } else {
                NamePart::Instance(s.clone())
            }
        })
        .collect();
    Name::new(tagged)
}

/// Builds the entity model from a parsed JSON export. `auto_proof` gates
/// whether `automatic` proofs keep their flag (and therefore later pick up
/// the implicit top-level solve in `resolve_solves`); setting it to `false`
/// restores the earlier revision's opt-out behavior (spec.md §9 Open
/// Questions, SPEC_FULL.md supplemented feature #3). Callers still need to
/// call [`EntityModel::resolve_solves`] themselves once the model is built.
pub fn build_entity_model(export: &JsonExport, auto_proof: bool) -> EntityModel {
    let mut model = EntityModel::new();

    for proof in &export.proofs {
        let name = name_from_parts(&proof.name);
        let mut items = Vec::new();
        for u in &proof.use_proof {
            items.push(ProofItem::Use(UseItem {
                name: name_from_parts(&u.name),
                export: u.export,
            }));
        }
        for a in &proof.assume {
            items.push(ProofItem::Assume(AssumeItem {
                name: name_from_parts(&a.name),
                cross: a.cross,
            }));
        }
        for a in &proof.assert {
            items.push(ProofItem::Assert(AssertItem {
                name: name_from_parts(&a.name),
                local: a.local,
            }));
        }
        for e in &proof.export {
            items.push(ProofItem::Export(ExportItem {
                name: name_from_parts(&e.name),
                cross: e.cross,
            }));
        }
        for s in &proof.solve {
            items.push(ProofItem::Solve(SolveItem {
                target: name_from_parts(&s.name),
                solver: s.with.clone().unwrap_or_else(|| "default".to_string()),
                priority: s.priority,
            }));
        }

        model.insert_proof(Proof {
            name,
            src_loc: proof.srcloc.clone(),
            top_level: proof.top_level,
            automatic: proof.automatic && auto_proof,
            items,
            solve: false,
            solves: Default::default(),
        });
    }

    for invariant in &export.invariants {
        model.insert_invariant(Invariant {
            name: name_from_parts(&invariant.name),
            src_loc: invariant.srcloc.clone(),
            solve: false,
            solves: Default::default(),
        });
    }

    for solve in &export.solve {
        model.add_module_solve(EntityModuleSolve {
            target: name_from_parts(&solve.name),
            solver: solve.with.clone().unwrap_or_else(|| "default".to_string()),
            priority: solve.priority,
        });
    }

    model
}
