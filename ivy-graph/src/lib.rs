//! Entity model, status dependency graph, and status propagation for the
//! ivy proof orchestrator.

pub mod entity;
pub mod graph;
pub mod name;
pub mod order;
pub mod scc;
pub mod status;
pub mod statusmap;
pub mod task;

pub use entity::{Entity, EntityModel, Invariant, ModuleSolve, Proof, ProofItem};
pub use graph::{Combinator, StatusGraph, VertexKey, VertexKind};
pub use name::{Name, NamePart};
pub use order::OrderedMap;
pub use scc::{find_sccs, find_sccs_indexed};
pub use status::{status_and, status_or, status_or_equivalent, Status};
pub use statusmap::StatusMap;
pub use task::Task;
