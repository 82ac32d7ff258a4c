//! Finite automata built from regex syntax trees.
//!
//! The pipeline runs ε-NFA construction, ε-elimination, state merging,
//! homomorphic conversion and renumbering, and ends with lookup tables
//! that drive a bounded subset construction.

mod dual_key;
mod epsilon_nfa;
mod lut;
mod nfa;
mod state;
mod subset_construction;

pub use dual_key::DualKeyMap;
pub use epsilon_nfa::EpsilonNfa;
pub use lut::HomoLut;
pub use nfa::{GraphEdge, GraphNode, Nfa, NfaGraph};
pub use state::{AcceptId, StateId, StateSet};
pub use subset_construction::{DfaStateCount, count_dfa_states};
