pub mod backward;
pub mod batch;
pub mod baum_welch;
pub mod estimate;
pub mod exhaustive;
pub mod forward;
pub mod init;
pub mod lattice;
pub mod model;
pub mod viterbi;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export the inference entry points and model types
pub use backward::backward;
pub use batch::{decode_all, likelihoods};
pub use baum_welch::{baum_welch, BaumWelchConfig, BaumWelchResult};
pub use estimate::{from_counts, TagCounts};
pub use forward::{forward, likelihood};
pub use lattice::Lattice;
pub use model::{Endpoint, HiddenMarkovModel, HmmBuilder, StateId, Symbol, SymbolId};
pub use viterbi::{viterbi, viterbi_lattice, BestPath, ViterbiCell, ViterbiLattice};
