//! Data-parallel inference over many independent sequences.

use std::hash::Hash;

use rayon::prelude::*;

use crate::hmm::forward::likelihood;
use crate::hmm::viterbi::{viterbi, BestPath};
use crate::hmm::HiddenMarkovModel;
use crate::probability::LogProbability;

/// `P(o)` for every sequence, in input order.
pub fn likelihoods<S, O, Q>(model: &HiddenMarkovModel<S, O>, sequences: &[Q]) -> Vec<LogProbability>
where
    S: Clone + Eq + Hash + Sync,
    O: Clone + Eq + Hash + Sync,
    Q: AsRef<[O]> + Sync,
{
    sequences
        .par_iter()
        .map(|sequence| likelihood(model, sequence.as_ref()))
        .collect()
}

/// The Viterbi path for every sequence, in input order.
pub fn decode_all<S, O, Q>(
    model: &HiddenMarkovModel<S, O>,
    sequences: &[Q],
) -> Vec<Option<BestPath<S>>>
where
    S: Clone + Eq + Hash + Send + Sync,
    O: Clone + Eq + Hash + Sync,
    Q: AsRef<[O]> + Sync,
{
    sequences
        .par_iter()
        .map(|sequence| viterbi(model, sequence.as_ref()))
        .collect()
}
