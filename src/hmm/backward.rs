//! Backward algorithm.
//!
//! The right-to-left dual of the forward pass:
//!
//! - `beta[T, s] = A(s, END)`
//! - `beta[t, s] = sum over s' of A(s, s') * B(s', o_{t+1}) * beta[t+1, s']`
//! - `P(o) = sum over s of A(START, s) * B(s, o1) * beta[1, s]`
//!
//! For any model the result agrees with [`crate::hmm::forward::forward`] up
//! to rounding; together the two lattices supply the Baum-Welch statistics.

use std::hash::Hash;

use crate::hmm::lattice::Lattice;
use crate::hmm::model::{HiddenMarkovModel, SymbolId};
use crate::probability::LogProbability;

/// Runs the backward algorithm and returns the filled lattice.
pub fn backward<S, O>(model: &HiddenMarkovModel<S, O>, observations: &[O]) -> Lattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    backward_encoded(model, &model.encode(observations))
}

pub(crate) fn backward_encoded<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[SymbolId],
) -> Lattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let n = model.num_states();
    let len = observations.len();
    let mut lattice = Lattice::new(len, n);

    if len == 0 {
        lattice.set_probability(model.empty());
        return lattice;
    }

    let mut beta: Vec<LogProbability> = (0..n).map(|s| model.terminal(s)).collect();
    lattice.set_row(len - 1, &beta);

    for t in (0..len - 1).rev() {
        let symbol = observations[t + 1];
        // B(s', o_{t+1}) * beta[t+1, s'] is shared by every source state
        let ahead: Vec<LogProbability> = beta
            .iter()
            .enumerate()
            .map(|(next, &p)| model.b(next, symbol) * p)
            .collect();
        beta = (0..n)
            .map(|s| {
                ahead
                    .iter()
                    .enumerate()
                    .map(|(next, &p)| model.a(s, next) * p)
                    .sum::<LogProbability>()
            })
            .collect();
        lattice.set_row(t, &beta);
    }

    let first = observations[0];
    let total: LogProbability = beta
        .iter()
        .enumerate()
        .map(|(s, &p)| model.initial(s) * model.b(s, first) * p)
        .sum();
    lattice.set_probability(total);
    lattice
}
