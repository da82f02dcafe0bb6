//! Forward algorithm.
//!
//! Computes the total probability of an observation sequence by summing over
//! every state path with a left-to-right dynamic program:
//!
//! - `alpha[1, s] = A(START, s) * B(s, o1)`
//! - `alpha[t, s] = sum over s' of alpha[t-1, s'] * A(s', s) * B(s, ot)`
//! - `P(o) = sum over s of alpha[T, s] * A(s, END)`
//!
//! The empty sequence has probability `A(START, END)`.

use std::hash::Hash;

use crate::hmm::lattice::Lattice;
use crate::hmm::model::{HiddenMarkovModel, SymbolId};
use crate::probability::LogProbability;

/// Runs the forward algorithm and returns the filled lattice.
///
/// Out-of-vocabulary symbols are looked up as UNKNOWN.
///
/// # Examples
///
/// ```
/// use loghmm::{forward, Endpoint, HmmBuilder, Symbol};
///
/// let model = HmmBuilder::new(["s"], ['a'])
///     .unwrap()
///     .transition_prob(Endpoint::Start, Endpoint::State("s"), 1.0)
///     .unwrap()
///     .transition_prob(Endpoint::State("s"), Endpoint::State("s"), 0.5)
///     .unwrap()
///     .transition_prob(Endpoint::State("s"), Endpoint::End, 0.5)
///     .unwrap()
///     .emission_prob("s", Symbol::Known('a'), 1.0)
///     .unwrap()
///     .build();
///
/// let lattice = forward(&model, &['a', 'a']);
/// assert!((lattice.probability().to_f64() - 0.25).abs() < 1e-12);
/// ```
pub fn forward<S, O>(model: &HiddenMarkovModel<S, O>, observations: &[O]) -> Lattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    forward_encoded(model, &model.encode(observations))
}

/// Probability of `observations` under `model`.
pub fn likelihood<S, O>(model: &HiddenMarkovModel<S, O>, observations: &[O]) -> LogProbability
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    forward(model, observations).probability()
}

pub(crate) fn forward_encoded<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[SymbolId],
) -> Lattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let n = model.num_states();
    let mut lattice = Lattice::new(observations.len(), n);

    let Some((&first, rest)) = observations.split_first() else {
        lattice.set_probability(model.empty());
        return lattice;
    };

    let mut alpha: Vec<LogProbability> = (0..n)
        .map(|s| model.initial(s) * model.b(s, first))
        .collect();
    lattice.set_row(0, &alpha);

    for (t, &symbol) in rest.iter().enumerate() {
        let next: Vec<LogProbability> = (0..n)
            .map(|s| {
                let incoming: LogProbability = alpha
                    .iter()
                    .enumerate()
                    .map(|(prev, &p)| p * model.a(prev, s))
                    .sum();
                incoming * model.b(s, symbol)
            })
            .collect();
        lattice.set_row(t + 1, &next);
        alpha = next;
    }

    let total: LogProbability = alpha
        .iter()
        .enumerate()
        .map(|(s, &p)| p * model.terminal(s))
        .sum();
    lattice.set_probability(total);
    lattice
}
