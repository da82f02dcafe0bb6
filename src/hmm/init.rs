//! Starting graphs for unsupervised training.
//!
//! Both initializers connect every state to every state and to END, let
//! every state emit every symbol (UNKNOWN included) and leave
//! `A(START, END)` at zero.

use std::hash::Hash;

use rand::Rng;

use crate::error::{Error, Result};
use crate::hmm::model::{Endpoint, HiddenMarkovModel, HmmBuilder, Symbol};
use crate::probability::LogProbability;

/// Builds a model from unnormalized weights, normalizing each row.
///
/// `transition_row(i)` has `N + 1` entries (END last) and `emission_row(i)`
/// has `V + 1` entries (UNKNOWN last).
fn from_weights<S, O>(
    states: Vec<S>,
    symbols: Vec<O>,
    initial: &[f64],
    mut transition_row: impl FnMut(usize) -> Vec<f64>,
    mut emission_row: impl FnMut(usize) -> Vec<f64>,
) -> Result<HiddenMarkovModel<S, O>>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    fn normalized(weights: &[f64]) -> Result<Vec<LogProbability>> {
        let total = LogProbability::from_weight(weights.iter().sum())?;
        weights
            .iter()
            .map(|&w| LogProbability::from_weight(w)?.divide(total))
            .collect()
    }

    let mut builder = HmmBuilder::new(states.iter().cloned(), symbols.iter().cloned())?;

    for (s, p) in states.iter().zip(normalized(initial)?) {
        builder = builder.transition(Endpoint::Start, Endpoint::State(s.clone()), p)?;
    }

    for (i, from) in states.iter().enumerate() {
        let row = normalized(&transition_row(i))?;
        let (end, to_states) = row
            .split_last()
            .ok_or_else(|| Error::invalid_input("Transition row must include END"))?;
        for (to, &p) in states.iter().zip(to_states) {
            builder = builder.transition(
                Endpoint::State(from.clone()),
                Endpoint::State(to.clone()),
                p,
            )?;
        }
        builder = builder.transition(Endpoint::State(from.clone()), Endpoint::End, *end)?;

        let row = normalized(&emission_row(i))?;
        let (unknown, known) = row
            .split_last()
            .ok_or_else(|| Error::invalid_input("Emission row must include UNKNOWN"))?;
        for (symbol, &p) in symbols.iter().zip(known) {
            builder = builder.emission(from.clone(), Symbol::Known(symbol.clone()), p)?;
        }
        builder = builder.emission(from.clone(), Symbol::Unknown, *unknown)?;
    }

    Ok(builder.build())
}

/// The uniform starting point: `A(START, s) = 1/N`, `A(s, x) = 1/(N+1)` for
/// every successor `x` in `S ∪ {END}`, and `B(s, v) = 1/(V+1)`.
///
/// A perfectly uniform start is a fixed point of Baum-Welch for the
/// transition table, so states never specialize from it; use [`random`] to
/// break the symmetry.
///
/// # Errors
///
/// `Error::InvalidInput` for an empty state set or duplicate labels.
pub fn uniform<S, O>(
    states: impl IntoIterator<Item = S>,
    symbols: impl IntoIterator<Item = O>,
) -> Result<HiddenMarkovModel<S, O>>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let states: Vec<S> = states.into_iter().collect();
    let symbols: Vec<O> = symbols.into_iter().collect();
    let (n, v) = (states.len(), symbols.len());
    from_weights(
        states,
        symbols,
        &vec![1.0; n],
        |_| vec![1.0; n + 1],
        |_| vec![1.0; v + 1],
    )
}

/// Same support as [`uniform`] with every row drawn at random from `rng`.
///
/// # Errors
///
/// `Error::InvalidInput` for an empty state set or duplicate labels.
pub fn random<S, O, R>(
    states: impl IntoIterator<Item = S>,
    symbols: impl IntoIterator<Item = O>,
    rng: &mut R,
) -> Result<HiddenMarkovModel<S, O>>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let states: Vec<S> = states.into_iter().collect();
    let symbols: Vec<O> = symbols.into_iter().collect();
    let (n, v) = (states.len(), symbols.len());

    let mut weights =
        |len: usize| -> Vec<f64> { (0..len).map(|_| rng.gen_range(0.5..1.5)).collect() };
    let initial = weights(n);
    let transitions: Vec<Vec<f64>> = (0..n).map(|_| weights(n + 1)).collect();
    let emissions: Vec<Vec<f64>> = (0..n).map(|_| weights(v + 1)).collect();

    from_weights(
        states,
        symbols,
        &initial,
        |i| transitions[i].clone(),
        |i| emissions[i].clone(),
    )
}
