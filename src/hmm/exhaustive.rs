//! Brute-force evaluation over every state path.
//!
//! Exponential in the sequence length, so only usable for tiny models. It
//! shares no code with the dynamic programs, which makes it a useful oracle
//! for them.

use std::hash::Hash;

use num_traits::Zero;

use crate::error::{Error, Result};
use crate::hmm::model::{HiddenMarkovModel, StateId, SymbolId};
use crate::hmm::viterbi::BestPath;
use crate::probability::LogProbability;

/// Upper bound on the number of paths either function will enumerate.
pub const MAX_EXHAUSTIVE_PATHS: usize = 1 << 20;

fn path_probability<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[SymbolId],
    path: &[StateId],
) -> LogProbability
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return model.empty();
    };
    let mut probability = model.initial(first) * model.b(first, observations[0]);
    for t in 1..path.len() {
        probability =
            probability * model.a(path[t - 1], path[t]) * model.b(path[t], observations[t]);
    }
    probability * model.terminal(last)
}

/// Calls `visit` for every path in lexicographic order of state indices.
fn for_each_path<S, O, F>(model: &HiddenMarkovModel<S, O>, len: usize, mut visit: F) -> Result<()>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
    F: FnMut(&[StateId]),
{
    let n = model.num_states();
    let count = u32::try_from(len)
        .ok()
        .and_then(|len| n.checked_pow(len))
        .filter(|&count| count <= MAX_EXHAUSTIVE_PATHS);
    if count.is_none() {
        return Err(Error::InvalidInput(format!(
            "{} states over {} steps exceeds {} paths",
            n, len, MAX_EXHAUSTIVE_PATHS
        )));
    }

    let mut path = vec![0; len];
    loop {
        visit(&path);
        // Odometer increment, last position fastest.
        let mut position = len;
        loop {
            if position == 0 {
                return Ok(());
            }
            position -= 1;
            path[position] += 1;
            if path[position] < n {
                break;
            }
            path[position] = 0;
        }
    }
}

/// Sequence probability as an explicit sum over all `N^T` state paths.
///
/// # Errors
///
/// `Error::InvalidInput` if there are more than [`MAX_EXHAUSTIVE_PATHS`] paths.
pub fn probability<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[O],
) -> Result<LogProbability>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let encoded = model.encode(observations);
    let mut total = LogProbability::zero();
    for_each_path(model, encoded.len(), |path| {
        total = total + path_probability(model, &encoded, path);
    })?;
    Ok(total)
}

/// The maximum-probability path found by enumeration; among equal paths the
/// lexicographically smallest wins. `None` when every path has probability
/// zero.
///
/// # Errors
///
/// `Error::InvalidInput` if there are more than [`MAX_EXHAUSTIVE_PATHS`] paths.
pub fn best_path<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[O],
) -> Result<Option<BestPath<S>>>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let encoded = model.encode(observations);
    let mut best: Option<(Vec<StateId>, LogProbability)> = None;
    for_each_path(model, encoded.len(), |path| {
        let p = path_probability(model, &encoded, path);
        if p.is_zero() {
            return;
        }
        if best.as_ref().map_or(true, |(_, q)| p > *q) {
            best = Some((path.to_vec(), p));
        }
    })?;

    Ok(best.map(|(path, probability)| BestPath {
        states: path.into_iter().map(|s| model.states()[s].clone()).collect(),
        probability,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::fixtures::{random_model, weather, with_empty_transition, WEATHER_313};
    use crate::hmm::forward::likelihood;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_weather_closed_form() {
        let model = weather();
        let p = probability(&model, &[3, 1, 3]).unwrap();
        assert_relative_eq!(p.to_f64(), WEATHER_313, max_relative = 1e-9);
    }

    #[test]
    fn test_matches_forward() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for seed in 0..8 {
            let model = random_model(3, 2, seed);
            for len in 0..=4 {
                let observations: Vec<usize> = (0..len).map(|_| rng.gen_range(0..2)).collect();
                let brute = probability(&model, &observations).unwrap();
                let dp = likelihood(&model, &observations);
                if len == 0 {
                    assert!(brute.is_zero() && dp.is_zero());
                } else {
                    assert_relative_eq!(brute.ln(), dp.ln(), max_relative = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_empty_sequence() {
        let model = with_empty_transition(0.4);
        assert_relative_eq!(probability(&model, &[]).unwrap().to_f64(), 0.4, max_relative = 1e-12);
        let best = best_path(&model, &[]).unwrap().unwrap();
        assert!(best.states.is_empty());
    }

    #[test]
    fn test_best_path_weather() {
        let model = weather();
        let best = best_path(&model, &[3, 1, 3]).unwrap().unwrap();
        assert_eq!(best.states, vec!["HOT", "HOT", "HOT"]);
    }

    #[test]
    fn test_refuses_large_inputs() {
        let model = weather();
        let observations = vec![1; 64];
        assert!(matches!(
            probability(&model, &observations),
            Err(Error::InvalidInput(_))
        ));
    }
}
