//! Turning tagged-corpus frequency counts into a normalized model.
//!
//! Counting itself is left to the caller; this module only normalizes:
//!
//! - transitions by maximum likelihood, `count(i, j) / sum_k count(i, k)`,
//! - emissions with add-one (Laplace) smoothing over the vocabulary,
//! - UNKNOWN with the average smoothed probability of the singleton symbols
//!   (symbols seen exactly once in the whole corpus), after which each
//!   emission row is rescaled to sum to one again.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use log::debug;
use num_traits::One;

use crate::error::{Error, Result};
use crate::hmm::model::{Endpoint, HiddenMarkovModel, HmmBuilder, Symbol};
use crate::probability::LogProbability;

/// Raw frequency counts from a tagged corpus.
#[derive(Debug, Clone)]
pub struct TagCounts<S, O> {
    /// Occurrences of each transition, START and END included.
    pub transitions: HashMap<(Endpoint<S>, Endpoint<S>), f64>,
    /// Occurrences of each `(state, symbol)` emission.
    pub emissions: HashMap<(S, O), f64>,
}

impl<S, O> TagCounts<S, O> {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
            emissions: HashMap::new(),
        }
    }
}

impl<S, O> Default for TagCounts<S, O> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_count(count: f64) -> Result<()> {
    if !count.is_finite() || count < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Counts must be finite and non-negative, got {}",
            count
        )));
    }
    Ok(())
}

/// Builds a normalized model from `counts`.
///
/// States and symbols are ordered by their `Ord` implementation, which fixes
/// the state indices used for tie-breaking.
///
/// # Errors
///
/// `Error::InvalidInput` for negative or non-finite counts, transitions into
/// START or out of END, or counts that mention no state at all.
pub fn from_counts<S, O>(counts: &TagCounts<S, O>) -> Result<HiddenMarkovModel<S, O>>
where
    S: Clone + Eq + Hash + Ord,
    O: Clone + Eq + Hash + Ord,
{
    let mut states = BTreeSet::new();
    let mut vocabulary = BTreeSet::new();
    let mut outgoing: HashMap<&Endpoint<S>, f64> = HashMap::new();
    let mut emitted: HashMap<&S, f64> = HashMap::new();
    let mut symbol_totals: HashMap<&O, f64> = HashMap::new();

    for ((from, to), &count) in &counts.transitions {
        check_count(count)?;
        for endpoint in [from, to] {
            if let Endpoint::State(s) = endpoint {
                states.insert(s.clone());
            }
        }
        *outgoing.entry(from).or_insert(0.0) += count;
    }
    for ((state, symbol), &count) in &counts.emissions {
        check_count(count)?;
        states.insert(state.clone());
        vocabulary.insert(symbol.clone());
        *emitted.entry(state).or_insert(0.0) += count;
        *symbol_totals.entry(symbol).or_insert(0.0) += count;
    }

    let mut builder = HmmBuilder::new(states.iter().cloned(), vocabulary.iter().cloned())?;

    for ((from, to), &count) in &counts.transitions {
        if count == 0.0 {
            continue;
        }
        let total = LogProbability::from_weight(outgoing[from])?;
        let p = LogProbability::from_weight(count)?.divide(total)?;
        builder = builder.transition(from.clone(), to.clone(), p)?;
    }

    let singletons: Vec<&O> = vocabulary
        .iter()
        .filter(|symbol| symbol_totals.get(symbol).copied() == Some(1.0))
        .collect();
    let num_singletons = LogProbability::from_weight(singletons.len() as f64)?;
    let v = vocabulary.len() as f64;

    for state in &states {
        let denominator = emitted.get(state).copied().unwrap_or(0.0) + v;
        let count = |symbol: &O| {
            counts
                .emissions
                .get(&(state.clone(), symbol.clone()))
                .copied()
                .unwrap_or(0.0)
        };

        let mut smoothed: HashMap<&O, LogProbability> = HashMap::new();
        for symbol in &vocabulary {
            let p = LogProbability::from_weight(count(symbol) + 1.0)?
                .divide(LogProbability::from_weight(denominator)?)?;
            smoothed.insert(symbol, p);
        }

        let unknown = if !singletons.is_empty() {
            singletons
                .iter()
                .map(|symbol| smoothed[symbol])
                .sum::<LogProbability>()
                .divide(num_singletons)?
        } else if denominator > 0.0 {
            LogProbability::one().divide(LogProbability::from_weight(denominator)?)?
        } else {
            LogProbability::one()
        };

        let row_total = smoothed.values().sum::<LogProbability>() + unknown;
        for (symbol, p) in smoothed {
            builder = builder.emission(
                state.clone(),
                Symbol::Known(symbol.clone()),
                p.divide(row_total)?,
            )?;
        }
        builder = builder.emission(state.clone(), Symbol::Unknown, unknown.divide(row_total)?)?;
    }

    debug!(
        "Estimated model with {} states, {} symbols, {} singletons",
        states.len(),
        vocabulary.len(),
        singletons.len()
    );
    Ok(builder.build())
}
