//! Viterbi decoding: the single most probable state path for an observation
//! sequence, found with a max-product dynamic program and backpointers.

use std::hash::Hash;

use log::trace;
use ndarray::Array2;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::hmm::model::{HiddenMarkovModel, StateId, SymbolId};
use crate::probability::LogProbability;

/// A reached Viterbi cell: the best path probability into it and the state
/// at the previous time step that path came from (`None` at `t = 0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViterbiCell {
    pub probability: LogProbability,
    pub backpointer: Option<StateId>,
}

/// The filled Viterbi table.
///
/// A cell is `None` when no path with non-zero probability reaches it.
/// The terminal END cell is stored separately.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiLattice {
    cells: Array2<Option<ViterbiCell>>,
    terminal: Option<ViterbiCell>,
}

impl ViterbiLattice {
    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.cells.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Probability of the best complete path, if END is reachable.
    pub fn probability(&self) -> Option<LogProbability> {
        self.terminal.map(|cell| cell.probability)
    }

    /// The cell at time `t` (0-based) for state `s`.
    ///
    /// # Errors
    ///
    /// `Error::UnreachableCell` if no path reaches it, `Error::InvalidInput`
    /// if `(t, s)` is out of range.
    pub fn cell(&self, t: usize, s: StateId) -> Result<ViterbiCell> {
        let cell = *self.cells.get((t, s)).ok_or_else(|| {
            Error::InvalidInput(format!("Viterbi index ({}, {}) out of range", t, s))
        })?;
        cell.ok_or(Error::UnreachableCell {
            time: t,
            state: Some(s),
        })
    }

    /// Follows the backpointers from END back to the first observation and
    /// returns the state indices in chronological order.
    ///
    /// # Errors
    ///
    /// `Error::UnreachableCell` if END (or any cell on the chain) was never
    /// reached.
    pub fn backtrack(&self) -> Result<Vec<StateId>> {
        let terminal = self.terminal.ok_or(Error::UnreachableCell {
            time: self.len(),
            state: None,
        })?;

        let mut path = Vec::with_capacity(self.len());
        let mut pointer = terminal.backpointer;
        let mut t = self.len();
        while let Some(state) = pointer {
            if t == 0 {
                return Err(Error::InvalidState(
                    "Backpointer chain is longer than the lattice".to_string(),
                ));
            }
            t -= 1;
            path.push(state);
            pointer = self.cell(t, state)?.backpointer;
        }
        if t != 0 {
            return Err(Error::InvalidState(format!(
                "Backpointer chain ended early at time {}",
                t
            )));
        }
        path.reverse();
        Ok(path)
    }
}

/// The most likely state sequence and its joint probability with the
/// observations.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath<S> {
    pub states: Vec<S>,
    pub probability: LogProbability,
}

/// Runs the Viterbi Algorithm for a given HMM and a sequence of observations.
///
/// Returns the most likely hidden state sequence, or `None` when every path
/// has probability zero. An empty observation sequence yields an empty path
/// with probability `A(START, END)` when that transition exists.
///
/// Ties are broken towards the lowest state index.
///
/// # Examples
///
/// ```
/// use loghmm::{viterbi, Endpoint, HmmBuilder, Symbol};
///
/// let model = HmmBuilder::new(["A", "B"], ['x', 'y'])
///     .unwrap()
///     .transition_prob(Endpoint::Start, Endpoint::State("A"), 0.5)
///     .unwrap()
///     .transition_prob(Endpoint::Start, Endpoint::State("B"), 0.5)
///     .unwrap()
///     .transition_prob(Endpoint::State("A"), Endpoint::End, 1.0)
///     .unwrap()
///     .transition_prob(Endpoint::State("B"), Endpoint::End, 1.0)
///     .unwrap()
///     .emission_prob("A", Symbol::Known('x'), 1.0)
///     .unwrap()
///     .emission_prob("B", Symbol::Known('y'), 1.0)
///     .unwrap()
///     .build();
///
/// let best = viterbi(&model, &['y']).unwrap();
/// assert_eq!(best.states, vec!["B"]);
/// assert!((best.probability.to_f64() - 0.5).abs() < 1e-12);
/// ```
pub fn viterbi<S, O>(model: &HiddenMarkovModel<S, O>, observations: &[O]) -> Option<BestPath<S>>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let lattice = viterbi_lattice(model, observations);
    match lattice.backtrack() {
        Ok(ids) => Some(BestPath {
            states: ids.into_iter().map(|s| model.states()[s].clone()).collect(),
            probability: lattice.probability()?,
        }),
        Err(err) => {
            trace!("No Viterbi path for {} observations: {}", observations.len(), err);
            None
        }
    }
}

/// Runs the Viterbi recursion and returns the whole table.
pub fn viterbi_lattice<S, O>(model: &HiddenMarkovModel<S, O>, observations: &[O]) -> ViterbiLattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    viterbi_encoded(model, &model.encode(observations))
}

/// Best non-zero candidate; strict comparison keeps the lowest index on ties.
fn best_candidate(
    candidates: impl Iterator<Item = (StateId, LogProbability)>,
) -> Option<(StateId, LogProbability)> {
    let mut best: Option<(StateId, LogProbability)> = None;
    for (state, probability) in candidates {
        if probability.is_zero() {
            continue;
        }
        if best.map_or(true, |(_, p)| probability > p) {
            best = Some((state, probability));
        }
    }
    best
}

pub(crate) fn viterbi_encoded<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[SymbolId],
) -> ViterbiLattice
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    let n = model.num_states();
    let len = observations.len();
    let mut cells: Array2<Option<ViterbiCell>> = Array2::from_elem((len, n), None);

    let Some(&first) = observations.first() else {
        let terminal =
            best_candidate(std::iter::once((0, model.empty()))).map(|(_, p)| ViterbiCell {
                probability: p,
                backpointer: None,
            });
        return ViterbiLattice { cells, terminal };
    };

    // Initialization
    for s in 0..n {
        cells[[0, s]] = best_candidate(std::iter::once((s, model.initial(s) * model.b(s, first))))
            .map(|(_, p)| ViterbiCell {
                probability: p,
                backpointer: None,
            });
    }

    // Recursion
    for t in 1..len {
        let symbol = observations[t];
        for s in 0..n {
            let emit = model.b(s, symbol);
            let candidates = (0..n).filter_map(|prev| {
                cells[[t - 1, prev]].map(|cell| (prev, cell.probability * model.a(prev, s) * emit))
            });
            cells[[t, s]] = best_candidate(candidates).map(|(prev, p)| ViterbiCell {
                probability: p,
                backpointer: Some(prev),
            });
        }
    }

    // Termination
    let candidates = (0..n).filter_map(|s| {
        cells[[len - 1, s]].map(|cell| (s, cell.probability * model.terminal(s)))
    });
    let terminal = best_candidate(candidates).map(|(s, p)| ViterbiCell {
        probability: p,
        backpointer: Some(s),
    });

    ViterbiLattice { cells, terminal }
}
