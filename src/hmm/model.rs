//! The HMM graph: transition probabilities `A(from, to)` over
//! `{START} ∪ S ∪ {END}` and emission probabilities `B(state, symbol)` over
//! the vocabulary plus a reserved UNKNOWN symbol.
//!
//! Labels are arbitrary hashable types. Internally states and symbols are
//! dense indices in insertion order; the state index is what every algorithm
//! uses to break ties deterministically. Any pair the builder never set reads
//! as probability zero.

use std::collections::HashMap;
use std::hash::Hash;

use ndarray::Array2;
use num_traits::Zero;
use rand::Rng;

use crate::error::{Error, Result};
use crate::probability::LogProbability;

/// Index of a hidden state in [`HiddenMarkovModel::states`].
pub type StateId = usize;

/// Index of an observation symbol; [`HiddenMarkovModel::unknown_symbol`] is
/// one past the last vocabulary entry.
pub type SymbolId = usize;

/// One end of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint<S> {
    Start,
    State(S),
    End,
}

/// An emitted symbol, or the UNKNOWN stand-in for out-of-vocabulary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol<O> {
    Known(O),
    Unknown,
}

/// Dense parameter tables shared by the builder, the estimators and the
/// inference algorithms.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parameters {
    /// `A(START, s)`
    pub initial: Vec<LogProbability>,
    /// `A(s, END)`
    pub terminal: Vec<LogProbability>,
    /// `A(START, END)`, the probability of the empty sequence
    pub empty: LogProbability,
    /// `A(i, j)`, `N x N`
    pub transitions: Array2<LogProbability>,
    /// `B(s, v)`, `N x (V + 1)`; the last column is UNKNOWN
    pub emissions: Array2<LogProbability>,
}

impl Parameters {
    pub fn zeros(num_states: usize, num_symbols: usize) -> Self {
        Self {
            initial: vec![LogProbability::zero(); num_states],
            terminal: vec![LogProbability::zero(); num_states],
            empty: LogProbability::zero(),
            transitions: Array2::from_elem((num_states, num_states), LogProbability::zero()),
            emissions: Array2::from_elem((num_states, num_symbols + 1), LogProbability::zero()),
        }
    }

    /// Sum of squared linear-space differences over every parameter.
    pub fn squared_distance(&self, other: &Self) -> f64 {
        let sq = |a: &LogProbability, b: &LogProbability| (a.to_f64() - b.to_f64()).powi(2);

        let mut total = sq(&self.empty, &other.empty);
        total += self.initial.iter().zip(&other.initial).map(|(a, b)| sq(a, b)).sum::<f64>();
        total += self.terminal.iter().zip(&other.terminal).map(|(a, b)| sq(a, b)).sum::<f64>();
        total += self
            .transitions
            .iter()
            .zip(other.transitions.iter())
            .map(|(a, b)| sq(a, b))
            .sum::<f64>();
        total += self
            .emissions
            .iter()
            .zip(other.emissions.iter())
            .map(|(a, b)| sq(a, b))
            .sum::<f64>();
        total
    }
}

fn index_labels<T>(
    items: impl IntoIterator<Item = T>,
    what: &str,
) -> Result<(Vec<T>, HashMap<T, usize>)>
where
    T: Clone + Eq + Hash,
{
    let mut labels = Vec::new();
    let mut ids = HashMap::new();
    for item in items {
        if ids.insert(item.clone(), labels.len()).is_some() {
            return Err(Error::InvalidInput(format!(
                "Duplicate {} label at position {}",
                what,
                labels.len()
            )));
        }
        labels.push(item);
    }
    Ok((labels, ids))
}

/// A discrete Hidden Markov Model with explicit START and END states.
///
/// The graph is immutable; re-estimation produces a new model.
///
/// # Examples
///
/// ```
/// use loghmm::{Endpoint, HmmBuilder, LogProbability, Symbol};
///
/// let model = HmmBuilder::new(["rain", "sun"], ['u', 'n'])
///     .unwrap()
///     .transition_prob(Endpoint::Start, Endpoint::State("rain"), 0.5)
///     .unwrap()
///     .transition_prob(Endpoint::Start, Endpoint::State("sun"), 0.5)
///     .unwrap()
///     .build();
///
/// assert_eq!(model.num_states(), 2);
/// assert_eq!(
///     model.transition(Endpoint::State(&"rain"), Endpoint::End),
///     LogProbability::new(0.0).unwrap()
/// );
/// assert!(model.emission(&"sun", Symbol::Unknown).ln().is_infinite());
/// ```
#[derive(Debug, Clone)]
pub struct HiddenMarkovModel<S, O> {
    states: Vec<S>,
    state_ids: HashMap<S, StateId>,
    symbols: Vec<O>,
    symbol_ids: HashMap<O, SymbolId>,
    params: Parameters,
}

impl<S, O> HiddenMarkovModel<S, O>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    /// Hidden states in index order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Vocabulary in index order, without UNKNOWN.
    pub fn symbols(&self) -> &[O] {
        &self.symbols
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn unknown_symbol(&self) -> SymbolId {
        self.symbols.len()
    }

    pub fn state_id(&self, state: &S) -> Option<StateId> {
        self.state_ids.get(state).copied()
    }

    /// Index of `symbol`, or the UNKNOWN index when it is out of vocabulary.
    pub fn symbol_id(&self, symbol: &O) -> SymbolId {
        self.symbol_ids
            .get(symbol)
            .copied()
            .unwrap_or_else(|| self.unknown_symbol())
    }

    /// Maps an observation sequence to symbol indices, replacing
    /// out-of-vocabulary symbols with UNKNOWN.
    pub fn encode(&self, observations: &[O]) -> Vec<SymbolId> {
        observations.iter().map(|o| self.symbol_id(o)).collect()
    }

    /// `A(from, to)`. Unknown labels, edges into START and edges out of END
    /// all read as probability zero.
    pub fn transition(&self, from: Endpoint<&S>, to: Endpoint<&S>) -> LogProbability {
        let zero = LogProbability::zero();
        match (from, to) {
            (Endpoint::Start, Endpoint::End) => self.params.empty,
            (Endpoint::Start, Endpoint::State(s)) => {
                self.state_id(s).map_or(zero, |j| self.params.initial[j])
            }
            (Endpoint::State(s), Endpoint::End) => {
                self.state_id(s).map_or(zero, |i| self.params.terminal[i])
            }
            (Endpoint::State(from), Endpoint::State(to)) => {
                match (self.state_id(from), self.state_id(to)) {
                    (Some(i), Some(j)) => self.params.transitions[[i, j]],
                    _ => zero,
                }
            }
            _ => zero,
        }
    }

    /// `B(state, symbol)`. A known symbol missing from the vocabulary reads
    /// as zero; use [`HiddenMarkovModel::encode`] to route it to UNKNOWN.
    pub fn emission(&self, state: &S, symbol: Symbol<&O>) -> LogProbability {
        let Some(s) = self.state_id(state) else {
            return LogProbability::zero();
        };
        let v = match symbol {
            Symbol::Known(o) => match self.symbol_ids.get(o) {
                Some(&v) => v,
                None => return LogProbability::zero(),
            },
            Symbol::Unknown => self.unknown_symbol(),
        };
        self.params.emissions[[s, v]]
    }

    /// Verifies that the START row, every state's outgoing transitions
    /// (END included) and every emission row (UNKNOWN included) sum to one
    /// in linear space within `tolerance`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` naming the first row that does not.
    pub fn check_normalized(&self, tolerance: f64) -> Result<()> {
        let check = |row: LogProbability, what: String| -> Result<()> {
            let sum = row.to_f64();
            if (sum - 1.0).abs() > tolerance {
                return Err(Error::InvalidInput(format!(
                    "{} sums to {}, expected 1",
                    what, sum
                )));
            }
            Ok(())
        };

        let start: LogProbability = self.params.initial.iter().sum();
        check(start + self.params.empty, "Transition row of START".to_string())?;

        for s in 0..self.num_states() {
            let outgoing: LogProbability = self.params.transitions.row(s).iter().sum();
            check(
                outgoing + self.params.terminal[s],
                format!("Transition row of state {}", s),
            )?;
            let emitted: LogProbability = self.params.emissions.row(s).iter().sum();
            check(emitted, format!("Emission row of state {}", s))?;
        }
        Ok(())
    }

    /// Walks the chain from START, emitting one known symbol per visited
    /// state, until END is drawn or `max_len` states were visited.
    ///
    /// UNKNOWN has no concrete symbol to emit, so emissions are drawn from
    /// the vocabulary alone, renormalized. The walk also stops at a state
    /// that cannot emit any known symbol.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, max_len: usize) -> (Vec<S>, Vec<O>) {
        let mut states = Vec::new();
        let mut symbols = Vec::new();
        let mut current: Option<StateId> = None;

        while states.len() < max_len {
            let successors: Vec<LogProbability> = match current {
                None => self
                    .params
                    .initial
                    .iter()
                    .copied()
                    .chain(std::iter::once(self.params.empty))
                    .collect(),
                Some(i) => self
                    .params
                    .transitions
                    .row(i)
                    .iter()
                    .copied()
                    .chain(std::iter::once(self.params.terminal[i]))
                    .collect(),
            };
            let next = match draw(rng, &successors) {
                Some(s) if s < self.num_states() => s,
                _ => break,
            };

            let known: Vec<LogProbability> = self
                .params
                .emissions
                .row(next)
                .iter()
                .take(self.num_symbols())
                .copied()
                .collect();
            let Some(v) = draw(rng, &known) else {
                break;
            };

            states.push(self.states[next].clone());
            symbols.push(self.symbols[v].clone());
            current = Some(next);
        }
        (states, symbols)
    }

    pub(crate) fn initial(&self, s: StateId) -> LogProbability {
        self.params.initial[s]
    }

    pub(crate) fn terminal(&self, s: StateId) -> LogProbability {
        self.params.terminal[s]
    }

    pub(crate) fn empty(&self) -> LogProbability {
        self.params.empty
    }

    pub(crate) fn a(&self, from: StateId, to: StateId) -> LogProbability {
        self.params.transitions[[from, to]]
    }

    pub(crate) fn b(&self, state: StateId, symbol: SymbolId) -> LogProbability {
        self.params.emissions[[state, symbol]]
    }

    pub(crate) fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Same labels, new tables. Shapes must match the current ones.
    pub(crate) fn with_parameters(&self, params: Parameters) -> Self {
        debug_assert_eq!(params.transitions.dim(), self.params.transitions.dim());
        debug_assert_eq!(params.emissions.dim(), self.params.emissions.dim());
        Self {
            states: self.states.clone(),
            state_ids: self.state_ids.clone(),
            symbols: self.symbols.clone(),
            symbol_ids: self.symbol_ids.clone(),
            params,
        }
    }
}

/// Draws an index with probability proportional to `weights`.
fn draw<R: Rng + ?Sized>(rng: &mut R, weights: &[LogProbability]) -> Option<usize> {
    let total: f64 = weights.iter().map(|w| w.to_f64()).sum();
    if total <= 0.0 {
        return None;
    }
    let target = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last = None;
    for (i, w) in weights.iter().enumerate() {
        let w = w.to_f64();
        if w <= 0.0 {
            continue;
        }
        acc += w;
        last = Some(i);
        if target < acc {
            return Some(i);
        }
    }
    last
}

/// Incremental construction of a [`HiddenMarkovModel`].
///
/// Every entry starts at probability zero. Edges into START, edges out of
/// END and unknown labels are rejected as they are added.
#[derive(Debug, Clone)]
pub struct HmmBuilder<S, O> {
    states: Vec<S>,
    state_ids: HashMap<S, StateId>,
    symbols: Vec<O>,
    symbol_ids: HashMap<O, SymbolId>,
    params: Parameters,
}

impl<S, O> HmmBuilder<S, O>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    /// Starts a model over the given states and vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty state set or duplicate labels.
    pub fn new(
        states: impl IntoIterator<Item = S>,
        symbols: impl IntoIterator<Item = O>,
    ) -> Result<Self> {
        let (states, state_ids) = index_labels(states, "state")?;
        if states.is_empty() {
            return Err(Error::invalid_input("An HMM needs at least one state"));
        }
        let (symbols, symbol_ids) = index_labels(symbols, "symbol")?;
        let params = Parameters::zeros(states.len(), symbols.len());
        Ok(Self {
            states,
            state_ids,
            symbols,
            symbol_ids,
            params,
        })
    }

    fn state(&self, state: &S) -> Result<StateId> {
        self.state_ids
            .get(state)
            .copied()
            .ok_or_else(|| Error::invalid_input("Unknown state label"))
    }

    /// Sets `A(from, to)`.
    pub fn transition(
        mut self,
        from: Endpoint<S>,
        to: Endpoint<S>,
        probability: LogProbability,
    ) -> Result<Self> {
        match (&from, &to) {
            (_, Endpoint::Start) => {
                return Err(Error::invalid_input("START has no incoming transitions"));
            }
            (Endpoint::End, _) => {
                return Err(Error::invalid_input("END has no outgoing transitions"));
            }
            (Endpoint::Start, Endpoint::End) => self.params.empty = probability,
            (Endpoint::Start, Endpoint::State(s)) => {
                let j = self.state(s)?;
                self.params.initial[j] = probability;
            }
            (Endpoint::State(s), Endpoint::End) => {
                let i = self.state(s)?;
                self.params.terminal[i] = probability;
            }
            (Endpoint::State(a), Endpoint::State(b)) => {
                let (i, j) = (self.state(a)?, self.state(b)?);
                self.params.transitions[[i, j]] = probability;
            }
        }
        Ok(self)
    }

    /// Sets `A(from, to)` from a linear-space probability.
    pub fn transition_prob(
        self,
        from: Endpoint<S>,
        to: Endpoint<S>,
        probability: f64,
    ) -> Result<Self> {
        self.transition(from, to, LogProbability::new(probability)?)
    }

    /// Sets `B(state, symbol)`.
    pub fn emission(
        mut self,
        state: S,
        symbol: Symbol<O>,
        probability: LogProbability,
    ) -> Result<Self> {
        let s = self.state(&state)?;
        let v = match symbol {
            Symbol::Known(o) => *self
                .symbol_ids
                .get(&o)
                .ok_or_else(|| {
                    Error::invalid_input("Unknown symbol; add it to the vocabulary first")
                })?,
            Symbol::Unknown => self.symbols.len(),
        };
        self.params.emissions[[s, v]] = probability;
        Ok(self)
    }

    /// Sets `B(state, symbol)` from a linear-space probability.
    pub fn emission_prob(self, state: S, symbol: Symbol<O>, probability: f64) -> Result<Self> {
        self.emission(state, symbol, LogProbability::new(probability)?)
    }

    pub fn build(self) -> HiddenMarkovModel<S, O> {
        HiddenMarkovModel {
            states: self.states,
            state_ids: self.state_ids,
            symbols: self.symbols,
            symbol_ids: self.symbol_ids,
            params: self.params,
        }
    }
}
