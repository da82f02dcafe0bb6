//! Baum-Welch (forward-backward) re-estimation.
//!
//! Each iteration runs forward and backward over every training sequence,
//! accumulates the expected transition, emission and endpoint counts, and
//! normalizes them into a fresh model with the same labels. Training stops
//! once the summed squared change of all parameters drops below the
//! configured tolerance, or after `max_iterations`.
//!
//! The E-step is independent per sequence and runs on the rayon pool. The
//! iterations themselves are sequential.

use std::hash::Hash;

use log::{debug, warn};
use ndarray::{Array2, Zip};
use num_traits::{One, Zero};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::hmm::backward::backward_encoded;
use crate::hmm::forward::forward_encoded;
use crate::hmm::model::{HiddenMarkovModel, Parameters, SymbolId};
use crate::probability::LogProbability;

/// Stopping rule for [`baum_welch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BaumWelchConfig {
    /// Maximum number of EM iterations
    pub max_iterations: usize,
    /// Convergence threshold on the summed squared parameter change
    pub tolerance: f64,
}

impl Default for BaumWelchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-4,
        }
    }
}

impl BaumWelchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::invalid_input("max_iterations must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct BaumWelchResult<S, O> {
    /// The re-estimated model
    pub model: HiddenMarkovModel<S, O>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Whether the tolerance was reached before `max_iterations`
    pub converged: bool,
    /// Squared parameter change of the last iteration
    pub delta: f64,
    /// Natural-log likelihood of the training data under the model that
    /// entered the last iteration
    pub log_likelihood: f64,
}

/// Expected counts from one or more sequences.
#[derive(Debug, Clone)]
struct ExpectedCounts {
    initial: Vec<LogProbability>,
    terminal: Vec<LogProbability>,
    empty: LogProbability,
    transitions: Array2<LogProbability>,
    emissions: Array2<LogProbability>,
    sequences: usize,
    log_likelihood: f64,
}

impl ExpectedCounts {
    fn zeros(num_states: usize, num_columns: usize) -> Self {
        Self {
            initial: vec![LogProbability::zero(); num_states],
            terminal: vec![LogProbability::zero(); num_states],
            empty: LogProbability::zero(),
            transitions: Array2::from_elem((num_states, num_states), LogProbability::zero()),
            emissions: Array2::from_elem((num_states, num_columns), LogProbability::zero()),
            sequences: 0,
            log_likelihood: 0.0,
        }
    }

    fn merge(mut self, other: &Self) -> Self {
        let add = |a: &mut LogProbability, &b: &LogProbability| *a = *a + b;
        self.initial.iter_mut().zip(&other.initial).for_each(|(a, b)| add(a, b));
        self.terminal.iter_mut().zip(&other.terminal).for_each(|(a, b)| add(a, b));
        add(&mut self.empty, &other.empty);
        Zip::from(&mut self.transitions)
            .and(&other.transitions)
            .for_each(add);
        Zip::from(&mut self.emissions).and(&other.emissions).for_each(add);
        self.sequences += other.sequences;
        self.log_likelihood += other.log_likelihood;
        self
    }
}

/// Adds the expected counts of one encoded sequence to `counts`.
///
/// Returns `false`, leaving `counts` untouched, if the model assigns the
/// sequence probability zero.
fn accumulate<S, O>(
    model: &HiddenMarkovModel<S, O>,
    observations: &[SymbolId],
    counts: &mut ExpectedCounts,
) -> Result<bool>
where
    S: Clone + Eq + Hash,
    O: Clone + Eq + Hash,
{
    if observations.is_empty() {
        let p = model.empty();
        if p.is_zero() {
            return Ok(false);
        }
        // The only path is START -> END.
        counts.empty = counts.empty + LogProbability::one();
        counts.sequences += 1;
        counts.log_likelihood += p.ln();
        return Ok(true);
    }

    let alpha = forward_encoded(model, observations);
    let p = alpha.probability();
    if p.is_zero() {
        return Ok(false);
    }
    let beta = backward_encoded(model, observations);
    let last = observations.len() - 1;

    for (t, &symbol) in observations.iter().enumerate() {
        for i in 0..model.num_states() {
            let a_ti = alpha.get(t, i)?;
            let gamma = (a_ti * beta.get(t, i)?).divide(p)?;
            counts.emissions[[i, symbol]] = counts.emissions[[i, symbol]] + gamma;
            if t == 0 {
                counts.initial[i] = counts.initial[i] + gamma;
            }
            if t == last {
                counts.terminal[i] = counts.terminal[i] + gamma;
                continue;
            }
            let next = observations[t + 1];
            for j in 0..model.num_states() {
                let path = a_ti * model.a(i, j) * model.b(j, next) * beta.get(t + 1, j)?;
                counts.transitions[[i, j]] = counts.transitions[[i, j]] + path.divide(p)?;
            }
        }
    }

    counts.sequences += 1;
    counts.log_likelihood += p.ln();
    Ok(true)
}

/// E-step over the whole training set.
///
/// Each rayon worker folds its share of the sequences into one accumulator;
/// the accumulators are then merged pairwise.
fn expected_counts<S, O>(
    model: &HiddenMarkovModel<S, O>,
    sequences: &[Vec<SymbolId>],
) -> Result<ExpectedCounts>
where
    S: Clone + Eq + Hash + Send + Sync,
    O: Clone + Eq + Hash + Send + Sync,
{
    let (n, columns) = (model.num_states(), model.num_symbols() + 1);
    let total = sequences
        .par_iter()
        .enumerate()
        .try_fold(
            || ExpectedCounts::zeros(n, columns),
            |mut counts, (index, observations)| -> Result<ExpectedCounts> {
                if !accumulate(model, observations, &mut counts)? {
                    warn!("Skipping training sequence {} with zero likelihood", index);
                }
                Ok(counts)
            },
        )
        .try_reduce(
            || ExpectedCounts::zeros(n, columns),
            |left, right| Ok(left.merge(&right)),
        )?;

    if total.sequences == 0 {
        return Err(Error::ZeroLikelihood);
    }
    Ok(total)
}

/// Normalizes `counts` row by row. A row with no expected mass keeps its
/// previous values.
fn reestimate(previous: &Parameters, counts: &ExpectedCounts) -> Result<Parameters> {
    let mut next = previous.clone();

    let start_total = counts.initial.iter().sum::<LogProbability>() + counts.empty;
    if !start_total.is_zero() {
        for (p, &c) in next.initial.iter_mut().zip(&counts.initial) {
            *p = c.divide(start_total)?;
        }
        next.empty = counts.empty.divide(start_total)?;
    }

    for i in 0..previous.initial.len() {
        let outflow = counts.transitions.row(i).iter().sum::<LogProbability>() + counts.terminal[i];
        if !outflow.is_zero() {
            for (p, &c) in next
                .transitions
                .row_mut(i)
                .iter_mut()
                .zip(counts.transitions.row(i))
            {
                *p = c.divide(outflow)?;
            }
            next.terminal[i] = counts.terminal[i].divide(outflow)?;
        }

        let occupancy = counts.emissions.row(i).iter().sum::<LogProbability>();
        if !occupancy.is_zero() {
            for (p, &c) in next
                .emissions
                .row_mut(i)
                .iter_mut()
                .zip(counts.emissions.row(i))
            {
                *p = c.divide(occupancy)?;
            }
        }
    }

    Ok(next)
}

/// Trains `initial` on `sequences` by expectation-maximization.
///
/// Symbols outside the model's vocabulary are treated as UNKNOWN. Sequences
/// the current model cannot produce are skipped for that iteration.
///
/// # Errors
///
/// - `Error::InvalidInput` for an invalid config or no sequences
/// - `Error::ZeroLikelihood` if every sequence has probability zero
///
/// # Examples
///
/// ```
/// use loghmm::hmm::baum_welch::{baum_welch, BaumWelchConfig};
/// use loghmm::hmm::init;
///
/// let start = init::uniform(["s"], ['a', 'b']).unwrap();
/// let data = vec![vec!['a', 'b'], vec!['a', 'a', 'b']];
/// let trained = baum_welch(&start, &data, &BaumWelchConfig::default()).unwrap();
/// assert!(trained.converged);
/// ```
pub fn baum_welch<S, O, Q>(
    initial: &HiddenMarkovModel<S, O>,
    sequences: &[Q],
    config: &BaumWelchConfig,
) -> Result<BaumWelchResult<S, O>>
where
    S: Clone + Eq + Hash + Send + Sync,
    O: Clone + Eq + Hash + Send + Sync,
    Q: AsRef<[O]>,
{
    config.validate()?;
    if sequences.is_empty() {
        return Err(Error::invalid_input("Baum-Welch needs at least one training sequence"));
    }

    let encoded: Vec<Vec<SymbolId>> = sequences
        .iter()
        .map(|sequence| initial.encode(sequence.as_ref()))
        .collect();

    let mut model = initial.clone();
    let mut delta = f64::INFINITY;
    let mut log_likelihood = f64::NEG_INFINITY;

    for iteration in 1..=config.max_iterations {
        let counts = expected_counts(&model, &encoded)?;
        log_likelihood = counts.log_likelihood;

        let params = reestimate(model.parameters(), &counts)?;
        delta = params.squared_distance(model.parameters());
        model = model.with_parameters(params);

        debug!(
            "Baum-Welch iteration {}: log-likelihood {:.6}, delta {:.3e}",
            iteration, log_likelihood, delta
        );

        if delta < config.tolerance {
            return Ok(BaumWelchResult {
                model,
                iterations: iteration,
                converged: true,
                delta,
                log_likelihood,
            });
        }
    }

    warn!(
        "Baum-Welch did not converge in {} iterations (delta {:.3e})",
        config.max_iterations, delta
    );
    Ok(BaumWelchResult {
        model,
        iterations: config.max_iterations,
        converged: false,
        delta,
        log_likelihood,
    })
}
