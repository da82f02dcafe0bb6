//! Time x state tables produced by the forward and backward passes.

use ndarray::Array2;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::hmm::model::StateId;
use crate::probability::LogProbability;

/// A filled forward (`alpha`) or backward (`beta`) lattice together with the
/// total sequence probability it yields.
///
/// Time steps are 0-based: `get(0, s)` is the first observation. A freshly
/// allocated cell is unset, and reading it is an error rather than an
/// implicit zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    cells: Array2<Option<LogProbability>>,
    probability: LogProbability,
}

impl Lattice {
    pub(crate) fn new(len: usize, num_states: usize) -> Self {
        Self {
            cells: Array2::from_elem((len, num_states), None),
            probability: LogProbability::zero(),
        }
    }

    pub(crate) fn set_row(&mut self, t: usize, row: &[LogProbability]) {
        for (cell, &value) in self.cells.row_mut(t).iter_mut().zip(row) {
            *cell = Some(value);
        }
    }

    pub(crate) fn set_probability(&mut self, probability: LogProbability) {
        self.probability = probability;
    }

    /// Total probability of the observation sequence.
    pub fn probability(&self) -> LogProbability {
        self.probability
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.cells.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_states(&self) -> usize {
        self.cells.ncols()
    }

    /// The cell at time `t` for state `s`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` if `(t, s)` is out of range, `Error::InvalidState`
    /// if the cell was never written.
    pub fn get(&self, t: usize, s: StateId) -> Result<LogProbability> {
        let cell = *self.cells.get((t, s)).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Lattice index ({}, {}) out of range for {} x {}",
                t,
                s,
                self.len(),
                self.num_states()
            ))
        })?;
        cell.ok_or_else(|| {
            Error::InvalidState(format!("Lattice cell ({}, {}) is uninitialized", t, s))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn test_unset_cells_fail_loudly() {
        let mut lattice = Lattice::new(2, 2);
        lattice.set_row(0, &[LogProbability::one(), LogProbability::zero()]);

        assert_eq!(lattice.get(0, 0), Ok(LogProbability::one()));
        assert!(lattice.get(0, 1).unwrap().is_zero());
        assert!(matches!(lattice.get(1, 0), Err(Error::InvalidState(_))));
        assert!(matches!(lattice.get(2, 0), Err(Error::InvalidInput(_))));
        assert!(matches!(lattice.get(0, 5), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_shape() {
        let lattice = Lattice::new(0, 3);
        assert!(lattice.is_empty());
        assert_eq!(lattice.num_states(), 3);
        assert!(lattice.probability().is_zero());
    }
}
