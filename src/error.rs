use thiserror::Error;

/// Errors produced by the probability type and the inference algorithms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed arguments: bad graph edges, unknown labels, negative weights.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An uninitialized value was read or produced.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The operation has no meaning for the value type.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Backtracking reached a lattice cell that no path ever entered.
    /// `state` is `None` for the terminal END cell.
    #[error("Lattice cell at time {time}, state {state:?} was never reached")]
    UnreachableCell { time: usize, state: Option<usize> },

    /// A probability was divided by probability zero.
    #[error("Division by a zero probability")]
    DivisionByZero,

    /// No training sequence has non-zero probability under the model.
    #[error("Every training sequence has zero likelihood under the model")]
    ZeroLikelihood,
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
