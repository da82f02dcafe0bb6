//! Probabilities stored as natural logarithms.
//!
//! Long observation sequences multiply hundreds of small probabilities
//! together, which underflows `f64` long before the result is meaningless.
//! [`LogProbability`] keeps `ln(p)` instead and implements the arithmetic the
//! HMM recursions need directly on the log magnitude:
//!
//! - multiplication is addition of logs,
//! - division is subtraction of logs,
//! - addition is the stabilized log-sum-exp.
//!
//! Probability zero is `ln(0) = -inf` and is represented exactly. Neither NaN
//! nor `+inf` is ever stored: the constructors reject them, and products or
//! quotients whose magnitude overflows saturate at `f64::MAX`. Subtraction of
//! probabilities is not representable and is refused.
//!
//! [`LogProbability::new`] and [`LogProbability::from_ln`] accept
//! probabilities only. Counts and unnormalized weights above one go through
//! [`LogProbability::from_weight`].

use std::cmp::Ordering;
use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{Add, Mul};

use num_traits::{One, Zero};

use crate::error::{Error, Result};

/// Largest stored log magnitude. Results that would overflow to `+inf`
/// are clamped here.
const MAX_LOGV: f64 = f64::MAX;

/// Log-magnitude gap past which the smaller operand of an addition is
/// dropped. `exp(-746.0)` underflows to zero in `f64`.
pub const LOG_ADD_CUTOFF: f64 = 746.0;

/// A non-negative real number, usually a probability, stored as `ln(p)`.
///
/// Values are immutable; every operation returns a new value.
///
/// # Examples
///
/// ```
/// use loghmm::LogProbability;
///
/// let a = LogProbability::new(0.2).unwrap();
/// let b = LogProbability::new(0.2).unwrap();
///
/// assert!(((a + b).to_f64() - 0.4).abs() < 1e-12);
/// assert!(((a * b).to_f64() - 0.04).abs() < 1e-12);
/// assert!(a.checked_sub(b).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogProbability {
    logv: f64,
}

impl LogProbability {
    /// Creates a value from a linear-space probability in `[0, 1]`.
    ///
    /// `0.0` maps to `-inf`; anything else to `ln(p)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `p` is NaN or outside `[0, 1]`.
    pub fn new(p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidInput(format!(
                "Probability must lie in [0, 1], got {}",
                p
            )));
        }
        Ok(Self::from_linear(p))
    }

    /// Creates a value from a non-negative count or unnormalized weight,
    /// which may exceed one.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `w` is negative, NaN or infinite.
    pub fn from_weight(w: f64) -> Result<Self> {
        if !w.is_finite() || w < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Weight must be finite and non-negative, got {}",
                w
            )));
        }
        Ok(Self::from_linear(w))
    }

    fn from_linear(x: f64) -> Self {
        if x == 0.0 {
            Self::zero()
        } else {
            Self { logv: x.ln() }
        }
    }

    /// Creates a probability from a magnitude that is already in log space.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` for NaN or any value above `0.0`
    /// (a probability above one), `+inf` included.
    pub fn from_ln(logv: f64) -> Result<Self> {
        if logv.is_nan() || logv > 0.0 {
            return Err(Error::InvalidState(format!(
                "{} is not a valid log-probability",
                logv
            )));
        }
        Ok(Self { logv })
    }

    /// Stores `logv`, clamping an overflow to `+inf` at [`MAX_LOGV`].
    ///
    /// Inputs are sums or differences of stored magnitudes, which are never
    /// NaN or `+inf`, so the only non-finite results are `-inf` (zero) and
    /// an overflow towards `+inf`.
    fn saturating(logv: f64) -> Self {
        debug_assert!(!logv.is_nan());
        Self {
            logv: logv.min(MAX_LOGV),
        }
    }

    /// The stored log magnitude.
    pub fn ln(self) -> f64 {
        self.logv
    }

    /// Converts back to linear space.
    ///
    /// Very small probabilities underflow to `0.0`. Only suitable for display
    /// and tolerance checks, never for further probability arithmetic.
    pub fn to_f64(self) -> f64 {
        self.logv.exp()
    }

    /// Divides two values (`ln(x) - ln(y)`).
    ///
    /// # Errors
    ///
    /// Returns `Error::DivisionByZero` when `other` is probability zero.
    pub fn divide(self, other: Self) -> Result<Self> {
        if other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(Self::saturating(self.logv - other.logv))
    }

    /// Subtraction is not representable in log space and always fails.
    pub fn checked_sub(self, _other: Self) -> Result<Self> {
        Err(Error::UnsupportedOperation(
            "subtraction of log-space probabilities",
        ))
    }
}

impl Zero for LogProbability {
    fn zero() -> Self {
        Self {
            logv: f64::NEG_INFINITY,
        }
    }

    fn is_zero(&self) -> bool {
        self.logv == f64::NEG_INFINITY
    }
}

impl One for LogProbability {
    fn one() -> Self {
        Self { logv: 0.0 }
    }
}

impl Add for LogProbability {
    type Output = Self;

    /// `ln(exp(x) + exp(y))` without leaving log space.
    fn add(self, other: Self) -> Self {
        if self.is_zero() {
            return other;
        }
        if other.is_zero() {
            return self;
        }
        let (hi, lo) = if self.logv >= other.logv {
            (self.logv, other.logv)
        } else {
            (other.logv, self.logv)
        };
        let gap = hi - lo;
        if gap > LOG_ADD_CUTOFF {
            return Self { logv: hi };
        }
        // gap >= 0, so exp never sees a positive argument
        Self::saturating(hi + (-gap).exp().ln_1p())
    }
}

impl Mul for LogProbability {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self::saturating(self.logv + other.logv)
    }
}

impl Sum for LogProbability {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a LogProbability> for LogProbability {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Product for LogProbability {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::one(), |acc, x| acc * x)
    }
}

// NaN is never stored, so the partial order on the magnitude is total.
impl Eq for LogProbability {}

impl PartialOrd for LogProbability {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogProbability {
    fn cmp(&self, other: &Self) -> Ordering {
        self.logv
            .partial_cmp(&other.logv)
            .unwrap_or(Ordering::Equal)
    }
}

impl From<LogProbability> for f64 {
    fn from(value: LogProbability) -> f64 {
        value.to_f64()
    }
}

impl fmt::Display for LogProbability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:.6}", self.logv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(value: f64) -> LogProbability {
        LogProbability::new(value).unwrap()
    }

    #[test]
    fn test_zero_maps_to_negative_infinity() {
        assert_eq!(p(0.0).ln(), f64::NEG_INFINITY);
        assert!(p(0.0).is_zero());
        assert_eq!(p(0.0).to_f64(), 0.0);
        assert_eq!(p(1.0), LogProbability::one());
    }

    #[test]
    fn test_rejects_invalid_linear_values() {
        assert!(matches!(
            LogProbability::new(-0.1),
            Err(Error::InvalidInput(_))
        ));
        assert!(LogProbability::new(f64::NAN).is_err());
        assert!(LogProbability::new(f64::INFINITY).is_err());
        assert!(matches!(
            LogProbability::new(5.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(LogProbability::new(1.0).is_ok());
    }

    #[test]
    fn test_weights_may_exceed_one() {
        let w = LogProbability::from_weight(5.0).unwrap();
        assert_relative_eq!(w.ln(), 5f64.ln(), max_relative = 1e-12);
        assert!(LogProbability::from_weight(0.0).unwrap().is_zero());
        assert!(LogProbability::from_weight(-1.0).is_err());
        assert!(LogProbability::from_weight(f64::INFINITY).is_err());
        assert!(LogProbability::from_weight(f64::NAN).is_err());
    }

    #[test]
    fn test_huge_magnitudes_never_become_nan() {
        let big = LogProbability::from_weight(f64::MAX).unwrap();
        let mut x = big;
        for _ in 0..2000 {
            x = x * x;
        }
        assert_eq!(x.ln(), f64::MAX);

        let times_zero = x * LogProbability::zero();
        assert!(times_zero.is_zero());
        assert!(!times_zero.ln().is_nan());

        let ratio = x.divide(x).unwrap();
        assert_eq!(ratio, LogProbability::one());

        let tiny = LogProbability::from_ln(-f64::MAX).unwrap();
        let quotient = x.divide(tiny).unwrap();
        assert_eq!(quotient.ln(), f64::MAX);
        assert!(!(x + x).ln().is_nan());
        assert!((tiny.divide(x).unwrap()).is_zero());
    }

    #[test]
    fn test_rejects_invalid_log_values() {
        assert!(matches!(
            LogProbability::from_ln(f64::NAN),
            Err(Error::InvalidState(_))
        ));
        assert!(LogProbability::from_ln(f64::INFINITY).is_err());
        assert!(matches!(
            LogProbability::from_ln(f64::MAX),
            Err(Error::InvalidState(_))
        ));
        assert!(LogProbability::from_ln(0.1).is_err());
        assert_eq!(LogProbability::from_ln(0.0).unwrap(), LogProbability::one());
        assert!(LogProbability::from_ln(f64::NEG_INFINITY).unwrap().is_zero());
        assert_relative_eq!(
            LogProbability::from_ln(0.5f64.ln()).unwrap().to_f64(),
            0.5,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_multiply_and_add_match_linear_space() {
        let values = [1.0, 0.9, 0.5, 0.25, 0.1, 1e-3, 1e-8, 0.333];
        for &a in &values {
            for &b in &values {
                assert_relative_eq!((p(a) * p(b)).to_f64(), a * b, max_relative = 1e-9);
                assert_relative_eq!((p(a) + p(b)).to_f64(), a + b, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_is_additive_identity() {
        for &x in &[0.0, 1e-300, 0.3, 1.0] {
            assert_eq!(p(0.0) + p(x), p(x));
            assert_eq!(p(x) + p(0.0), p(x));
        }
    }

    #[test]
    fn test_add_commutative_and_associative() {
        let triples = [(0.1, 0.2, 0.3), (1e-300, 0.5, 1e-12), (0.7, 1e-200, 1e-250)];
        for &(a, b, c) in &triples {
            assert_eq!(p(a) + p(b), p(b) + p(a));
            let left = (p(a) + p(b)) + p(c);
            let right = p(a) + (p(b) + p(c));
            assert_relative_eq!(left.ln(), right.ln(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_add_negligible_term() {
        let tiny = p(1e-300);
        let half = p(0.5);
        assert_relative_eq!((tiny + half).to_f64(), 0.5, max_relative = 1e-12);

        // Both far below f64::MIN_POSITIVE in linear space.
        let x = LogProbability::from_ln(-5000.0).unwrap();
        let y = LogProbability::from_ln(-1.0).unwrap();
        assert_eq!(x + y, y);
        assert_eq!(y + x, y);
    }

    #[test]
    fn test_add_does_not_underflow_for_tiny_values() {
        let x = LogProbability::from_ln(-10_000.0).unwrap();
        let sum = x + x;
        assert_relative_eq!(sum.ln(), -10_000.0 + 2f64.ln(), max_relative = 1e-12);
        assert!(!sum.is_zero());
    }

    #[test]
    fn test_divide() {
        assert_relative_eq!(p(0.2).divide(p(0.4)).unwrap().to_f64(), 0.5, max_relative = 1e-12);
        assert!(p(0.0).divide(p(0.4)).unwrap().is_zero());
        assert_eq!(p(0.2).divide(p(0.0)), Err(Error::DivisionByZero));
        assert_eq!(p(0.0).divide(p(0.0)), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_subtraction_is_unsupported() {
        assert!(matches!(
            p(0.5).checked_sub(p(0.2)),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_ordering_follows_probability() {
        assert!(p(0.0) < p(1e-300));
        assert!(p(0.2) < p(0.3));
        assert_eq!(p(0.3).max(p(0.1)), p(0.3));
        assert_eq!(p(0.25), p(0.25));
    }

    #[test]
    fn test_sum_and_product() {
        let values = vec![p(0.1), p(0.2), p(0.3)];
        let sum: LogProbability = values.iter().sum();
        let product: LogProbability = values.into_iter().product();
        assert_relative_eq!(sum.to_f64(), 0.6, max_relative = 1e-12);
        assert_relative_eq!(product.to_f64(), 0.006, max_relative = 1e-12);

        let empty: Vec<LogProbability> = Vec::new();
        assert!(empty.iter().sum::<LogProbability>().is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(p(1.0).to_string(), "E0.000000");
        assert_eq!(p(0.0).to_string(), "E-inf");
    }
}
