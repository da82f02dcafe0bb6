//! Discrete Hidden Markov Models with explicit START and END states.
//!
//! All probabilities are carried as [`LogProbability`] so that long
//! sequences do not underflow. The [`hmm`] module holds the model and the
//! algorithms over it: forward, backward, Viterbi and Baum-Welch.
//!
//! ```
//! use loghmm::{forward, viterbi, Endpoint, HmmBuilder, Symbol};
//!
//! let model = HmmBuilder::new(["HOT", "COLD"], [1, 2, 3])?
//!     .transition_prob(Endpoint::Start, Endpoint::State("HOT"), 0.8)?
//!     .transition_prob(Endpoint::Start, Endpoint::State("COLD"), 0.2)?
//!     .transition_prob(Endpoint::State("HOT"), Endpoint::State("HOT"), 0.7)?
//!     .transition_prob(Endpoint::State("HOT"), Endpoint::State("COLD"), 0.2)?
//!     .transition_prob(Endpoint::State("HOT"), Endpoint::End, 0.1)?
//!     .transition_prob(Endpoint::State("COLD"), Endpoint::State("COLD"), 0.5)?
//!     .transition_prob(Endpoint::State("COLD"), Endpoint::State("HOT"), 0.4)?
//!     .transition_prob(Endpoint::State("COLD"), Endpoint::End, 0.1)?
//!     .emission_prob("HOT", Symbol::Known(1), 0.2)?
//!     .emission_prob("HOT", Symbol::Known(2), 0.4)?
//!     .emission_prob("HOT", Symbol::Known(3), 0.4)?
//!     .emission_prob("COLD", Symbol::Known(1), 0.5)?
//!     .emission_prob("COLD", Symbol::Known(2), 0.4)?
//!     .emission_prob("COLD", Symbol::Known(3), 0.1)?
//!     .build();
//!
//! let alpha = forward(&model, &[3, 1, 3]);
//! assert!((alpha.probability().to_f64() - 0.002169).abs() < 1e-9);
//!
//! let best = viterbi(&model, &[3, 1, 3]).unwrap();
//! assert_eq!(best.states, vec!["HOT", "HOT", "HOT"]);
//! # Ok::<(), loghmm::Error>(())
//! ```

pub mod error;
pub mod hmm;
pub mod probability;

pub use error::{Error, Result};
pub use hmm::{
    backward, baum_welch, forward, likelihood, viterbi, BaumWelchConfig, BestPath, Endpoint,
    HiddenMarkovModel, HmmBuilder, Lattice, Symbol,
};
pub use probability::LogProbability;
