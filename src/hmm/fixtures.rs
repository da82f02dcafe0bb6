//! Small models shared by the unit tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::hmm::init;
use crate::hmm::model::{Endpoint, HiddenMarkovModel, HmmBuilder, Symbol};

/// `forward([3, 1, 3])` on [`weather`], summed by hand over all eight paths:
/// `21690 / 10^7`.
pub const WEATHER_313: f64 = 0.002169;

/// Two-state ice-cream/weather model (Jurafsky & Martin, ch. 6), with the
/// END transitions set to 0.1 so that each row sums to one.
pub fn weather() -> HiddenMarkovModel<&'static str, u32> {
    let hot = || Endpoint::State("HOT");
    let cold = || Endpoint::State("COLD");
    HmmBuilder::new(["HOT", "COLD"], [1, 2, 3])
        .and_then(|b| b.transition_prob(Endpoint::Start, hot(), 0.8))
        .and_then(|b| b.transition_prob(Endpoint::Start, cold(), 0.2))
        .and_then(|b| b.transition_prob(hot(), hot(), 0.7))
        .and_then(|b| b.transition_prob(hot(), cold(), 0.2))
        .and_then(|b| b.transition_prob(hot(), Endpoint::End, 0.1))
        .and_then(|b| b.transition_prob(cold(), cold(), 0.5))
        .and_then(|b| b.transition_prob(cold(), hot(), 0.4))
        .and_then(|b| b.transition_prob(cold(), Endpoint::End, 0.1))
        .and_then(|b| b.emission_prob("HOT", Symbol::Known(1), 0.2))
        .and_then(|b| b.emission_prob("HOT", Symbol::Known(2), 0.4))
        .and_then(|b| b.emission_prob("HOT", Symbol::Known(3), 0.4))
        .and_then(|b| b.emission_prob("COLD", Symbol::Known(1), 0.5))
        .and_then(|b| b.emission_prob("COLD", Symbol::Known(2), 0.4))
        .and_then(|b| b.emission_prob("COLD", Symbol::Known(3), 0.1))
        .unwrap()
        .build()
}

/// One state that may be skipped entirely: `A(START, END) = p_empty`.
pub fn with_empty_transition(p_empty: f64) -> HiddenMarkovModel<&'static str, char> {
    HmmBuilder::new(["s"], ['a'])
        .and_then(|b| b.transition_prob(Endpoint::Start, Endpoint::End, p_empty))
        .and_then(|b| b.transition_prob(Endpoint::Start, Endpoint::State("s"), 1.0 - p_empty))
        .and_then(|b| b.transition_prob(Endpoint::State("s"), Endpoint::End, 1.0))
        .and_then(|b| b.emission_prob("s", Symbol::Known('a'), 1.0))
        .unwrap()
        .build()
}

/// One state reserving 0.1 of its emission mass for UNKNOWN.
pub fn with_unknown_mass() -> HiddenMarkovModel<&'static str, char> {
    HmmBuilder::new(["s"], ['a'])
        .and_then(|b| b.transition_prob(Endpoint::Start, Endpoint::State("s"), 1.0))
        .and_then(|b| b.transition_prob(Endpoint::State("s"), Endpoint::End, 1.0))
        .and_then(|b| b.emission_prob("s", Symbol::Known('a'), 0.9))
        .and_then(|b| b.emission_prob("s", Symbol::Unknown, 0.1))
        .unwrap()
        .build()
}

/// Fully connected random model over states `0..num_states` and symbols
/// `0..num_symbols`.
pub fn random_model(
    num_states: usize,
    num_symbols: usize,
    seed: u64,
) -> HiddenMarkovModel<usize, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    init::random(0..num_states, 0..num_symbols, &mut rng).unwrap()
}
