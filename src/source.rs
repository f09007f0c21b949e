//! Pluggable generators for simulated request sizes.
//!
//! Allocators never touch an ambient random generator. Tests hand them a
//! [`FixedSequence`]; interactive runs use a [`SeededRequests`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces request sizes in `1..=max`.
pub trait RequestSource {
    /// Returns the next request size, always within `1..=max`.
    ///
    /// Callers guarantee `max >= 1`.
    fn next_request(&mut self, max: usize) -> usize;
}

impl<S: RequestSource + ?Sized> RequestSource for &mut S {
    fn next_request(&mut self, max: usize) -> usize {
        (**self).next_request(max)
    }
}

impl<S: RequestSource + ?Sized> RequestSource for Box<S> {
    fn next_request(&mut self, max: usize) -> usize {
        (**self).next_request(max)
    }
}

/// Replays a fixed list of sizes, cycling back to the start when exhausted.
///
/// Values are clamped into `1..=max`. An empty sequence always yields `max`.
#[derive(Debug, Clone, Default)]
pub struct FixedSequence {
    values: Vec<usize>,
    cursor: usize,
}

impl FixedSequence {
    /// Creates a source replaying `values` in order.
    pub fn new(values: impl IntoIterator<Item = usize>) -> Self {
        Self { values: values.into_iter().collect(), cursor: 0 }
    }
}

impl RequestSource for FixedSequence {
    fn next_request(&mut self, max: usize) -> usize {
        if self.values.is_empty() {
            return max;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = (self.cursor + 1) % self.values.len();
        value.clamp(1, max)
    }
}

/// Uniform sizes drawn from a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededRequests {
    rng: StdRng,
    seed: u64,
}

impl SeededRequests {
    /// Creates a generator with the given seed.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), seed }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resets the generator to its initial state.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

impl RequestSource for SeededRequests {
    fn next_request(&mut self, max: usize) -> usize {
        self.rng.gen_range(1..=max.max(1))
    }
}
