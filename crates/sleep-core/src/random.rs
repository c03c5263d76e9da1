//! Injectable uniform random source.
//!
//! Every random draw in the simulator goes through [`RandomSource`] so tests
//! can replay exact sequences and dependency failures surface as errors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RandomSourceError {
    #[error("random source exhausted")]
    Exhausted,
    #[error("random draw {0} outside [0, 1)")]
    OutOfRange(f64),
    #[error("random source failure: {0}")]
    Failure(String),
}

pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> Result<f64, RandomSourceError>;

    /// Uniform draw in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> Result<f64, RandomSourceError> {
        Ok(lo + (hi - lo) * self.next_unit()?)
    }

    /// Uniform draw in `[-half_width, half_width)`.
    fn centered(&mut self, half_width: f64) -> Result<f64, RandomSourceError> {
        Ok((self.next_unit()? - 0.5) * 2.0 * half_width)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_unit(&mut self) -> Result<f64, RandomSourceError> {
        (**self).next_unit()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_unit(&mut self) -> Result<f64, RandomSourceError> {
        (**self).next_unit()
    }
}

/// [`RandomSource`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> Result<f64, RandomSourceError> {
        Ok(self.rng.gen::<f64>())
    }
}

/// Replays a fixed list of draws. Used to pin simulations in tests and demos.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    draws: VecDeque<f64>,
    cycle: bool,
}

impl SequenceSource {
    /// Fails with [`RandomSourceError::Exhausted`] after the last draw.
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            cycle: false,
        }
    }

    /// Starts over from the first draw once the list runs out.
    pub fn repeating(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            cycle: true,
        }
    }

    /// Same value forever.
    pub fn constant(draw: f64) -> Self {
        Self::repeating([draw])
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> Result<f64, RandomSourceError> {
        let draw = self.draws.pop_front().ok_or(RandomSourceError::Exhausted)?;
        if self.cycle {
            self.draws.push_back(draw);
        }
        if !(0.0..1.0).contains(&draw) {
            return Err(RandomSourceError::OutOfRange(draw));
        }
        Ok(draw)
    }
}

/// Walks the cumulative weights and returns the first item whose running sum
/// reaches the draw, falling back to the last item. `N` must be non-zero.
pub fn weighted_choice<T: Copy, const N: usize>(
    source: &mut (impl RandomSource + ?Sized),
    choices: &[(T, f64); N],
) -> Result<T, RandomSourceError> {
    let draw = source.next_unit()?;
    let mut cumulative = 0.0;
    for (item, weight) in choices {
        cumulative += weight;
        if draw <= cumulative {
            return Ok(*item);
        }
    }
    Ok(choices[N - 1].0)
}
