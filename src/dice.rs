//! Random source for dice rolls
//!
//! A single [`Dice`] is shared by every request task. The generator sits
//! behind a mutex so concurrent rolls never race on its state.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lowest face of the die
pub const MIN_FACE: u32 = 1;

/// Highest face of the die
pub const MAX_FACE: u32 = 6;

/// Six-sided die backed by a seeded generator.
#[derive(Debug)]
pub struct Dice {
    rng: Mutex<StdRng>,
}

impl Dice {
    /// Create a die seeded from the wall clock, at one-second granularity.
    pub fn from_clock() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::seeded(secs)
    }

    /// Create a die with a fixed seed. Two dice with the same seed produce
    /// the same sequence of rolls.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Roll the die, returning a value uniformly distributed over 1..=6.
    pub fn roll(&self) -> u32 {
        self.rng.lock().random_range(MIN_FACE..=MAX_FACE)
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::from_clock()
    }
}
