//! # Random Sources
//!
//! Every random decision in the translation pipeline (classification draws,
//! variant choice, confidence, simulated latency) goes through a
//! [`RandomSource`] handed in at construction time. Production uses the
//! thread-local generator; tests pin the sequence with a seed or a script.

use rand::Rng;
#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;

/// Strategy object producing uniform values in `[0, 1)`.
///
/// ## Thread Safety:
/// Implementations are shared behind `Arc` across concurrent requests, so
/// they must be `Send + Sync` and take `&self`.
pub trait RandomSource: Send + Sync {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&self, len: usize) -> usize {
        let index = (self.next_unit() * len as f64) as usize;
        index.min(len.saturating_sub(1))
    }

    /// Uniform integer in `low..=high`.
    fn range_inclusive(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let span = high - low + 1;
        let offset = (self.next_unit() * span as f64) as u64;
        low + offset.min(span - 1)
    }
}

/// Thread-local RNG, used by the running server.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible source seeded with a fixed value.
#[cfg(test)]
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

#[cfg(test)]
impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[cfg(test)]
impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen::<f64>(),
            // A poisoned lock still holds a usable generator.
            Err(poisoned) => poisoned.into_inner().gen::<f64>(),
        }
    }
}

/// Replays a fixed list of values, cycling once exhausted.
///
/// ## Usage:
/// Lets tests steer the heuristic into an exact branch, e.g.
/// `ScriptedRandom::new(vec![0.5, 0.25])` skips the human prior and lands in
/// the cat frequency band.
#[cfg(test)]
#[derive(Debug)]
pub struct ScriptedRandom {
    script: Vec<f64>,
    cursor: Mutex<VecDeque<f64>>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        let script: Vec<f64> = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self {
            cursor: Mutex::new(script.iter().copied().collect()),
            script,
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_unit(&self) -> f64 {
        let mut cursor = match self.cursor.lock() {
            Ok(cursor) => cursor,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cursor.is_empty() {
            cursor.extend(self.script.iter().copied());
        }
        cursor.pop_front().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sources_agree() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_values_stay_in_unit_interval() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            let v = source.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_scripted_source_cycles() {
        let source = ScriptedRandom::new(vec![0.1, 0.9]);
        assert_eq!(source.next_unit(), 0.1);
        assert_eq!(source.next_unit(), 0.9);
        assert_eq!(source.next_unit(), 0.1);
    }

    #[test]
    fn test_range_inclusive_hits_both_ends() {
        let low = ScriptedRandom::new(vec![0.0]);
        assert_eq!(low.range_inclusive(82, 99), 82);

        let high = ScriptedRandom::new(vec![0.9999]);
        assert_eq!(high.range_inclusive(82, 99), 99);
    }

    #[test]
    fn test_pick_index_never_overflows() {
        let source = ScriptedRandom::new(vec![1.0]);
        assert_eq!(source.pick_index(4), 3);
    }
}
