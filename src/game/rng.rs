//! Randomness provider for the opponent and the coin

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of every random draw the engine makes.
///
/// The engine never touches a global RNG; callers inject one so that a seeded
/// or scripted sequence replays a match exactly.
pub trait MatchRng {
    /// Roll a fair six-sided die (1..=6)
    fn roll_die(&mut self) -> u8;

    /// Fair coin flip
    fn coin_flip(&mut self) -> bool;
}

/// ChaCha8-backed RNG seeded per session
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed drawn from the thread RNG
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl MatchRng for SeededRng {
    fn roll_die(&mut self) -> u8 {
        self.inner.gen_range(1..=6)
    }

    fn coin_flip(&mut self) -> bool {
        self.inner.gen_bool(0.5)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn die_rolls_stay_in_range() {
        let mut rng = SeededRng::new(7);
        for _ in 0..1_000 {
            let roll = rng.roll_die();
            assert!((1..=6).contains(&roll), "roll {roll} out of range");
        }
    }

    #[test]
    fn same_seed_replays_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        let rolls_a: Vec<u8> = (0..32).map(|_| a.roll_die()).collect();
        let rolls_b: Vec<u8> = (0..32).map(|_| b.roll_die()).collect();
        assert_eq!(rolls_a, rolls_b);
        assert_eq!(a.coin_flip(), b.coin_flip());
    }

    #[test]
    fn every_face_shows_up() {
        let mut rng = SeededRng::new(1);
        let mut seen = [false; 6];
        for _ in 0..600 {
            seen[(rng.roll_die() - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
