//! Memoryless baseline guide.
//!
//! Every traversal is an independent random walk: uniform over `[0, n)` for
//! plain choices, proportional to the supplied weights for weighted ones.
//! There is no tree and no exhaustion, so this guide doubles as the
//! reference point the smarter strategies are measured against and as the
//! cheapest way to get used to the chooser API.

use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::guide::{fatal, weighted_index, Chooser, ContractViolation, Guide};

pub struct RandomGuide {
    rng: ChaCha8Rng,
}

impl RandomGuide {
    pub fn new(seed: u64) -> Self {
        RandomGuide {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the platform entropy source.
    pub fn from_entropy() -> Self {
        RandomGuide {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl Guide for RandomGuide {
    type Chooser<'a> = RandomChooser<'a>
    where
        Self: 'a;

    fn make_chooser(&mut self) -> Option<RandomChooser<'_>> {
        Some(RandomChooser {
            rng: &mut self.rng,
        })
    }
}

pub struct RandomChooser<'g> {
    rng: &'g mut ChaCha8Rng,
}

impl Chooser for RandomChooser<'_> {
    fn choose(&mut self, n: usize) -> usize {
        if n == 0 {
            fatal(ContractViolation::NoAlternatives);
        }
        self.rng.gen_range(0..n)
    }

    fn choose_weighted(&mut self, weights: &[u64]) -> usize {
        weighted_index(weights).sample(self.rng)
    }

    fn choose_unimportant(&mut self) -> i64 {
        self.rng.gen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_frequencies_converge_to_uniform() {
        let mut guide = RandomGuide::new(0x5eed);
        let mut chooser = guide.make_chooser().unwrap();
        let mut counts = [0u64; 4];
        let reps = 1_000_000;
        for _ in 0..reps {
            counts[chooser.choose(4)] += 1;
        }
        let expected = reps / 4;
        for (i, &count) in counts.iter().enumerate() {
            let error = (count as i64 - expected as i64).unsigned_abs();
            assert!(
                error < expected / 100,
                "outcome {i} drawn {count} times, expected ~{expected}"
            );
        }
    }

    #[test]
    fn weighted_frequencies_follow_the_weights() {
        let mut guide = RandomGuide::new(0x5eed);
        let mut chooser = guide.make_chooser().unwrap();
        let weights = [1u64, 2, 3, 4];
        let mut counts = [0u64; 4];
        let reps = 1_000_000u64;
        for _ in 0..reps {
            counts[chooser.choose_weighted(&weights)] += 1;
        }
        let total: u64 = weights.iter().sum();
        for (i, &count) in counts.iter().enumerate() {
            let expected = reps * weights[i] / total;
            let error = (count as i64 - expected as i64).unsigned_abs();
            assert!(
                error < reps / 50,
                "outcome {i} drawn {count} times, expected ~{expected}"
            );
        }
    }

    #[test]
    fn single_alternative_is_forced() {
        let mut guide = RandomGuide::new(9);
        let mut chooser = guide.make_chooser().unwrap();
        for _ in 0..32 {
            assert_eq!(chooser.choose(1), 0);
        }
    }

    #[test]
    fn unimportant_covers_both_signs() {
        let mut guide = RandomGuide::new(11);
        let mut chooser = guide.make_chooser().unwrap();
        let draws: Vec<i64> = (0..64).map(|_| chooser.choose_unimportant()).collect();
        assert!(draws.iter().any(|&v| v < 0));
        assert!(draws.iter().any(|&v| v > 0));
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let mut a = RandomGuide::new(1234);
        let mut b = RandomGuide::new(1234);
        let mut ca = a.make_chooser().unwrap();
        let mut cb = b.make_chooser().unwrap();
        for _ in 0..1000 {
            assert_eq!(ca.choose(17), cb.choose(17));
            assert_eq!(ca.choose_unimportant(), cb.choose_unimportant());
        }
    }

    #[test]
    #[should_panic(expected = "at least one alternative")]
    fn zero_alternatives_is_fatal() {
        let mut guide = RandomGuide::new(0);
        let mut chooser = guide.make_chooser().unwrap();
        chooser.choose(0);
    }
}
