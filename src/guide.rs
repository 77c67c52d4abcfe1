//! The chooser and guide capabilities shared by every strategy.
//!
//! A *guide* owns whatever long-lived state its strategy needs (PRNG,
//! decision tree, pending queue) and hands out one *chooser* per traversal.
//! The chooser answers the generator's "which of these `n` alternatives?"
//! queries and, when dropped, commits the traversal's bookkeeping back into
//! the guide.
//!
//! The chooser holds a mutable borrow of its guide for its whole lifetime,
//! so "at most one chooser alive per guide" and "no guide mutation while a
//! chooser is live" are enforced at compile time rather than with runtime
//! flags.

use rand::distributions::{WeightedError, WeightedIndex};
use thiserror::Error;

/// Per-traversal query interface used by a generator.
///
/// All methods return a valid answer or abort the process: a generator that
/// violates the contract (see [`ContractViolation`]) is buggy, and there is
/// no sensible way to continue producing a test case on its behalf.
pub trait Chooser {
    /// Return a choice in `[0, n)`. Requires `n >= 1`.
    ///
    /// Through a tree-building guide, the same call site must present the
    /// same `n` every time it is reached along the same path.
    fn choose(&mut self, n: usize) -> usize;

    /// Shorthand for a two-way choice.
    fn flip(&mut self) -> bool {
        self.choose(2) == 1
    }

    /// Return an index into `weights` with probability proportional to
    /// `weights[i]`, or per the guide's sampling policy. The list must be
    /// non-empty with a positive total.
    fn choose_weighted(&mut self, weights: &[u64]) -> usize;

    /// Return a pseudo-random value over the full `i64` range.
    ///
    /// This call is guaranteed never to branch the guide's decision tree,
    /// whichever guide is in use. Generators rely on it for values that
    /// must not explode the decision space, such as wide literal constants
    /// or identifier hashes, so the value returned must not influence the
    /// generator's subsequent decision structure.
    fn choose_unimportant(&mut self) -> i64;
}

/// A strategy that schedules traversals by handing out choosers.
pub trait Guide {
    /// The chooser type, borrowing the guide for the traversal's duration.
    type Chooser<'a>: Chooser
    where
        Self: 'a;

    /// Start a traversal. `None` signals that the strategy has exhausted
    /// the decision tree; guides that never exhaust always return `Some`.
    fn make_chooser(&mut self) -> Option<Self::Chooser<'_>>;
}

/// Ways a generator can break the chooser contract.
///
/// All of these are fatal: the library logs the violation and panics, since
/// each one means the generator itself is buggy and any output produced
/// past that point would be meaningless.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// `choose(0)`, or a weighted choice over an empty list.
    #[error("choose requires at least one alternative")]
    NoAlternatives,
    /// A previously-seen decision point was revisited with a different
    /// number of alternatives.
    #[error("revisited a decision point with {got} alternatives, previously {expected}")]
    ArityChanged { expected: usize, got: usize },
    /// Weights that admit no choice at all (zero total or overflow).
    #[error("weighted choice requires weights with a positive total")]
    DegenerateWeights,
}

/// Report a contract violation and abort the traversal.
pub(crate) fn fatal(violation: ContractViolation) -> ! {
    log::error!("generator contract violation: {violation}");
    panic!("generator contract violation: {violation}");
}

/// Build the discrete distribution defined by client-supplied weights,
/// treating invalid weight lists as contract violations.
pub(crate) fn weighted_index(weights: &[u64]) -> WeightedIndex<u64> {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist,
        Err(WeightedError::NoItem) => fatal(ContractViolation::NoAlternatives),
        Err(_) => fatal(ContractViolation::DegenerateWeights),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chooser that replays a fixed script, for exercising trait defaults.
    struct Scripted(Vec<usize>);

    impl Chooser for Scripted {
        fn choose(&mut self, n: usize) -> usize {
            let c = self.0.remove(0);
            assert!(c < n);
            c
        }

        fn choose_weighted(&mut self, weights: &[u64]) -> usize {
            self.choose(weights.len())
        }

        fn choose_unimportant(&mut self) -> i64 {
            0
        }
    }

    #[test]
    fn flip_maps_binary_choice_to_bool() {
        let mut chooser = Scripted(vec![0, 1]);
        assert!(!chooser.flip());
        assert!(chooser.flip());
    }

    #[test]
    fn weighted_index_accepts_sparse_weights() {
        let dist = weighted_index(&[0, 3, 0, 1]);
        // Zero-weight slots stay selectable structurally, just never drawn.
        use rand::distributions::Distribution;
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let i = dist.sample(&mut rng);
            assert!(i == 1 || i == 3);
        }
    }

    #[test]
    #[should_panic(expected = "at least one alternative")]
    fn weighted_index_rejects_empty_weights() {
        weighted_index(&[]);
    }

    #[test]
    #[should_panic(expected = "positive total")]
    fn weighted_index_rejects_zero_total() {
        weighted_index(&[0, 0, 0]);
    }
}
