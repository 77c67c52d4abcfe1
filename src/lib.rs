//! Decision-tree guidance for randomized test-case generators.
//!
//! A generator building a test input (a program, a document, a data
//! structure) repeatedly asks "given `n` alternatives, which one should I
//! take?". Each strategy here answers those queries through the
//! [`Chooser`] trait while bookkeeping the tree of decisions the generator
//! implies, so that repeated traversals explore the generator's behavior
//! space effectively.
//!
//! ## Guides
//!
//! - [`RandomGuide`]: memoryless uniform/weighted sampling; the baseline.
//! - [`BfsGuide`]: exhaustive breadth-first exploration of the decision
//!   tree, random beyond the frontier, reporting exhaustion once every
//!   branch has been walked.
//! - [`WeightedSamplerGuide`]: adaptive sampling that reweights branches
//!   by estimated subtree size to approximate uniform-over-leaves
//!   sampling; meant for open-ended generation.
//!
//! Construct a guide with a seed, pull one chooser per traversal, and drop
//! the chooser to commit its bookkeeping:
//!
//! ```
//! use tree_guide::{BfsGuide, Chooser};
//!
//! let mut guide = BfsGuide::new(1);
//! let mut paths = Vec::new();
//! while let Some(mut chooser) = guide.make_chooser() {
//!     let first = chooser.choose(2);
//!     let second = if first == 0 { chooser.choose(3) } else { 0 };
//!     paths.push((first, second));
//! }
//! // Exactly one traversal per distinct decision path.
//! assert_eq!(paths.len(), 4);
//! ```
//!
//! Guides are single-threaded; the chooser mutably borrows its guide, so
//! the one-live-chooser rule is enforced by the compiler. Given a fixed
//! seed and a fixed client query sequence, runs reproduce exactly.

pub mod bfs;
mod frontier;
pub mod guide;
pub mod random;
pub mod sampler;

pub use bfs::{BfsChooser, BfsGuide};
pub use guide::{Chooser, ContractViolation, Guide};
pub use random::{RandomChooser, RandomGuide};
pub use sampler::{MassRatioEstimator, SizeEstimator, WeightedSamplerChooser, WeightedSamplerGuide};
