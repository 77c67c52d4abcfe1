//! Size-estimating weighted sampler.
//!
//! Approximates sampling uniformly over the *leaves* of the still-growing
//! decision tree. Each node keeps a running estimate of its subtree's leaf
//! count; choices are first drawn from the node's base distribution (the
//! client's weights, or uniform), accepted outright when they land on a
//! branch never taken before, and otherwise redrawn with each branch
//! weighted by its estimated size. Estimates are refreshed bottom-up along
//! the traversal's trail when the chooser is dropped.
//!
//! Unlike breadth-first exploration this guide never signals exhaustion; it
//! is meant for open-ended generation.

use log::{debug, trace};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::guide::{fatal, Chooser, ContractViolation, Guide};

type NodeId = usize;

const ROOT: NodeId = 0;

/// Refines a node's subtree-size estimate at traversal commit.
///
/// `arity` is the node's child-slot count, `occupied` the base-distribution
/// probability mass covered by materialized children, and `total` the same
/// mass with each child's contribution scaled by its own size estimate.
pub trait SizeEstimator {
    fn estimate(&self, arity: usize, occupied: f64, total: f64) -> f64;
}

/// Default estimator: arity divided by the covered probability mass.
///
/// With one of `n` uniform children known this projects the subtree at
/// `n²` leaves, decaying toward `n` as the remaining children are
/// discovered, so sampling keeps leaning toward branches that still look
/// large.
#[derive(Debug, Clone, Copy, Default)]
pub struct MassRatioEstimator;

impl SizeEstimator for MassRatioEstimator {
    fn estimate(&self, arity: usize, occupied: f64, _total: f64) -> f64 {
        arity as f64 / occupied
    }
}

struct Node {
    visited: bool,
    children: Vec<Option<NodeId>>,
    // Normalized client weights; `None` means implicit uniform.
    base: Option<Vec<f64>>,
    size_estimate: f64,
}

impl Node {
    fn fresh() -> Self {
        Node {
            visited: false,
            children: Vec::new(),
            base: None,
            size_estimate: 1.0,
        }
    }

    fn base_weight(&self, slot: usize) -> f64 {
        match &self.base {
            Some(weights) => weights[slot],
            None => 1.0 / self.children.len() as f64,
        }
    }
}

pub struct WeightedSamplerGuide<E: SizeEstimator = MassRatioEstimator> {
    nodes: Vec<Node>,
    estimator: E,
    rng: ChaCha8Rng,
}

impl WeightedSamplerGuide {
    pub fn new(seed: u64) -> Self {
        WeightedSamplerGuide::with_estimator(seed, MassRatioEstimator)
    }

    /// Seed from the platform entropy source.
    pub fn from_entropy() -> Self {
        WeightedSamplerGuide {
            nodes: vec![Node::fresh()],
            estimator: MassRatioEstimator,
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl<E: SizeEstimator> WeightedSamplerGuide<E> {
    /// Build a guide around a custom size estimator.
    pub fn with_estimator(seed: u64, estimator: E) -> Self {
        WeightedSamplerGuide {
            nodes: vec![Node::fresh()],
            estimator,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Decision-tree nodes materialized so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<E: SizeEstimator> Guide for WeightedSamplerGuide<E> {
    type Chooser<'a> = WeightedSamplerChooser<'a, E>
    where
        Self: 'a;

    fn make_chooser(&mut self) -> Option<WeightedSamplerChooser<'_, E>> {
        Some(WeightedSamplerChooser {
            guide: self,
            trail: vec![ROOT],
        })
    }
}

pub struct WeightedSamplerChooser<'g, E: SizeEstimator> {
    guide: &'g mut WeightedSamplerGuide<E>,
    // Nodes visited this traversal, leaf-most at the back.
    trail: Vec<NodeId>,
}

impl<E: SizeEstimator> WeightedSamplerChooser<'_, E> {
    fn choose_internal(&mut self, n: usize, weights: Option<&[u64]>) -> usize {
        if n == 0 {
            fatal(ContractViolation::NoAlternatives);
        }
        let current = *self.trail.last().expect("trail always holds the entry node");
        self.visit(current, n, weights);

        let WeightedSamplerGuide { nodes, rng, .. } = &mut *self.guide;

        // Trial draw from the base distribution. Landing on a branch that
        // has never been taken keeps first visits honestly distributed.
        let trial = match &nodes[current].base {
            Some(base) => WeightedIndex::new(base)
                .expect("normalized base weights have positive total")
                .sample(rng),
            None => rng.gen_range(0..n),
        };

        let choice = if nodes[current].children[trial].is_none() {
            trial
        } else {
            // Already-seen branch: redraw with every materialized branch
            // scaled by its estimated subtree size. Unvisited branches get
            // zero here; they had their chance at the trial draw and will
            // get it again on later traversals.
            let node = &nodes[current];
            let reweighted: Vec<f64> = node
                .children
                .iter()
                .enumerate()
                .map(|(slot, child)| match child {
                    Some(c) => node.base_weight(slot) * nodes[*c].size_estimate,
                    None => 0.0,
                })
                .collect();
            WeightedIndex::new(&reweighted)
                .expect("materialized branches keep positive mass")
                .sample(rng)
        };

        let next = match nodes[current].children[choice] {
            Some(id) => id,
            None => {
                let id = nodes.len();
                nodes.push(Node::fresh());
                nodes[current].children[choice] = Some(id);
                trace!("materialized branch {choice} of node {current} as node {id}");
                id
            }
        };
        self.trail.push(next);
        choice
    }

    /// First-arrival initialization, arity check on later arrivals.
    fn visit(&mut self, id: NodeId, n: usize, weights: Option<&[u64]>) {
        let node = &mut self.guide.nodes[id];
        if node.visited {
            if node.children.len() != n {
                fatal(ContractViolation::ArityChanged {
                    expected: node.children.len(),
                    got: n,
                });
            }
            return;
        }
        node.visited = true;
        node.children = vec![None; n];
        // Upper bound until any child reports back.
        node.size_estimate = n as f64;
        if let Some(weights) = weights {
            let total: u64 = weights.iter().sum();
            if total == 0 {
                fatal(ContractViolation::DegenerateWeights);
            }
            node.base = Some(
                weights
                    .iter()
                    .map(|&w| w as f64 / total as f64)
                    .collect(),
            );
        }
    }
}

impl<E: SizeEstimator> Chooser for WeightedSamplerChooser<'_, E> {
    fn choose(&mut self, n: usize) -> usize {
        self.choose_internal(n, None)
    }

    fn choose_weighted(&mut self, weights: &[u64]) -> usize {
        self.choose_internal(weights.len(), Some(weights))
    }

    fn choose_unimportant(&mut self) -> i64 {
        self.guide.rng.gen()
    }
}

impl<E: SizeEstimator> Drop for WeightedSamplerChooser<'_, E> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        // The traversal ended here, so as far as this pass can tell the
        // node is a single leaf.
        let leaf = self.trail.pop().expect("trail always holds the entry node");
        self.guide.nodes[leaf].size_estimate = 1.0;

        // Fold refreshed child estimates upward along the trail.
        while let Some(id) = self.trail.pop() {
            let node = &self.guide.nodes[id];
            let mut occupied = 0.0;
            let mut total = 0.0;
            for (slot, child) in node.children.iter().enumerate() {
                if let Some(c) = *child {
                    let weight = node.base_weight(slot);
                    occupied += weight;
                    total += weight * self.guide.nodes[c].size_estimate;
                }
            }
            let arity = node.children.len();
            let estimate = self.guide.estimator.estimate(arity, occupied, total);
            self.guide.nodes[id].size_estimate = estimate;
        }
        debug!("traversal committed: {} nodes", self.guide.node_count());
    }
}
