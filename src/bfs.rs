//! Exhaustive breadth-first exploration of the decision tree.
//!
//! The guide grows a tree with one node per `choose` call site reached
//! along some traversal prefix. Nodes that still have unexplored branches
//! sit on a pending queue keyed by their depth; each new traversal pops the
//! shallowest such node, replays the decisions leading back to it, takes
//! one of its unexplored branches, and continues randomly from there. Once
//! the queue runs dry the whole tree has been walked and
//! [`BfsGuide::make_chooser`] reports exhaustion.
//!
//! Tree storage is an arena of nodes addressed by index: child slots hold
//! `Option<NodeId>` with `None` as the unexplored sentinel, and parent
//! links are plain indices, so recovering the path from a pending node back
//! to the root never fights the borrow checker and teardown is a single
//! `Vec` drop.

use log::{debug, trace};
use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::frontier::Frontier;
use crate::guide::{fatal, weighted_index, Chooser, ContractViolation, Guide};

type NodeId = usize;

/// The synthetic root. Its single child slot is the entry point shared by
/// every traversal.
const ROOT: NodeId = 0;

struct Node {
    parent: NodeId,
    children: Vec<Option<NodeId>>,
}

pub struct BfsGuide {
    nodes: Vec<Node>,
    pending: Frontier<NodeId>,
    max_explored_level: Option<usize>,
    started: bool,
    rng: ChaCha8Rng,
}

impl BfsGuide {
    pub fn new(seed: u64) -> Self {
        BfsGuide::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Seed from the platform entropy source.
    pub fn from_entropy() -> Self {
        BfsGuide::with_rng(ChaCha8Rng::from_entropy())
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        BfsGuide {
            nodes: vec![Node {
                parent: ROOT,
                children: vec![None],
            }],
            pending: Frontier::new(),
            max_explored_level: None,
            started: false,
            rng,
        }
    }

    /// Decision-tree nodes allocated so far; the synthetic root is not
    /// counted. Monotonically non-decreasing across traversals.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Deepest level the pending queue has handed back so far. Every
    /// decision prefix shorter than this has been fully explored.
    pub fn max_explored_level(&self) -> Option<usize> {
        self.max_explored_level
    }

    /// Start the next traversal, or return `None` once every branch of the
    /// decision tree has been walked.
    ///
    /// The first traversal runs entirely in random mode to bootstrap the
    /// tree. After that, each call pops the shallowest pending node,
    /// schedules one of its unexplored branches, and replays the path down
    /// to it; pop order (level, then FIFO within a level) is deterministic,
    /// so a recorded seed reproduces the whole run.
    pub fn make_chooser(&mut self) -> Option<BfsChooser<'_>> {
        if !self.started {
            self.started = true;
            debug!("bootstrap traversal (tree is empty)");
            return Some(BfsChooser::new(self, Vec::new()));
        }

        let (target, level) = self.pending.pop()?;
        debug_assert!(
            self.max_explored_level.map_or(true, |max| level >= max),
            "pending queue emitted a level below an earlier one"
        );
        if self.max_explored_level.map_or(true, |max| level > max) {
            debug!("fully explored up to level {level}");
        }
        self.max_explored_level = Some(level);

        // One unexplored branch at the target, picked uniformly so sibling
        // order introduces no structural bias.
        let untaken: Vec<usize> = self.nodes[target]
            .children
            .iter()
            .enumerate()
            .filter_map(|(slot, child)| child.is_none().then_some(slot))
            .collect();
        debug_assert!(!untaken.is_empty(), "pending node has no unexplored slots");
        let branch = untaken[self.rng.gen_range(0..untaken.len())];
        if untaken.len() > 1 {
            // Siblings still unexplored: back onto the queue at the same
            // level so they keep their priority.
            self.pending.insert(target, level);
        }

        // Walk parent links up to the root, recording the slot taken at
        // each step. The result is kept deepest-first so replay can pop
        // from the back.
        let mut planned = Vec::with_capacity(level + 1);
        planned.push(branch);
        let mut child = target;
        let mut node = self.nodes[target].parent;
        while node != ROOT {
            let slot = self.nodes[node]
                .children
                .iter()
                .position(|c| *c == Some(child))
                .expect("node is not linked into its parent");
            planned.push(slot);
            child = node;
            node = self.nodes[node].parent;
        }

        trace!(
            "replaying {} choices to reach level {level}, branch {branch}",
            planned.len() - 1
        );
        Some(BfsChooser::new(self, planned))
    }

    fn alloc(&mut self, parent: NodeId, arity: usize) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: vec![None; arity],
        });
        id
    }
}

impl Guide for BfsGuide {
    type Chooser<'a> = BfsChooser<'a>
    where
        Self: 'a;

    fn make_chooser(&mut self) -> Option<BfsChooser<'_>> {
        BfsGuide::make_chooser(self)
    }
}

pub struct BfsChooser<'g> {
    guide: &'g mut BfsGuide,
    current: NodeId,
    last_choice: usize,
    level: usize,
    // Deepest-first so replay pops from the back.
    planned: Vec<usize>,
}

impl<'g> BfsChooser<'g> {
    fn new(guide: &'g mut BfsGuide, planned: Vec<usize>) -> Self {
        BfsChooser {
            guide,
            current: ROOT,
            last_choice: 0,
            level: 0,
            planned,
        }
    }

    fn choose_internal(
        &mut self,
        n: usize,
        sample: impl FnOnce(&mut ChaCha8Rng) -> usize,
    ) -> usize {
        if n == 0 {
            fatal(ContractViolation::NoAlternatives);
        }
        let choice = match self.guide.nodes[self.current].children[self.last_choice] {
            Some(next) => {
                // Replay window: this decision point already exists, so the
                // planned prefix dictates the branch.
                let arity = self.guide.nodes[next].children.len();
                if arity != n {
                    fatal(ContractViolation::ArityChanged {
                        expected: arity,
                        got: n,
                    });
                }
                let choice = self
                    .planned
                    .pop()
                    .expect("replay window extends past the planned prefix");
                trace!("level {}: replaying {choice} of {n}", self.level);
                self.current = next;
                choice
            }
            None => {
                // Off the explored tree: materialize the decision point and
                // branch randomly.
                debug_assert!(
                    self.planned.is_empty(),
                    "planned prefix runs into unexplored territory"
                );
                let next = self.guide.alloc(self.current, n);
                self.guide.nodes[self.current].children[self.last_choice] = Some(next);
                let choice = sample(&mut self.guide.rng);
                if n > 1 {
                    trace!(
                        "level {}: new node {next} with {n} branches, taking {choice}",
                        self.level
                    );
                    self.guide.pending.insert(next, self.level);
                }
                self.current = next;
                choice
            }
        };
        self.last_choice = choice;
        self.level += 1;
        choice
    }
}

impl Chooser for BfsChooser<'_> {
    fn choose(&mut self, n: usize) -> usize {
        self.choose_internal(n, |rng| rng.gen_range(0..n))
    }

    fn choose_weighted(&mut self, weights: &[u64]) -> usize {
        // Validate eagerly so bad weights are caught in replay mode too,
        // where the distribution itself goes unused.
        let dist = weighted_index(weights);
        self.choose_internal(weights.len(), move |rng| dist.sample(rng))
    }

    fn choose_unimportant(&mut self) -> i64 {
        self.guide.rng.gen()
    }
}

impl Drop for BfsChooser<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        debug_assert!(
            self.planned.is_empty(),
            "traversal ended before its planned prefix was replayed"
        );
        // Promote the slot the traversal ended on to an empty terminal
        // node, so siblings of finished paths keep the queue invariant: a
        // node is pending iff one of its slots is still None.
        if self.guide.nodes[self.current].children[self.last_choice].is_none() {
            let leaf = self.guide.alloc(self.current, 0);
            self.guide.nodes[self.current].children[self.last_choice] = Some(leaf);
        }
        debug!(
            "traversal committed: {} nodes, {} pending",
            self.guide.node_count(),
            self.guide.pending.len()
        );
    }
}
