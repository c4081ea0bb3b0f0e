//! Explicit game tree expanded from a [`GameDescriptor`].
//!
//! Nodes live in one arena in pre-order: the root has index 0, and every
//! node's index is smaller than the indices of its descendants. All
//! per-node numeric state (strategies, reach probabilities, utilities) is a
//! plain `Vec<f64>` indexed by that order, so a root-to-leaf pass is a
//! forward loop and a leaf-to-root pass is a reverse loop.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::cfr::descriptor::{
    Action, GameDescriptor, History, InfoSet, NodeDescriptor, Player, ROOT,
};
use crate::cfr::error::{BuildError, EvalError};

/// One node-indexed vector per player.
///
/// Depending on context the vectors hold behavioral strategies (probability
/// of the action leading to each node, given its parent was reached) or
/// reach probabilities.
pub type Profile = BTreeMap<Player, Vec<f64>>;

/// A node of the expanded tree.
#[derive(Debug, Clone)]
pub struct GameNode {
    /// Dense pre-order index.
    pub index: usize,
    /// Descriptor entry of this history.
    pub descriptor: NodeDescriptor,
    /// Parent index; `None` only at the root.
    pub parent: Option<usize>,
    /// Action that led here from the parent.
    pub last_action: Option<Action>,
    /// Children keyed by action, in the descriptor's action order.
    pub children: Vec<(Action, usize)>,
}

impl GameNode {
    /// Key of this node.
    pub fn history(&self) -> &str {
        self.descriptor.history()
    }

    /// Child indices in action order.
    pub fn child_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.children.iter().map(|(_, c)| *c)
    }

    /// Child reached by `action`.
    pub fn child(&self, action: &str) -> Option<usize> {
        self.children
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, c)| *c)
    }

    /// Whether this is a terminal node.
    pub fn is_terminal(&self) -> bool {
        matches!(self.descriptor, NodeDescriptor::Terminal { .. })
    }
}

/// The fully expanded game tree.
///
/// Immutable after construction; share it behind an `Arc` between solvers.
#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<GameNode>,
    players: BTreeSet<Player>,
    info_sets: Vec<InfoSet>,
    info_set_of: FxHashMap<History, usize>,
    index_of: FxHashMap<History, usize>,
    chance_behavioral: Vec<f64>,
    chance_reach: Vec<f64>,
}

impl GameTree {
    /// Expand `descriptor` from the root.
    ///
    /// # Errors
    /// Fails if the root is missing, no players are declared, an action leads
    /// to an absent history, or an info set lists a history that is absent,
    /// is not a decision node, or is already claimed by another info set.
    pub fn new(descriptor: &GameDescriptor) -> Result<Self, BuildError> {
        if descriptor.players.is_empty() {
            return Err(BuildError::NoPlayers);
        }
        let root = descriptor.node(ROOT).ok_or(BuildError::MissingRoot)?;

        let mut info_set_of = FxHashMap::default();
        for (idx, info_set) in descriptor.info_sets.iter().enumerate() {
            for history in &info_set.nodes {
                match descriptor.node(history) {
                    None => {
                        return Err(BuildError::UnknownMember {
                            info_set: info_set.name.clone(),
                            history: history.clone(),
                        })
                    }
                    Some(NodeDescriptor::Decision { .. }) => {}
                    Some(_) => {
                        return Err(BuildError::NotDecision {
                            info_set: info_set.name.clone(),
                            history: history.clone(),
                        })
                    }
                }
                if info_set_of.insert(history.clone(), idx).is_some() {
                    return Err(BuildError::DuplicateMember { history: history.clone() });
                }
            }
        }

        // Pre-order expansion with an explicit stack. Children are pushed in
        // reverse so they pop, and get indexed, in action order.
        let mut nodes: Vec<GameNode> = Vec::new();
        let mut stack: Vec<(&NodeDescriptor, Option<(usize, Action)>)> = vec![(root, None)];
        while let Some((desc, link)) = stack.pop() {
            let index = nodes.len();
            let (parent, last_action) = match link {
                Some((parent, action)) => {
                    nodes[parent].children.push((action.clone(), index));
                    (Some(parent), Some(action))
                }
                None => (None, None),
            };

            let actions = desc.actions();
            let mut pending = Vec::with_capacity(actions.len());
            for action in actions {
                let child = desc.child_history(action).unwrap_or_default();
                let child_desc = descriptor.node(&child).ok_or_else(|| BuildError::MissingChild {
                    parent: desc.history().to_string(),
                    action: action.to_string(),
                    child: child.clone(),
                })?;
                pending.push((child_desc, Some((index, action.to_string()))));
            }
            stack.extend(pending.into_iter().rev());

            nodes.push(GameNode {
                index,
                descriptor: desc.clone(),
                parent,
                last_action,
                children: Vec::new(),
            });
        }

        let index_of = nodes
            .iter()
            .map(|n| (n.history().to_string(), n.index))
            .collect();

        let mut tree = Self {
            nodes,
            players: descriptor.players.clone(),
            info_sets: descriptor.info_sets.clone(),
            info_set_of,
            index_of,
            chance_behavioral: Vec::new(),
            chance_reach: Vec::new(),
        };
        tree.chance_behavioral = tree.compute_chance_behavioral();
        tree.chance_reach = tree.behavioral_to_reach_probability(&tree.chance_behavioral);

        log::debug!(
            "expanded game tree: {} nodes, {} info sets, {} players",
            tree.nodes.len(),
            tree.info_sets.len(),
            tree.players.len()
        );
        Ok(tree)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[GameNode] {
        &self.nodes
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> &GameNode {
        &self.nodes[index]
    }

    /// The root node.
    pub fn root(&self) -> &GameNode {
        &self.nodes[0]
    }

    /// Index of the node with the given history.
    pub fn index_of(&self, history: &str) -> Option<usize> {
        self.index_of.get(history).copied()
    }

    /// Players of the game.
    pub fn players(&self) -> &BTreeSet<Player> {
        &self.players
    }

    /// Info sets in declaration order.
    pub fn info_sets(&self) -> &[InfoSet] {
        &self.info_sets
    }

    /// Position of the info set containing `history` in [`GameTree::info_sets`].
    pub fn info_set_of(&self, history: &str) -> Option<usize> {
        self.info_set_of.get(history).copied()
    }

    /// Terminal payoff of `player` at terminal nodes, zero elsewhere.
    pub fn utilities(&self, player: &str) -> Vec<f64> {
        self.nodes.iter().map(|n| n.descriptor.payoff(player)).collect()
    }

    /// Chance probability at children of chance nodes, 1 elsewhere.
    pub fn chance_strategy_behavioral(&self) -> &[f64] {
        &self.chance_behavioral
    }

    /// Reach probability contributed by chance alone.
    pub fn chance_reach_probability(&self) -> &[f64] {
        &self.chance_reach
    }

    fn compute_chance_behavioral(&self) -> Vec<f64> {
        let mut strategy = vec![1.0; self.nodes.len()];
        for node in &self.nodes {
            if let NodeDescriptor::Chance { outcomes, .. } = &node.descriptor {
                for ((_, p), child) in outcomes.iter().zip(node.child_indices()) {
                    strategy[child] = *p;
                }
            }
        }
        strategy
    }

    /// Uniform behavioral strategy for `player`: `1/|siblings|` below that
    /// player's decision nodes, 1 elsewhere.
    pub fn player_uniform_strategy_behavioral(&self, player: &str) -> Vec<f64> {
        let mut strategy = vec![1.0; self.nodes.len()];
        for node in &self.nodes {
            if node.descriptor.is_decision_of(player) {
                let p = 1.0 / node.children.len() as f64;
                for child in node.child_indices() {
                    strategy[child] = p;
                }
            }
        }
        strategy
    }

    /// Convert a behavioral strategy into reach probabilities.
    ///
    /// # Panics
    /// Panics if `behavioral` is not node-indexed.
    pub fn behavioral_to_reach_probability(&self, behavioral: &[f64]) -> Vec<f64> {
        assert_eq!(behavioral.len(), self.nodes.len(), "behavioral strategy is not node-indexed");
        let mut reach = vec![1.0; self.nodes.len()];
        for node in self.nodes.iter().skip(1) {
            if let Some(parent) = node.parent {
                reach[node.index] = behavioral[node.index] * reach[parent];
            }
        }
        reach
    }

    /// Expected utility of `player` when every player follows the given
    /// behavioral strategy.
    ///
    /// # Errors
    /// Requires exactly one node-indexed vector per player.
    pub fn eval_utility(&self, strategies: &Profile, player: &str) -> Result<f64, EvalError> {
        self.check_profile(strategies, self.players.iter())?;
        let mut value = vec![0.0; self.nodes.len()];
        for node in self.nodes.iter().rev() {
            value[node.index] = match &node.descriptor {
                NodeDescriptor::Terminal { .. } => node.descriptor.payoff(player),
                NodeDescriptor::Decision { player: actor, .. } => {
                    let strategy = &strategies[actor];
                    node.child_indices().map(|c| strategy[c] * value[c]).sum()
                }
                NodeDescriptor::Chance { outcomes, .. } => outcomes
                    .iter()
                    .zip(node.child_indices())
                    .map(|((_, p), c)| p * value[c])
                    .sum(),
            };
        }
        Ok(value[0])
    }

    /// Expected utility of `player` computed from reach probabilities.
    ///
    /// Multiplies every player's reach, the chance reach and the terminal
    /// utilities elementwise and sums the result.
    ///
    /// # Errors
    /// Requires exactly one node-indexed vector per player.
    pub fn eval_utility_by_reach_probability(
        &self,
        reaches: &Profile,
        player: &str,
    ) -> Result<f64, EvalError> {
        self.check_profile(reaches, self.players.iter())?;
        let mut flow = self.chance_reach.clone();
        for reach in reaches.values() {
            for (f, r) in flow.iter_mut().zip(reach) {
                *f *= r;
            }
        }
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.is_terminal())
            .map(|n| n.descriptor.payoff(player) * flow[n.index])
            .sum())
    }

    /// Check that `profile` has node-indexed vectors for exactly `expected`.
    pub(crate) fn check_profile<'a, I>(
        &self,
        profile: &Profile,
        expected: I,
    ) -> Result<(), EvalError>
    where
        I: Iterator<Item = &'a Player>,
    {
        let expected: Vec<String> = expected.cloned().collect();
        let actual: Vec<String> = profile.keys().cloned().collect();
        if expected != actual {
            return Err(EvalError::PlayerMismatch { expected, actual });
        }
        for vector in profile.values() {
            if vector.len() != self.nodes.len() {
                return Err(EvalError::LengthMismatch {
                    expected: self.nodes.len(),
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }
}
