//! Sequence-form decision structure ("treeplex") of one player.
//!
//! The treeplex merges game nodes that the player cannot tell apart in any
//! respect that matters for the rest of the game, and collapses branching
//! that the player merely observes.
//!
//! # Construction
//!
//! 1. **Signatures** (leaf-to-root): every game node gets the set of the
//!    player's info sets reachable in its subtree. A decision node of the
//!    player has its own info set as a singleton signature.
//! 2. **Grouping** (root-to-leaf, on groups of game nodes):
//!    - a group made only of the player's decision nodes must be one info
//!      set and becomes a [`TreeplexNode::Decision`]; each action continues
//!      with the group of that action's children;
//!    - any other group becomes a [`TreeplexNode::Observation`]; the children
//!      of all members are partitioned by signature, parts whose signatures
//!      share an info set are joined, and each part continues as one child.
//! 3. **Indexing**: nodes are stored in pre-order, so the position in
//!    [`Treeplex::nodes`] is the dense index used by every treeplex vector.
//!
//! ```text
//!            Observation (deal)
//!           /        |         \
//!     Decision J  Decision Q  Decision K      <- one per info set
//!       c/  \r      ...
//!      Obs   Obs                              <- opponent replies merged
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cfr::config::{ConfigError, CONSISTENCY_TOLERANCE};
use crate::cfr::descriptor::{Action, Player};
use crate::cfr::error::{BuildError, EvalError};
use crate::cfr::trace::{emit, Trace, TraceSink};
use crate::cfr::tree::{GameTree, Profile};

/// A node of the treeplex.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeplexNode {
    /// One info set of the player.
    Decision {
        /// Game nodes of the info set.
        game_nodes: Vec<usize>,
        /// Position of the info set in [`GameTree::info_sets`].
        info_set: usize,
        /// Shared action set, in a fixed order.
        actions: Vec<Action>,
        /// Child treeplex node per action, aligned with `actions`.
        children: Vec<usize>,
    },
    /// Branching the player only observes.
    Observation {
        /// Game nodes merged into this point.
        game_nodes: Vec<usize>,
        /// Child treeplex nodes.
        children: Vec<usize>,
    },
}

impl TreeplexNode {
    /// Game nodes merged into this treeplex node.
    pub fn game_nodes(&self) -> &[usize] {
        match self {
            TreeplexNode::Decision { game_nodes, .. }
            | TreeplexNode::Observation { game_nodes, .. } => game_nodes,
        }
    }

    /// Child treeplex nodes.
    pub fn children(&self) -> &[usize] {
        match self {
            TreeplexNode::Decision { children, .. }
            | TreeplexNode::Observation { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> &mut Vec<usize> {
        match self {
            TreeplexNode::Decision { children, .. }
            | TreeplexNode::Observation { children, .. } => children,
        }
    }

    /// Whether this is a decision point.
    pub fn is_decision(&self) -> bool {
        matches!(self, TreeplexNode::Decision { .. })
    }
}

/// Which kind of vectors describe the opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Node-indexed behavioral strategies.
    Behavioral,
    /// Node-indexed reach probabilities.
    ReachProbability,
}

/// Result of [`Treeplex::best_response`].
#[derive(Debug, Clone, PartialEq)]
pub struct BestResponse {
    /// Pure best response as a behavioral strategy over game nodes.
    pub strategy: Vec<f64>,
    /// The same response over treeplex nodes (1 on chosen actions).
    pub treeplex_strategy: Vec<f64>,
    /// Chance- and opponent-weighted value of the response.
    pub value: f64,
}

/// The treeplex of one player over a shared game tree.
#[derive(Debug, Clone)]
pub struct Treeplex {
    tree: Arc<GameTree>,
    player: Player,
    others: Vec<Player>,
    nodes: Vec<TreeplexNode>,
    tolerance: f64,
}

impl Treeplex {
    /// Build the treeplex of `player`.
    ///
    /// # Errors
    /// Fails if a decision node of `player` belongs to no info set, a group
    /// of decision nodes mixes info sets or action sets, a decision node
    /// ends up grouped with nodes of another kind, or an info set is reached
    /// through more than one decision point.
    pub fn new(tree: Arc<GameTree>, player: &str) -> Result<Self, BuildError> {
        let is_decision = |index: usize| tree.node(index).descriptor.is_decision_of(player);

        // Step 1: info sets reachable below each node.
        let mut signature: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tree.len()];
        for node in tree.nodes().iter().rev() {
            if is_decision(node.index) {
                let info_set = tree.info_set_of(node.history()).ok_or_else(|| {
                    BuildError::Unassigned {
                        history: node.history().to_string(),
                    }
                })?;
                signature[node.index].insert(info_set);
            } else {
                let mut reachable = BTreeSet::new();
                for child in node.child_indices() {
                    reachable.extend(signature[child].iter().copied());
                }
                signature[node.index] = reachable;
            }
        }

        // Step 2 and 3: grouping with an explicit stack, indexed on pop so
        // the arena comes out in pre-order.
        let histories = |group: &[usize]| -> Vec<String> {
            group.iter().map(|&g| tree.node(g).history().to_string()).collect()
        };
        let mut nodes: Vec<TreeplexNode> = Vec::new();
        let mut stack: Vec<(Vec<usize>, Option<usize>)> = vec![(vec![0], None)];
        while let Some((group, parent)) = stack.pop() {
            let index = nodes.len();
            if let Some(parent) = parent {
                nodes[parent].children_mut().push(index);
            }

            if group.iter().all(|&g| is_decision(g)) {
                let first = tree.node(group[0]);
                let shared = &signature[first.index];
                if shared.len() != 1 || group.iter().any(|&g| signature[g] != *shared) {
                    return Err(BuildError::MixedInfoSets { histories: histories(&group) });
                }
                let info_set = *shared.iter().next().unwrap_or(&0);
                let actions: Vec<Action> =
                    first.descriptor.actions().iter().map(|a| a.to_string()).collect();
                let expected: BTreeSet<&str> = actions.iter().map(String::as_str).collect();
                for &g in &group {
                    let found: BTreeSet<&str> =
                        tree.node(g).descriptor.actions().into_iter().collect();
                    if found != expected {
                        return Err(BuildError::ActionsNotEqual {
                            info_set: tree.info_sets()[info_set].name.clone(),
                            history: tree.node(g).history().to_string(),
                        });
                    }
                }

                let mut pending = Vec::with_capacity(actions.len());
                for action in &actions {
                    let next: Vec<usize> =
                        group.iter().filter_map(|&g| tree.node(g).child(action)).collect();
                    pending.push((next, Some(index)));
                }
                stack.extend(pending.into_iter().rev());
                nodes.push(TreeplexNode::Decision {
                    game_nodes: group,
                    info_set,
                    actions,
                    children: Vec::new(),
                });
            } else {
                if group.iter().any(|&g| is_decision(g)) {
                    return Err(BuildError::MixedInfoSets { histories: histories(&group) });
                }
                // Partition by signature, parts in order of first appearance.
                let mut part_of: FxHashMap<&BTreeSet<usize>, usize> = FxHashMap::default();
                let mut parts: Vec<(&BTreeSet<usize>, Vec<usize>)> = Vec::new();
                for &g in &group {
                    for child in tree.node(g).child_indices() {
                        let part = *part_of.entry(&signature[child]).or_insert_with(|| {
                            parts.push((&signature[child], Vec::new()));
                            parts.len() - 1
                        });
                        parts[part].1.push(child);
                    }
                }
                let parts = merge_overlapping(parts);
                stack.extend(parts.into_iter().rev().map(|part| (part, Some(index))));
                nodes.push(TreeplexNode::Observation {
                    game_nodes: group,
                    children: Vec::new(),
                });
            }
        }

        let mut seen: FxHashMap<usize, usize> = FxHashMap::default();
        for (index, node) in nodes.iter().enumerate() {
            if let TreeplexNode::Decision { info_set, .. } = node {
                if seen.insert(*info_set, index).is_some() {
                    return Err(BuildError::SplitInfoSet {
                        info_set: tree.info_sets()[*info_set].name.clone(),
                    });
                }
            }
        }

        let others = tree.players().iter().filter(|p| *p != player).cloned().collect();
        log::debug!(
            "built treeplex for player {}: {} nodes, {} decision points",
            player,
            nodes.len(),
            seen.len()
        );
        Ok(Self {
            tree,
            player: player.to_string(),
            others,
            nodes,
            tolerance: CONSISTENCY_TOLERANCE,
        })
    }

    /// Builder method: set the best-response consistency tolerance.
    ///
    /// # Errors
    /// The tolerance must be finite and strictly positive.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self, BuildError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(tolerance).into());
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Tolerance of the consistency checks.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// The player this treeplex belongs to.
    pub fn player(&self) -> &str {
        &self.player
    }

    /// All other players of the game.
    pub fn others(&self) -> &[Player] {
        &self.others
    }

    /// The underlying game tree.
    pub fn tree(&self) -> &Arc<GameTree> {
        &self.tree
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[TreeplexNode] {
        &self.nodes
    }

    /// Number of treeplex nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a treeplex has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of the decision points.
    pub fn decision_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_decision())
            .map(|(i, _)| i)
    }

    /// Zero vector over treeplex nodes.
    pub fn empty_prop(&self) -> Vec<f64> {
        vec![0.0; self.nodes.len()]
    }

    /// Counterfactual utility of every treeplex node given the other
    /// players' reach probabilities.
    ///
    /// Each terminal contributes its payoff times chance and opponent reach;
    /// a treeplex node sums the contributions of its own game nodes.
    ///
    /// # Errors
    /// Requires vectors for exactly the other players.
    pub fn utility_for_reach_probability(&self, others: &Profile) -> Result<Vec<f64>, EvalError> {
        self.tree.check_profile(others, self.others.iter())?;
        let mut flow = self.tree.chance_reach_probability().to_vec();
        for reach in others.values() {
            for (f, r) in flow.iter_mut().zip(reach) {
                *f *= r;
            }
        }
        for (f, u) in flow.iter_mut().zip(self.tree.utilities(&self.player)) {
            *f *= u;
        }
        Ok(self
            .nodes
            .iter()
            .map(|n| n.game_nodes().iter().map(|&g| flow[g]).sum())
            .collect())
    }

    /// Same as [`Treeplex::utility_for_reach_probability`], from behavioral
    /// strategies.
    pub fn utility_for_strats(&self, others: &Profile) -> Result<Vec<f64>, EvalError> {
        self.tree.check_profile(others, self.others.iter())?;
        let reaches = self.to_reach(others);
        self.utility_for_reach_probability(&reaches)
    }

    fn to_reach(&self, strategies: &Profile) -> Profile {
        strategies
            .iter()
            .map(|(p, s)| (p.clone(), self.tree.behavioral_to_reach_probability(s)))
            .collect()
    }

    /// Map a strategy over treeplex nodes to a behavioral strategy over game
    /// nodes.
    ///
    /// Entries default to 1. Every game node of a decision point receives
    /// the same distribution, read from the decision point's children.
    ///
    /// # Errors
    /// `treeplex_strat` must have one entry per treeplex node.
    pub fn treeplex_strat_to_behavioral_game_strat(
        &self,
        treeplex_strat: &[f64],
    ) -> Result<Vec<f64>, EvalError> {
        if treeplex_strat.len() != self.nodes.len() {
            return Err(EvalError::LengthMismatch {
                expected: self.nodes.len(),
                actual: treeplex_strat.len(),
            });
        }
        Ok(self.to_behavioral(treeplex_strat))
    }

    /// Unchecked [`Treeplex::treeplex_strat_to_behavioral_game_strat`] for
    /// vectors built from this treeplex.
    pub(crate) fn to_behavioral(&self, treeplex_strat: &[f64]) -> Vec<f64> {
        let mut strategy = vec![1.0; self.tree.len()];
        for node in &self.nodes {
            if let TreeplexNode::Decision { game_nodes, actions, children, .. } = node {
                for &g in game_nodes {
                    let game_node = self.tree.node(g);
                    for (action, &child) in actions.iter().zip(children) {
                        if let Some(target) = game_node.child(action) {
                            strategy[target] = treeplex_strat[child];
                        }
                    }
                }
            }
        }
        strategy
    }

    /// Pure best response to the other players.
    ///
    /// One leaf-to-root pass: a decision point keeps its best child (the
    /// first one in action order on ties), an observation point sums its
    /// children. The resulting value is re-evaluated on the game tree with
    /// the same convention and must agree within the tolerance.
    ///
    /// # Errors
    /// Fails on a malformed profile, or with [`EvalError::Inconsistent`] if
    /// the two evaluations disagree.
    pub fn best_response(
        &self,
        others: &Profile,
        convention: Convention,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<BestResponse, EvalError> {
        let mut trace = trace;
        let mut value = match convention {
            Convention::Behavioral => self.utility_for_strats(others)?,
            Convention::ReachProbability => self.utility_for_reach_probability(others)?,
        };
        let mut response = self.empty_prop();

        for (index, node) in self.nodes.iter().enumerate().rev() {
            match node {
                TreeplexNode::Decision { children, .. } if !children.is_empty() => {
                    let mut best = children[0];
                    for &child in &children[1..] {
                        if value[child] > value[best] {
                            best = child;
                        }
                    }
                    for &child in children {
                        response[child] = if child == best { 1.0 } else { 0.0 };
                    }
                    value[index] += value[best];
                }
                TreeplexNode::Decision { .. } => {}
                TreeplexNode::Observation { children, .. } => {
                    let total: f64 = children.iter().map(|&c| value[c]).sum();
                    value[index] += total;
                }
            }
            emit(&mut trace, Trace::Treeplex { node: index, value: value[index] });
        }

        let strategy = self.to_behavioral(&response);
        let mut profile = others.clone();
        let check = match convention {
            Convention::Behavioral => {
                profile.insert(self.player.clone(), strategy.clone());
                self.tree.eval_utility(&profile, &self.player)?
            }
            Convention::ReachProbability => {
                profile.insert(
                    self.player.clone(),
                    self.tree.behavioral_to_reach_probability(&strategy),
                );
                self.tree.eval_utility_by_reach_probability(&profile, &self.player)?
            }
        };
        if (check - value[0]).abs() > self.tolerance {
            log::error!(
                "best response for player {}: treeplex value {} vs tree value {}",
                self.player,
                value[0],
                check
            );
            return Err(EvalError::Inconsistent { treeplex: value[0], tree: check });
        }

        Ok(BestResponse {
            strategy,
            treeplex_strategy: response,
            value: value[0],
        })
    }
}

/// Join parts whose signatures share an info set, transitively.
///
/// Parts with disjoint signatures are kept as they are. Merged parts keep
/// the position of their first member.
fn merge_overlapping(parts: Vec<(&BTreeSet<usize>, Vec<usize>)>) -> Vec<Vec<usize>> {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..parts.len()).collect();
    let mut owner: FxHashMap<usize, usize> = FxHashMap::default();
    for (i, (signature, _)) in parts.iter().enumerate() {
        for &info_set in signature.iter() {
            match owner.get(&info_set) {
                Some(&j) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    parent[a.max(b)] = a.min(b);
                }
                None => {
                    owner.insert(info_set, i);
                }
            }
        }
    }

    let mut merged: Vec<Vec<usize>> = vec![Vec::new(); parts.len()];
    for (i, (_, members)) in parts.into_iter().enumerate() {
        let root = find(&mut parent, i);
        merged[root].extend(members);
    }
    merged.retain(|m| !m.is_empty());
    merged
}

impl fmt::Display for Treeplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            let histories: Vec<&str> = node
                .game_nodes()
                .iter()
                .map(|&g| self.tree.node(g).history())
                .collect();
            match node {
                TreeplexNode::Decision { actions, children, info_set, .. } => {
                    writeln!(
                        f,
                        "{}: decision [{}]",
                        index,
                        self.tree.info_sets()[*info_set].name
                    )?;
                    for (action, child) in actions.iter().zip(children) {
                        writeln!(f, "  {} -> {}", action, child)?;
                    }
                }
                TreeplexNode::Observation { children, .. } => {
                    writeln!(f, "{}: observation", index)?;
                    for child in children {
                        writeln!(f, "  -> {}", child)?;
                    }
                }
            }
            writeln!(f, "  histories: {:?}", histories)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::descriptor::GameDescriptor;
    use crate::games::{kuhn, leduc, rps};

    fn build(game: &GameDescriptor, player: &str) -> Treeplex {
        let tree = Arc::new(GameTree::new(game).unwrap());
        Treeplex::new(tree, player).unwrap()
    }

    fn one_decision() -> GameDescriptor {
        let mut game = GameDescriptor::new();
        game.add_decision("/", "1", &["a", "b"])
            .add_terminal("/P1:a/", &[("1", 1.0), ("2", -1.0)])
            .add_terminal("/P1:b/", &[("1", -1.0), ("2", 1.0)])
            .add_info_set("root", &["/"]);
        game
    }

    fn uniform(tree: &GameTree, players: &[Player]) -> Profile {
        players
            .iter()
            .map(|p| (p.clone(), tree.player_uniform_strategy_behavioral(p)))
            .collect()
    }

    #[test]
    fn test_single_decision_best_response() {
        let treeplex = build(&one_decision(), "1");
        assert_eq!(treeplex.len(), 3);
        assert!(treeplex.nodes()[0].is_decision());

        let tree = treeplex.tree().clone();
        let others = uniform(&tree, treeplex.others());
        let response = treeplex.best_response(&others, Convention::Behavioral, None).unwrap();
        let a = tree.index_of("/P1:a/").unwrap();
        let b = tree.index_of("/P1:b/").unwrap();
        assert_eq!(response.strategy[a], 1.0);
        assert_eq!(response.strategy[b], 0.0);
        assert_eq!(response.value, 1.0);
    }

    #[test]
    fn test_ties_pick_first_action() {
        let mut game = GameDescriptor::new();
        game.add_decision("/", "1", &["x", "y"])
            .add_terminal("/P1:x/", &[("1", 0.5)])
            .add_terminal("/P1:y/", &[("1", 0.5)])
            .add_info_set("root", &["/"]);
        let treeplex = build(&game, "1");
        let response = treeplex
            .best_response(&Profile::new(), Convention::Behavioral, None)
            .unwrap();
        assert_eq!(response.treeplex_strategy, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_kuhn_structure() {
        let game = kuhn::descriptor();
        for player in ["1", "2"] {
            let treeplex = build(&game, player);
            assert_eq!(treeplex.len(), 25);
            assert_eq!(treeplex.decision_indices().count(), 6);
            assert!(!treeplex.nodes()[0].is_decision());
            assert_eq!(treeplex.nodes()[0].children().len(), 3);
        }
    }

    #[test]
    fn test_decision_points_reconstruct_info_sets() {
        for game in [kuhn::descriptor(), leduc::descriptor(), rps::descriptor()] {
            let tree = Arc::new(GameTree::new(&game).unwrap());
            for player in tree.players().clone() {
                let treeplex = Treeplex::new(tree.clone(), &player).unwrap();
                let mut covered = vec![0usize; tree.len()];
                for node in treeplex.nodes() {
                    if let TreeplexNode::Decision { game_nodes, info_set, .. } = node {
                        let mut members: Vec<&str> =
                            game_nodes.iter().map(|&g| tree.node(g).history()).collect();
                        let mut expected: Vec<&str> = tree.info_sets()[*info_set]
                            .nodes
                            .iter()
                            .map(String::as_str)
                            .collect();
                        members.sort();
                        expected.sort();
                        assert_eq!(members, expected);
                        for &g in game_nodes {
                            covered[g] += 1;
                        }
                    }
                }
                for node in tree.nodes() {
                    let expected = usize::from(node.descriptor.is_decision_of(&player));
                    assert_eq!(covered[node.index], expected, "{}", node.history());
                }
            }
        }
    }

    #[test]
    fn test_preorder_children_follow_parent() {
        let treeplex = build(&leduc::descriptor(), "2");
        for (index, node) in treeplex.nodes().iter().enumerate() {
            for &child in node.children() {
                assert!(child > index);
            }
        }
    }

    #[test]
    fn test_kuhn_best_response_values() {
        let game = kuhn::descriptor();
        let tree = Arc::new(GameTree::new(&game).unwrap());
        let p1 = Treeplex::new(tree.clone(), "1").unwrap();
        let p2 = Treeplex::new(tree.clone(), "2").unwrap();

        let vs_uniform_2 = uniform(&tree, p1.others());
        let br1 = p1.best_response(&vs_uniform_2, Convention::Behavioral, None).unwrap();
        assert!((br1.value - 0.5).abs() < 1e-9);

        let vs_uniform_1 = uniform(&tree, p2.others());
        let reaches: Profile = vs_uniform_1
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect();
        let br2 = p2.best_response(&reaches, Convention::ReachProbability, None).unwrap();
        assert!((br2.value - 5.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_response_is_consistent_across_conventions() {
        let tree = Arc::new(GameTree::new(&leduc::descriptor()).unwrap());
        let p1 = Treeplex::new(tree.clone(), "1").unwrap();
        let behavioral = uniform(&tree, p1.others());
        let reaches: Profile = behavioral
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect();
        let a = p1.best_response(&behavioral, Convention::Behavioral, None).unwrap();
        let b = p1.best_response(&reaches, Convention::ReachProbability, None).unwrap();
        assert!((a.value - b.value).abs() < 1e-9);
        assert_eq!(a.strategy, b.strategy);
    }

    #[test]
    fn test_best_response_traces_every_node() {
        let treeplex = build(&kuhn::descriptor(), "1");
        let others = uniform(treeplex.tree(), treeplex.others());
        let mut traces: Vec<Trace> = Vec::new();
        let response = treeplex
            .best_response(&others, Convention::Behavioral, Some(&mut traces))
            .unwrap();
        assert_eq!(traces.len(), treeplex.len());
        assert_eq!(traces.last(), Some(&Trace::Treeplex { node: 0, value: response.value }));
    }

    #[test]
    fn test_utility_requires_exactly_the_other_players() {
        let treeplex = build(&kuhn::descriptor(), "1");
        let tree = treeplex.tree().clone();
        let all = uniform(&tree, &["1".to_string(), "2".to_string()]);
        assert!(matches!(
            treeplex.utility_for_strats(&all),
            Err(EvalError::PlayerMismatch { .. })
        ));
        assert!(matches!(
            treeplex.utility_for_reach_probability(&Profile::new()),
            Err(EvalError::PlayerMismatch { .. })
        ));
    }

    #[test]
    fn test_treeplex_utility_sums_to_tree_value() {
        // with the player's own strategy at 1 everywhere, the treeplex
        // utilities add up to the opponent-weighted sum of payoffs
        let treeplex = build(&kuhn::descriptor(), "2");
        let tree = treeplex.tree().clone();
        let others = uniform(&tree, treeplex.others());
        let per_node = treeplex.utility_for_strats(&others).unwrap();
        let mut reaches: Profile = others
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect();
        reaches.insert("2".to_string(), vec![1.0; tree.len()]);
        let total = tree.eval_utility_by_reach_probability(&reaches, "2").unwrap();
        let sum: f64 = per_node.iter().sum();
        assert!((sum - total).abs() < 1e-9);
    }

    #[test]
    fn test_behavioral_mapping_shares_distribution_within_info_set() {
        let treeplex = build(&kuhn::descriptor(), "1");
        let tree = treeplex.tree().clone();
        let mut strat = treeplex.empty_prop();
        for (index, node) in treeplex.nodes().iter().enumerate() {
            if let TreeplexNode::Decision { children, .. } = node {
                strat[children[0]] = 0.25 + index as f64 / 100.0;
                strat[children[1]] = 0.75 - index as f64 / 100.0;
            }
        }
        let behavioral = treeplex.treeplex_strat_to_behavioral_game_strat(&strat).unwrap();
        for node in treeplex.nodes() {
            if let TreeplexNode::Decision { game_nodes, actions, .. } = node {
                let first: Vec<f64> = actions
                    .iter()
                    .map(|a| behavioral[tree.node(game_nodes[0]).child(a).unwrap()])
                    .collect();
                for &g in game_nodes {
                    let here: Vec<f64> = actions
                        .iter()
                        .map(|a| behavioral[tree.node(g).child(a).unwrap()])
                        .collect();
                    assert_eq!(here, first);
                }
            }
        }
        // opponent and chance edges untouched
        assert_eq!(behavioral[0], 1.0);
        assert_eq!(behavioral[tree.index_of("/C:JQ/").unwrap()], 1.0);
    }

    #[test]
    fn test_separate_info_sets_under_chance_build() {
        // two decision nodes of player 1 behind chance, declared as
        // different info sets: they land in separate observation parts
        let mut game = GameDescriptor::new();
        game.add_chance("/", &[("l", 0.5), ("r", 0.5)])
            .add_decision("/C:l/", "1", &["a"])
            .add_decision("/C:r/", "1", &["a"])
            .add_terminal("/C:l/P1:a/", &[("1", 1.0)])
            .add_terminal("/C:r/P1:a/", &[("1", 1.0)])
            .add_info_set("left", &["/C:l/"])
            .add_info_set("right", &["/C:r/"]);
        let treeplex = Treeplex::new(Arc::new(GameTree::new(&game).unwrap()), "1").unwrap();
        assert_eq!(treeplex.decision_indices().count(), 2);
    }

    #[test]
    fn test_unequal_actions_are_rejected() {
        let mut game = GameDescriptor::new();
        game.add_chance("/", &[("l", 0.5), ("r", 0.5)])
            .add_decision("/C:l/", "1", &["a", "b"])
            .add_decision("/C:r/", "1", &["a", "c"])
            .add_terminal("/C:l/P1:a/", &[("1", 1.0)])
            .add_terminal("/C:l/P1:b/", &[("1", 1.0)])
            .add_terminal("/C:r/P1:a/", &[("1", 1.0)])
            .add_terminal("/C:r/P1:c/", &[("1", 1.0)])
            .add_info_set("both", &["/C:l/", "/C:r/"]);
        let tree = Arc::new(GameTree::new(&game).unwrap());
        assert!(matches!(
            Treeplex::new(tree, "1"),
            Err(BuildError::ActionsNotEqual { .. })
        ));
    }

    #[test]
    fn test_mixed_info_set_is_rejected() {
        // chance is hidden at player 1's first move and revealed before the
        // second, so the second moves form one group over two info sets
        let mut game = GameDescriptor::new();
        game.add_chance("/", &[("l", 0.5), ("r", 0.5)])
            .add_decision("/C:l/", "1", &["x"])
            .add_decision("/C:r/", "1", &["x"])
            .add_decision("/C:l/P1:x/", "1", &["a"])
            .add_decision("/C:r/P1:x/", "1", &["a"])
            .add_terminal("/C:l/P1:x/P1:a/", &[("1", 1.0)])
            .add_terminal("/C:r/P1:x/P1:a/", &[("1", 0.0)])
            .add_info_set("first", &["/C:l/", "/C:r/"])
            .add_info_set("second_l", &["/C:l/P1:x/"])
            .add_info_set("second_r", &["/C:r/P1:x/"]);
        let tree = Arc::new(GameTree::new(&game).unwrap());
        assert_eq!(
            Treeplex::new(tree, "1").unwrap_err(),
            BuildError::MixedInfoSets {
                histories: vec!["/C:l/P1:x/".to_string(), "/C:r/P1:x/".to_string()]
            }
        );
    }

    #[test]
    fn test_tolerance_must_be_finite_and_positive() {
        let treeplex = build(&one_decision(), "1");
        for bad in [0.0, -1e-6, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                treeplex.clone().with_tolerance(bad),
                Err(BuildError::InvalidConfig(ConfigError::InvalidTolerance(_)))
            ));
        }
        let treeplex = treeplex.with_tolerance(1e-3).unwrap();
        assert_eq!(treeplex.tolerance(), 1e-3);
    }

    #[test]
    fn test_behavioral_mapping_checks_length() {
        let treeplex = build(&kuhn::descriptor(), "1");
        let short = vec![1.0; treeplex.len() - 1];
        assert_eq!(
            treeplex.treeplex_strat_to_behavioral_game_strat(&short),
            Err(EvalError::LengthMismatch { expected: treeplex.len(), actual: treeplex.len() - 1 })
        );
    }

    #[test]
    fn test_unassigned_decision_is_rejected() {
        let mut game = one_decision();
        game.info_sets.clear();
        let tree = Arc::new(GameTree::new(&game).unwrap());
        assert_eq!(
            Treeplex::new(tree.clone(), "1").unwrap_err(),
            BuildError::Unassigned { history: "/".to_string() }
        );
        // player 2 never acts, so it does not need info sets
        assert!(Treeplex::new(tree, "2").is_ok());
    }

    #[test]
    fn test_forgetful_player_is_rejected() {
        // player 1 moves, then forgets the move at the second decision
        let mut game = GameDescriptor::new();
        game.add_decision("/", "1", &["a", "b"])
            .add_decision("/P1:a/", "1", &["x"])
            .add_decision("/P1:b/", "1", &["x"])
            .add_terminal("/P1:a/P1:x/", &[("1", 1.0)])
            .add_terminal("/P1:b/P1:x/", &[("1", 0.0)])
            .add_info_set("first", &["/"])
            .add_info_set("second", &["/P1:a/", "/P1:b/"]);
        let tree = Arc::new(GameTree::new(&game).unwrap());
        assert_eq!(
            Treeplex::new(tree, "1").unwrap_err(),
            BuildError::SplitInfoSet { info_set: "second".to_string() }
        );
    }

    #[test]
    fn test_overlapping_signatures_are_joined() {
        let (a, b, c, d): (BTreeSet<usize>, _, _, _) = (
            [1, 2].into_iter().collect(),
            [5].into_iter().collect(),
            [2, 3].into_iter().collect(),
            BTreeSet::new(),
        );
        let parts = vec![(&a, vec![10]), (&b, vec![11]), (&d, vec![12, 14]), (&c, vec![13])];
        assert_eq!(merge_overlapping(parts), vec![vec![10, 13], vec![11], vec![12, 14]]);
    }

    #[test]
    fn test_leduc_public_card_merges_deals() {
        // after a checked-through first round, player 1 holding a jack cannot
        // tell which card the opponent holds, whatever the public card
        let tree = Arc::new(GameTree::new(&leduc::descriptor()).unwrap());
        let treeplex = Treeplex::new(tree.clone(), "1").unwrap();
        let info_set = tree.info_set_of("/C:JsQs/P1:c/P2:c/C:Kh/").unwrap();
        let decisions: Vec<&TreeplexNode> = treeplex
            .nodes()
            .iter()
            .filter(|n| matches!(n, TreeplexNode::Decision { info_set: i, .. } if *i == info_set))
            .collect();
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].game_nodes().len() > 1);
    }

    #[test]
    fn test_display_lists_every_node() {
        let treeplex = build(&one_decision(), "1");
        let text = treeplex.to_string();
        assert!(text.starts_with("0: decision [root]"));
        assert!(text.contains("a -> 1"));
        assert!(text.contains("2: observation"));
    }
}
