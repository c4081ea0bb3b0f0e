//! Monte Carlo style learners that work on info sets of the game tree
//! directly, without a treeplex.
//!
//! Both learners are experimental. Neither is used by
//! [`SelfPlay`](crate::cfr::SelfPlay), and their regret accounting is not
//! covered by a convergence guarantee.
//!
//! - [`Mccfr`] makes one full pass over the tree per `improve` call and
//!   updates every info set of one player, summing the contributions of all
//!   member nodes before the regret transform.
//! - [`OutcomeSampling`] samples a single root-to-leaf episode per player and
//!   updates the info sets on that path with importance-weighted values. Its
//!   regrets and average policies can be checkpointed to resume long runs.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cfr::config::SolverConfig;
use crate::cfr::descriptor::{Action, NodeDescriptor, Player};
use crate::cfr::error::{BuildError, EvalError};
use crate::cfr::minimizer::{Accumulator, RegretMatching, RegretMinimizer};
use crate::cfr::storage::{MinimizerState, SolverState};
use crate::cfr::trace::{emit, Trace, TraceSink};
use crate::cfr::tree::{GameTree, Profile};

/// One info set as seen by a learner.
#[derive(Debug, Clone)]
struct Slot {
    info_set: usize,
    player: Player,
    actions: Vec<Action>,
}

/// Maps the decision nodes of some players to info-set slots.
#[derive(Debug, Clone)]
struct InfoSetIndex {
    slots: Vec<Slot>,
    /// Slot per game node; `Some` at indexed decision nodes.
    slot_of: Vec<Option<usize>>,
    /// Children of each indexed decision node in slot action order.
    ordered_children: Vec<Vec<usize>>,
}

impl InfoSetIndex {
    fn build<F>(tree: &GameTree, include: F) -> Result<Self, BuildError>
    where
        F: Fn(&str) -> bool,
    {
        let mut slots: Vec<Slot> = Vec::new();
        let mut slot_by_info_set = vec![None; tree.info_sets().len()];
        let mut slot_of = vec![None; tree.len()];
        let mut ordered_children = vec![Vec::new(); tree.len()];

        for node in tree.nodes() {
            let actor = match node.descriptor.player() {
                Some(actor) if include(actor) => actor,
                _ => continue,
            };
            let info_set = tree.info_set_of(node.history()).ok_or_else(|| {
                BuildError::Unassigned {
                    history: node.history().to_string(),
                }
            })?;
            let slot = match slot_by_info_set[info_set] {
                Some(slot) => slot,
                None => {
                    slots.push(Slot {
                        info_set,
                        player: actor.to_string(),
                        actions: node.descriptor.actions().iter().map(|a| a.to_string()).collect(),
                    });
                    slot_by_info_set[info_set] = Some(slots.len() - 1);
                    slots.len() - 1
                }
            };
            let not_equal = || BuildError::ActionsNotEqual {
                info_set: tree.info_sets()[info_set].name.clone(),
                history: node.history().to_string(),
            };
            if node.children.len() != slots[slot].actions.len() {
                return Err(not_equal());
            }
            let children = slots[slot]
                .actions
                .iter()
                .map(|a| node.child(a).ok_or_else(not_equal))
                .collect::<Result<Vec<usize>, BuildError>>()?;
            slot_of[node.index] = Some(slot);
            ordered_children[node.index] = children;
        }

        Ok(Self {
            slots,
            slot_of,
            ordered_children,
        })
    }

    /// Scatter per-slot distributions into a behavioral strategy.
    fn scatter(&self, tree: &GameTree, strategies: &[Vec<f64>], player: &str) -> Vec<f64> {
        let mut behavioral = vec![1.0; tree.len()];
        for node in tree.nodes() {
            if let Some(slot) = self.slot_of[node.index] {
                if self.slots[slot].player == player {
                    let children = &self.ordered_children[node.index];
                    for (&child, &p) in children.iter().zip(&strategies[slot]) {
                        behavioral[child] = p;
                    }
                }
            }
        }
        behavioral
    }

    fn name<'a>(&self, tree: &'a GameTree, slot: usize) -> &'a str {
        &tree.info_sets()[self.slots[slot].info_set].name
    }
}

/// Full-tree learner of one player with one regret minimizer per info set.
///
/// Every `improve` call walks the whole tree once, leaf to root, and
/// computes the player's expected value under true chance probabilities,
/// the other players' strategies, and the player's own last strategy. At
/// each of the player's decision nodes it adds the opponent-reach-weighted
/// value of every action to the info set's buffer; buffers are flushed once
/// per pass.
#[derive(Debug)]
pub struct Mccfr {
    tree: Arc<GameTree>,
    player: Player,
    others: Vec<Player>,
    index: InfoSetIndex,
    minimizers: Vec<Accumulator>,
    last_strategy: Option<Vec<f64>>,
    iteration: u64,
}

impl Mccfr {
    /// Create a learner for `player`.
    ///
    /// # Errors
    /// Fails if the configuration is invalid, a decision node of `player`
    /// has no info set, or the members of one info set offer different
    /// actions.
    pub fn new(
        tree: Arc<GameTree>,
        player: &str,
        config: &SolverConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let index = InfoSetIndex::build(&tree, |actor| actor == player)?;
        let minimizers = index
            .slots
            .iter()
            .map(|slot| Accumulator::new(config.minimizer.build(slot.actions.len())))
            .collect();
        let others = tree.players().iter().filter(|p| *p != player).cloned().collect();
        log::debug!("mccfr for player {}: {} info sets", player, index.slots.len());
        Ok(Self {
            tree,
            player: player.to_string(),
            others,
            index,
            minimizers,
            last_strategy: None,
            iteration: 0,
        })
    }

    /// The player this learner plays for.
    pub fn player(&self) -> &str {
        &self.player
    }

    /// Number of completed `improve` calls.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Produce the next strategy as a behavioral strategy over game nodes.
    pub fn next_strategy_behavioral(&mut self) -> Vec<f64> {
        let strategies: Vec<Vec<f64>> =
            self.minimizers.iter_mut().map(|m| m.next_strategy()).collect();
        let behavioral = self.index.scatter(&self.tree, &strategies, &self.player);
        self.last_strategy = Some(behavioral.clone());
        behavioral
    }

    /// Feed back the other players' behavioral strategies.
    ///
    /// # Errors
    /// Fails with [`EvalError::NoStrategy`] before the first
    /// [`Mccfr::next_strategy_behavioral`], or if `others` does not hold one
    /// node-indexed vector per other player.
    pub fn improve(
        &mut self,
        others: &Profile,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), EvalError> {
        let mut trace = trace;
        self.tree.check_profile(others, self.others.iter())?;
        let last = self.last_strategy.as_ref().ok_or(EvalError::NoStrategy)?;

        // opponent and chance reach of every node
        let mut counterfactual = self.tree.chance_reach_probability().to_vec();
        for strategy in others.values() {
            let reach = self.tree.behavioral_to_reach_probability(strategy);
            for (c, r) in counterfactual.iter_mut().zip(reach) {
                *c *= r;
            }
        }

        let mut value = vec![0.0; self.tree.len()];
        for node in self.tree.nodes().iter().rev() {
            value[node.index] = match &node.descriptor {
                NodeDescriptor::Terminal { .. } => node.descriptor.payoff(&self.player),
                NodeDescriptor::Chance { outcomes, .. } => outcomes
                    .iter()
                    .zip(node.child_indices())
                    .map(|((_, p), c)| p * value[c])
                    .sum(),
                NodeDescriptor::Decision { player: actor, .. } => {
                    let strategy = if *actor == self.player { last } else { &others[actor] };
                    if let Some(slot) = self.index.slot_of[node.index] {
                        let feedback: Vec<f64> = self.index.ordered_children[node.index]
                            .iter()
                            .map(|&c| counterfactual[node.index] * value[c])
                            .collect();
                        self.minimizers[slot].accumulate(&feedback);
                    }
                    node.child_indices().map(|c| strategy[c] * value[c]).sum()
                }
            };
            emit(&mut trace, Trace::Game { node: node.index, value: value[node.index] });
        }

        for minimizer in &mut self.minimizers {
            minimizer.flush();
        }
        self.iteration += 1;
        Ok(())
    }

    /// Export learner state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        let mut state = SolverState::new(&self.player, self.iteration);
        for (slot, minimizer) in self.minimizers.iter().enumerate() {
            state.minimizers.insert(
                self.index.name(&self.tree, slot).to_string(),
                MinimizerState::capture(minimizer),
            );
        }
        state
    }

    /// Import learner state from a checkpoint; clears the last strategy.
    ///
    /// # Errors
    /// Fails if the checkpoint belongs to another player or does not match
    /// the player's info sets. The learner is left unchanged on error.
    pub fn import_state(&mut self, state: &SolverState) -> Result<(), EvalError> {
        if state.player != self.player {
            return Err(EvalError::PlayerMismatch {
                expected: vec![self.player.clone()],
                actual: vec![state.player.clone()],
            });
        }
        let names = (0..self.index.slots.len()).map(|slot| self.index.name(&self.tree, slot));
        state.check_covers_only(names)?;
        let mut restored: Vec<Box<dyn RegretMinimizer>> =
            self.minimizers.iter().map(|m| m.boxed_clone()).collect();
        for (slot, minimizer) in restored.iter_mut().enumerate() {
            state.restore_into(self.index.name(&self.tree, slot), &mut **minimizer)?;
        }
        for (target, source) in self.minimizers.iter_mut().zip(&restored) {
            target.restore(source.regrets().to_vec(), source.previous().map(<[f64]>::to_vec));
        }
        self.iteration = state.iteration;
        self.last_strategy = None;
        Ok(())
    }
}

/// One step of a sampled episode.
#[derive(Debug)]
struct Step {
    slot: usize,
    traverser: bool,
    policy: Vec<f64>,
    sample_policy: Vec<f64>,
    action: usize,
    reach_me: f64,
    reach_other: f64,
    reach_sample: f64,
}

/// Outcome-sampling learner for all players of a game.
///
/// Each iteration samples one episode per player. Chance follows its
/// probabilities, the other players their current strategies, and the
/// traversing player the exploratory mix `exploration / n + (1 -
/// exploration) * strategy`. On the way back, every info set of the
/// traversing player on the path receives the importance-weighted value of
/// the sampled action and adds `reach_me * strategy / reach_sample` to its
/// average policy.
///
/// The learners always use plain regret matching: dropping negative
/// instantaneous regret stalls on the high-variance sampled values.
#[derive(Debug)]
pub struct OutcomeSampling {
    tree: Arc<GameTree>,
    index: InfoSetIndex,
    minimizers: Vec<RegretMatching>,
    averages: Vec<Vec<f64>>,
    exploration: f64,
    rng: StdRng,
    iteration: u64,
}

impl OutcomeSampling {
    /// Create a learner over every info set of the tree.
    ///
    /// # Errors
    /// Fails if the configuration is invalid, a decision node has no info
    /// set, or the members of one info set offer different actions.
    pub fn new(tree: Arc<GameTree>, config: &SolverConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let index = InfoSetIndex::build(&tree, |_| true)?;
        let minimizers = index
            .slots
            .iter()
            .map(|slot| RegretMatching::new(slot.actions.len()))
            .collect();
        let averages = index.slots.iter().map(|slot| vec![0.0; slot.actions.len()]).collect();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            tree,
            index,
            minimizers,
            averages,
            exploration: config.exploration,
            rng,
            iteration: 0,
        })
    }

    /// Number of completed iterations.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Run one episode for every player.
    pub fn run_iteration(&mut self) {
        let players: Vec<Player> = self.tree.players().iter().cloned().collect();
        for player in &players {
            self.episode(player);
        }
        self.iteration += 1;
    }

    /// Run `iterations` iterations.
    pub fn train(&mut self, iterations: u64) {
        for _ in 0..iterations {
            self.run_iteration();
        }
        log::debug!("outcome sampling: {} iterations", self.iteration);
    }

    /// Sample one episode for `player` and update the info sets on its path.
    ///
    /// Returns the sampled estimate of the player's value at the root.
    pub fn episode(&mut self, player: &str) -> f64 {
        let mut path: Vec<Step> = Vec::new();
        let (mut reach_me, mut reach_other, mut reach_sample) = (1.0, 1.0, 1.0);
        let mut index = 0;

        let mut value = loop {
            let node = self.tree.node(index);
            match (&node.descriptor, self.index.slot_of[index]) {
                (NodeDescriptor::Chance { outcomes, .. }, _) => {
                    let probs: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
                    let j = sample_index(&mut self.rng, &probs);
                    reach_other *= probs[j];
                    reach_sample *= probs[j];
                    index = node.children[j].1;
                }
                (NodeDescriptor::Decision { player: actor, .. }, Some(slot)) => {
                    let traverser = actor == player;
                    let policy = self.minimizers[slot].next_strategy();
                    let n = policy.len() as f64;
                    let sample_policy: Vec<f64> = if traverser {
                        policy
                            .iter()
                            .map(|p| self.exploration / n + (1.0 - self.exploration) * p)
                            .collect()
                    } else {
                        policy.clone()
                    };
                    let action = sample_index(&mut self.rng, &sample_policy);
                    path.push(Step {
                        slot,
                        traverser,
                        policy: policy.clone(),
                        sample_policy: sample_policy.clone(),
                        action,
                        reach_me,
                        reach_other,
                        reach_sample,
                    });
                    if traverser {
                        reach_me *= policy[action];
                    } else {
                        reach_other *= policy[action];
                    }
                    reach_sample *= sample_policy[action];
                    index = self.index.ordered_children[index][action];
                }
                _ => break node.descriptor.payoff(player),
            }
        };

        for step in path.iter().rev() {
            let sampled = value / step.sample_policy[step.action];
            if step.traverser {
                let mut utility = vec![0.0; step.policy.len()];
                utility[step.action] = sampled * step.reach_other / step.reach_sample;
                // the policy of this visit is the learner's previous strategy
                self.minimizers[step.slot].observe_utility(&utility);
                for (avg, p) in self.averages[step.slot].iter_mut().zip(&step.policy) {
                    *avg += step.reach_me * p / step.reach_sample;
                }
            }
            value = sampled * step.policy[step.action];
        }
        value
    }

    /// Export regrets and accumulated average policies for checkpointing.
    ///
    /// The random generator is not part of the checkpoint.
    pub fn export_state(&self) -> SolverState {
        let mut state = SolverState::new(&self.players_key(), self.iteration);
        for (slot, minimizer) in self.minimizers.iter().enumerate() {
            state.minimizers.insert(
                self.index.name(&self.tree, slot).to_string(),
                MinimizerState::capture(minimizer).with_average(&self.averages[slot]),
            );
        }
        state
    }

    /// Import regrets and average policies from a checkpoint.
    ///
    /// # Errors
    /// Fails if the checkpoint was taken over other players, misses an info
    /// set or its average, holds an unknown info set, or has vectors of the
    /// wrong size. The learner is left unchanged on error.
    pub fn import_state(&mut self, state: &SolverState) -> Result<(), EvalError> {
        let players = self.players_key();
        if state.player != players {
            return Err(EvalError::PlayerMismatch {
                expected: vec![players],
                actual: vec![state.player.clone()],
            });
        }
        let names = (0..self.index.slots.len()).map(|slot| self.index.name(&self.tree, slot));
        state.check_covers_only(names)?;

        let mut minimizers = self.minimizers.clone();
        let mut averages = Vec::with_capacity(self.averages.len());
        for (slot, minimizer) in minimizers.iter_mut().enumerate() {
            let name = self.index.name(&self.tree, slot);
            state.restore_into(name, minimizer)?;
            averages.push(state.average_of(name, minimizer.num_actions())?.to_vec());
        }
        self.minimizers = minimizers;
        self.averages = averages;
        self.iteration = state.iteration;
        Ok(())
    }

    fn players_key(&self) -> String {
        self.tree.players().iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Normalized average policy of `player` as a behavioral strategy.
    ///
    /// Info sets that were never updated play uniformly.
    pub fn average_strategy_behavioral(&self, player: &str) -> Vec<f64> {
        let strategies: Vec<Vec<f64>> = self.averages.iter().map(|a| normalize(a)).collect();
        self.index.scatter(&self.tree, &strategies, player)
    }

    /// Average policy of every player.
    pub fn average_profile(&self) -> Profile {
        self.tree
            .players()
            .iter()
            .map(|p| (p.clone(), self.average_strategy_behavioral(p)))
            .collect()
    }
}

fn normalize(weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    if sum > 1e-9 {
        weights.iter().map(|w| w / sum).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    }
}

/// Sample an index proportionally to `weights`.
fn sample_index(rng: &mut StdRng, weights: &[f64]) -> usize {
    let sum: f64 = weights.iter().sum();
    if sum <= 1e-9 {
        return rng.gen_range(0..weights.len());
    }
    let r = rng.gen::<f64>() * sum;
    let mut cumsum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return i;
        }
    }

    // floating point imprecision
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::MinimizerKind;
    use crate::cfr::selfplay::nash_gap;
    use crate::cfr::solver::CfrSolver;
    use crate::cfr::treeplex::Treeplex;
    use crate::games::{kuhn, rps};

    fn kuhn_tree() -> Arc<GameTree> {
        Arc::new(GameTree::new(&kuhn::descriptor()).unwrap())
    }

    fn single(player: &str, strategy: &[f64]) -> Profile {
        let mut profile = Profile::new();
        profile.insert(player.to_string(), strategy.to_vec());
        profile
    }

    fn reaches(tree: &GameTree, profile: &Profile) -> Profile {
        profile
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect()
    }

    #[test]
    fn test_first_strategy_is_uniform() {
        let tree = kuhn_tree();
        let mut learner = Mccfr::new(tree.clone(), "2", &SolverConfig::default()).unwrap();
        assert_eq!(
            learner.next_strategy_behavioral(),
            tree.player_uniform_strategy_behavioral("2")
        );
    }

    #[test]
    fn test_improve_requires_strategy_and_other_players() {
        let tree = kuhn_tree();
        let mut learner = Mccfr::new(tree.clone(), "1", &SolverConfig::default()).unwrap();
        let uniform = single("2", &tree.player_uniform_strategy_behavioral("2"));
        assert_eq!(learner.improve(&uniform, None), Err(EvalError::NoStrategy));

        learner.next_strategy_behavioral();
        let wrong = single("1", &tree.player_uniform_strategy_behavioral("1"));
        assert!(matches!(learner.improve(&wrong, None), Err(EvalError::PlayerMismatch { .. })));
        assert!(learner.improve(&uniform, None).is_ok());
        assert_eq!(learner.iteration(), 1);
    }

    #[test]
    fn test_full_pass_tracks_treeplex_cfr_on_kuhn() {
        let tree = kuhn_tree();
        let config = SolverConfig::default();
        let mut c1 = CfrSolver::new(Arc::new(Treeplex::new(tree.clone(), "1").unwrap()), &config);
        let mut c2 = CfrSolver::new(Arc::new(Treeplex::new(tree.clone(), "2").unwrap()), &config);
        let mut m1 = Mccfr::new(tree.clone(), "1", &config).unwrap();
        let mut m2 = Mccfr::new(tree.clone(), "2", &config).unwrap();

        let (mut s1, mut s2) = (c1.next_strategy_behavioral(), c2.next_strategy_behavioral());
        let (mut x1, mut x2) = (m1.next_strategy_behavioral(), m2.next_strategy_behavioral());
        for _ in 0..50 {
            c1.improve(&single("2", &s2), None).unwrap();
            s1 = c1.next_strategy_behavioral();
            c2.improve(&single("1", &s1), None).unwrap();
            s2 = c2.next_strategy_behavioral();

            m1.improve(&single("2", &x2), None).unwrap();
            x1 = m1.next_strategy_behavioral();
            m2.improve(&single("1", &x1), None).unwrap();
            x2 = m2.next_strategy_behavioral();

            for (a, b) in s1.iter().chain(&s2).zip(x1.iter().chain(&x2)) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_improve_traces_every_game_node() {
        let tree = kuhn_tree();
        let mut learner = Mccfr::new(tree.clone(), "1", &SolverConfig::default()).unwrap();
        let s1 = learner.next_strategy_behavioral();
        let s2 = tree.player_uniform_strategy_behavioral("2");
        let mut traces: Vec<Trace> = Vec::new();
        learner.improve(&single("2", &s2), Some(&mut traces)).unwrap();
        assert_eq!(traces.len(), tree.len());

        let mut profile = single("2", &s2);
        profile.insert("1".to_string(), s1);
        let expected = tree.eval_utility(&profile, "1").unwrap();
        match traces.last() {
            Some(Trace::Game { node: 0, value }) => assert!((value - expected).abs() < 1e-12),
            other => panic!("unexpected trace {:?}", other),
        }
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let tree = kuhn_tree();
        let config = SolverConfig::default().with_minimizer(MinimizerKind::RegretMatching);
        let mut learner = Mccfr::new(tree.clone(), "2", &config).unwrap();
        let uniform = single("1", &tree.player_uniform_strategy_behavioral("1"));
        for _ in 0..3 {
            learner.next_strategy_behavioral();
            learner.improve(&uniform, None).unwrap();
        }
        let state = learner.export_state();

        let mut restored = Mccfr::new(tree, "2", &config).unwrap();
        restored.import_state(&state).unwrap();
        assert_eq!(restored.iteration(), 3);
        assert_eq!(restored.next_strategy_behavioral(), learner.next_strategy_behavioral());
    }

    #[test]
    fn test_outcome_sampling_is_reproducible_with_seed() {
        let tree = kuhn_tree();
        let config = SolverConfig::default().with_seed(42);
        let mut a = OutcomeSampling::new(tree.clone(), &config).unwrap();
        let mut b = OutcomeSampling::new(tree, &config).unwrap();
        a.train(200);
        b.train(200);
        assert_eq!(a.average_profile(), b.average_profile());
        assert_eq!(a.iteration(), 200);
    }

    #[test]
    fn test_outcome_sampling_average_is_a_strategy() {
        let tree = kuhn_tree();
        let config = SolverConfig::default().with_seed(1);
        let mut learner = OutcomeSampling::new(tree.clone(), &config).unwrap();
        learner.train(100);
        for (player, strategy) in learner.average_profile() {
            for node in tree.nodes() {
                if node.descriptor.is_decision_of(&player) {
                    let total: f64 = node.child_indices().map(|c| strategy[c]).sum();
                    assert!((total - 1.0).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_outcome_sampling_approaches_kuhn_equilibrium() {
        let tree = kuhn_tree();
        let treeplexes = vec![
            Arc::new(Treeplex::new(tree.clone(), "1").unwrap()),
            Arc::new(Treeplex::new(tree.clone(), "2").unwrap()),
        ];
        let uniform: Profile = tree
            .players()
            .iter()
            .map(|p| (p.clone(), tree.player_uniform_strategy_behavioral(p)))
            .collect();
        let uniform_gap = nash_gap(&treeplexes, &reaches(&tree, &uniform)).unwrap();

        let config = SolverConfig::default().with_seed(7);
        let mut learner = OutcomeSampling::new(tree.clone(), &config).unwrap();
        learner.train(10_000);
        let average = reaches(&tree, &learner.average_profile());
        let gap = nash_gap(&treeplexes, &average).unwrap();
        let value = tree.eval_utility_by_reach_probability(&average, "1").unwrap();

        println!("uniform gap {:.4}, sampled gap {:.4}, value {:.4}", uniform_gap, gap, value);
        assert!(gap < 0.3);
        assert!(gap < uniform_gap);
        assert!((value + 1.0 / 18.0).abs() < 0.02);
    }

    #[test]
    fn test_outcome_sampling_checkpoint_round_trip() {
        let tree = kuhn_tree();
        let config = SolverConfig::default().with_seed(3);
        let mut learner = OutcomeSampling::new(tree.clone(), &config).unwrap();
        learner.train(300);
        let state = learner.export_state();
        assert_eq!(state.player, "1,2");
        assert_eq!(state.minimizers.len(), tree.info_sets().len());
        assert!(state.minimizers.values().all(|m| m.average.is_some()));

        let path = std::env::temp_dir()
            .join(format!("treeplex_sampling_{}.json", std::process::id()));
        state.save_json_file(&path).unwrap();
        let loaded = SolverState::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let mut from_file = OutcomeSampling::new(tree.clone(), &config).unwrap();
        from_file.import_state(&loaded).unwrap();
        assert_eq!(from_file.iteration(), 300);

        let mut restored = OutcomeSampling::new(tree, &config).unwrap();
        restored.import_state(&state).unwrap();
        assert_eq!(restored.average_profile(), learner.average_profile());
        assert_eq!(restored.export_state(), state);
    }

    #[test]
    fn test_outcome_sampling_rejects_foreign_checkpoint() {
        let mut kuhn = OutcomeSampling::new(kuhn_tree(), &SolverConfig::default()).unwrap();
        let rps_tree = Arc::new(GameTree::new(&rps::descriptor()).unwrap());
        let mut rps = OutcomeSampling::new(rps_tree, &SolverConfig::default()).unwrap();
        rps.train(10);
        assert!(matches!(
            kuhn.import_state(&rps.export_state()),
            Err(EvalError::StateMismatch { .. })
        ));

        let mut state = kuhn.export_state();
        if let Some(saved) = state.minimizers.get_mut("1J") {
            saved.average = None;
        }
        state.iteration = 5;
        assert_eq!(
            kuhn.import_state(&state),
            Err(EvalError::StateMismatch { info_set: "1J".to_string() })
        );
        assert_eq!(kuhn.iteration(), 0);
    }

    #[test]
    fn test_unassigned_decision_is_rejected() {
        let mut game = rps::descriptor();
        game.info_sets.retain(|s| s.name != "2");
        let tree = Arc::new(GameTree::new(&game).unwrap());
        assert!(Mccfr::new(tree.clone(), "1", &SolverConfig::default()).is_ok());
        assert!(matches!(
            Mccfr::new(tree.clone(), "2", &SolverConfig::default()),
            Err(BuildError::Unassigned { .. })
        ));
        assert!(OutcomeSampling::new(tree, &SolverConfig::default()).is_err());
    }
}
