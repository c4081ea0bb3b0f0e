//! Self-play driver and equilibrium measurement.
//!
//! [`SelfPlay`] runs one [`CfrSolver`] per player. Each step lets the
//! players improve in turn against the latest strategies of the others,
//! then folds the new reach probabilities into a running average:
//!
//! ```text
//! avg += (reach(strategy) - avg) / t
//! ```
//!
//! The averaged profile is what converges; after every step its value for
//! the first player and its Nash-equilibrium gap are recorded.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::cfr::config::{IterationPoint, SelfPlayStats, SolverConfig};
use crate::cfr::descriptor::Player;
use crate::cfr::error::{BuildError, EvalError};
use crate::cfr::solver::CfrSolver;
use crate::cfr::tree::{GameTree, Profile};
use crate::cfr::treeplex::{Convention, Treeplex};

/// Best-response improvement of every player over the averaged profile.
///
/// For each treeplex, the improvement is `u_p(BR_p, avg_-p) - u_p(avg)`.
/// Best responses are computed in parallel.
///
/// # Errors
/// Fails if `reaches` does not hold one vector per player, if a best
/// response is inconsistent, or with [`EvalError::NegativeImprovement`]
/// when an improvement is below minus the treeplex tolerance.
pub fn improvements(
    treeplexes: &[Arc<Treeplex>],
    reaches: &Profile,
) -> Result<Vec<(Player, f64)>, EvalError> {
    treeplexes
        .par_iter()
        .map(|treeplex| {
            let player = treeplex.player();
            let mut others = reaches.clone();
            others.remove(player);
            let response = treeplex.best_response(&others, Convention::ReachProbability, None)?;
            let current = treeplex.tree().eval_utility_by_reach_probability(reaches, player)?;
            let improvement = response.value - current;
            if improvement < -treeplex.tolerance() {
                return Err(EvalError::NegativeImprovement {
                    player: player.to_string(),
                    improvement,
                });
            }
            Ok((player.to_string(), improvement))
        })
        .collect()
}

/// Nash-equilibrium gap of a profile given as reach probabilities: the sum
/// of all players' best-response improvements. Zero at an equilibrium.
///
/// # Errors
/// See [`improvements`].
pub fn nash_gap(treeplexes: &[Arc<Treeplex>], reaches: &Profile) -> Result<f64, EvalError> {
    Ok(improvements(treeplexes, reaches)?.iter().map(|(_, i)| i).sum())
}

/// CFR self-play over all players of a game.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use treeplex_cfr::cfr::{GameTree, SelfPlay, SolverConfig};
/// use treeplex_cfr::games::kuhn;
///
/// let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
/// let mut selfplay = SelfPlay::new(tree, &SolverConfig::default()).unwrap();
/// let stats = selfplay.train(99).unwrap();
/// assert_eq!(stats.iterations, 100);
/// ```
#[derive(Debug)]
pub struct SelfPlay {
    tree: Arc<GameTree>,
    treeplexes: Vec<Arc<Treeplex>>,
    solvers: Vec<CfrSolver>,
    current: Profile,
    average: Profile,
    iterates: u64,
    stats: SelfPlayStats,
}

impl SelfPlay {
    /// Build one treeplex and solver per player and take their first
    /// strategies, which also start the average.
    ///
    /// # Errors
    /// Fails if the configuration is invalid or a treeplex cannot be built.
    pub fn new(tree: Arc<GameTree>, config: &SolverConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let mut treeplexes = Vec::new();
        let mut solvers = Vec::new();
        let mut current = Profile::new();
        for player in tree.players() {
            let treeplex =
                Arc::new(Treeplex::new(tree.clone(), player)?.with_tolerance(config.tolerance)?);
            let mut solver = CfrSolver::new(treeplex.clone(), config);
            current.insert(player.clone(), solver.next_strategy_behavioral());
            treeplexes.push(treeplex);
            solvers.push(solver);
        }
        let average = current
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect();
        log::debug!("self-play over {} players", solvers.len());
        Ok(Self {
            tree,
            treeplexes,
            solvers,
            current,
            average,
            iterates: 1,
            stats: SelfPlayStats::new(),
        })
    }

    /// The shared game tree.
    pub fn tree(&self) -> &Arc<GameTree> {
        &self.tree
    }

    /// One treeplex per player, in player order.
    pub fn treeplexes(&self) -> &[Arc<Treeplex>] {
        &self.treeplexes
    }

    /// The latest behavioral strategies.
    pub fn current(&self) -> &Profile {
        &self.current
    }

    /// Time-averaged reach probabilities.
    pub fn average(&self) -> &Profile {
        &self.average
    }

    /// Number of strategy iterates averaged so far.
    pub fn iterates(&self) -> u64 {
        self.iterates
    }

    /// Statistics recorded so far.
    pub fn stats(&self) -> &SelfPlayStats {
        &self.stats
    }

    /// The player whose value is recorded.
    pub fn reference_player(&self) -> &str {
        self.solvers.first().map_or("", |s| s.player())
    }

    /// Value of the averaged profile for `player`.
    pub fn average_utility(&self, player: &str) -> Result<f64, EvalError> {
        self.tree.eval_utility_by_reach_probability(&self.average, player)
    }

    /// Nash-equilibrium gap of the averaged profile.
    pub fn nash_gap(&self) -> Result<f64, EvalError> {
        nash_gap(&self.treeplexes, &self.average)
    }

    /// Best-response improvement of each player over the averaged profile.
    pub fn improvements(&self) -> Result<Vec<(Player, f64)>, EvalError> {
        improvements(&self.treeplexes, &self.average)
    }

    /// Let every player improve and produce a new strategy, then update the
    /// average and record its measurements.
    ///
    /// # Errors
    /// The average is only committed once it has been measured, so a failed
    /// measurement leaves it and the statistics untouched. A failure inside
    /// a solver update is terminal: earlier solvers have already advanced.
    pub fn step(&mut self) -> Result<IterationPoint, EvalError> {
        let mut current = self.current.clone();
        for solver in &mut self.solvers {
            let player = solver.player().to_string();
            let mut others = current.clone();
            others.remove(&player);
            solver.improve(&others, None)?;
            current.insert(player, solver.next_strategy_behavioral());
        }

        let iterates = self.iterates + 1;
        let weight = 1.0 / iterates as f64;
        let mut average = self.average.clone();
        for (player, strategy) in &current {
            let reach = self.tree.behavioral_to_reach_probability(strategy);
            if let Some(average) = average.get_mut(player) {
                for (a, r) in average.iter_mut().zip(reach) {
                    *a += weight * (r - *a);
                }
            }
        }

        let point = IterationPoint {
            iteration: iterates,
            average_utility: self
                .tree
                .eval_utility_by_reach_probability(&average, self.reference_player())?,
            nash_gap: nash_gap(&self.treeplexes, &average)?,
        };
        self.current = current;
        self.average = average;
        self.iterates = iterates;
        self.stats.record(point);
        Ok(point)
    }

    /// Run `iterations` steps.
    pub fn train(&mut self, iterations: u64) -> Result<&SelfPlayStats, EvalError> {
        self.train_with_callback(iterations, u64::MAX, |_| {})
    }

    /// Run `iterations` steps, calling `callback` every `callback_interval`
    /// steps.
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&SelfPlayStats, EvalError>
    where
        F: FnMut(&SelfPlayStats),
    {
        let start_time = Instant::now();
        let elapsed_before = self.stats.elapsed_seconds;

        for i in 0..iterations {
            let point = self.step()?;

            if (i + 1) % callback_interval.max(1) == 0 {
                self.stats.elapsed_seconds = elapsed_before + start_time.elapsed().as_secs_f64();
                self.stats.update_rate();
                log::info!(
                    "iteration {}: utility {:.6}, nash gap {:.6}",
                    point.iteration,
                    point.average_utility,
                    point.nash_gap
                );
                callback(&self.stats);
            }
        }

        self.stats.elapsed_seconds = elapsed_before + start_time.elapsed().as_secs_f64();
        self.stats.update_rate();
        Ok(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::ConfigError;
    use crate::games::{kuhn, leduc, rps};

    fn selfplay(game: &crate::cfr::descriptor::GameDescriptor) -> SelfPlay {
        let tree = Arc::new(GameTree::new(game).unwrap());
        SelfPlay::new(tree, &SolverConfig::default()).unwrap()
    }

    #[test]
    fn test_kuhn_converges() {
        let mut play = selfplay(&kuhn::descriptor());
        let stats = play.train(999).unwrap().clone();

        let utility = stats.average_utility.unwrap();
        let gap = stats.nash_gap.unwrap();
        println!(
            "kuhn after {} iterates: utility {:.5}, gap {:.5}",
            stats.iterations, utility, gap
        );
        assert_eq!(stats.iterations, 1000);
        assert_eq!(stats.history.len(), 999);
        assert!((utility + 1.0 / 18.0).abs() < 0.01);
        assert!(gap < 0.01);
    }

    #[test]
    fn test_kuhn_gap_is_nonnegative_and_shrinks() {
        let mut play = selfplay(&kuhn::descriptor());
        for _ in 0..199 {
            play.step().unwrap();
            for (_, improvement) in play.improvements().unwrap() {
                assert!(improvement > -1e-9);
            }
        }
        let history = &play.stats().history;
        // history[k] is the profile averaged over k + 2 iterates
        let gap = |iterates: usize| history[iterates - 2].nash_gap;
        assert!(gap(11) > gap(50));
        assert!(gap(50) > gap(100));
        assert!(gap(100) > gap(200));
        assert!(history.iter().all(|p| p.nash_gap > -1e-9));
    }

    #[test]
    fn test_uniform_rps_is_an_equilibrium() {
        let mut play = selfplay(&rps::descriptor());
        assert!(play.nash_gap().unwrap().abs() < 1e-12);
        for _ in 0..5 {
            let point = play.step().unwrap();
            assert!(point.nash_gap.abs() < 1e-12);
            assert!(point.average_utility.abs() < 1e-12);
        }
    }

    #[test]
    fn test_uniform_kuhn_gap() {
        let play = selfplay(&kuhn::descriptor());
        // best responses to uniform play: 1/2 for player 1, 5/12 for player 2
        let improvements = play.improvements().unwrap();
        assert_eq!(improvements[0].0, "1");
        assert!((improvements[0].1 - (0.5 - 0.125)).abs() < 1e-9);
        assert!((improvements[1].1 - (5.0 / 12.0 + 0.125)).abs() < 1e-9);
    }

    #[test]
    fn test_negative_improvement_is_an_error() {
        // player 1 puts mass 3 on rock, which no strategy can do, and
        // scores above any best response
        let play = selfplay(&rps::descriptor());
        let tree = play.tree().clone();
        let mut reaches = play.average().clone();
        if let Some(r) = reaches.get_mut("1") {
            for history in ["/P1:r/", "/P1:r/P2:r/", "/P1:r/P2:p/", "/P1:r/P2:s/"] {
                r[tree.index_of(history).unwrap()] = 3.0;
            }
        }
        if let Some(r) = reaches.get_mut("2") {
            r[tree.index_of("/P1:r/P2:s/").unwrap()] = 5.0;
        }
        assert!(matches!(
            nash_gap(play.treeplexes(), &reaches),
            Err(EvalError::NegativeImprovement { .. })
        ));
    }

    #[test]
    fn test_invalid_tolerance_is_rejected() {
        let tree = Arc::new(GameTree::new(&rps::descriptor()).unwrap());
        for tolerance in [f64::NAN, f64::INFINITY, 0.0] {
            let config = SolverConfig::default().with_tolerance(tolerance);
            assert!(matches!(
                SelfPlay::new(tree.clone(), &config),
                Err(BuildError::InvalidConfig(ConfigError::InvalidTolerance(_)))
            ));
        }
        let config = SolverConfig::default().with_exploration(0.5);
        assert!(SelfPlay::new(tree, &config).is_ok());
    }

    #[test]
    fn test_step_measures_before_committing() {
        // the first treeplex is swapped for one of another game, so the
        // measurement fails after the solvers have run
        let tree = Arc::new(GameTree::new(&rps::descriptor()).unwrap());
        let mut play = SelfPlay::new(tree, &SolverConfig::default()).unwrap();
        let average = play.average().clone();
        let kuhn_tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
        play.treeplexes[0] = Arc::new(Treeplex::new(kuhn_tree, "1").unwrap());

        assert!(matches!(play.step(), Err(EvalError::LengthMismatch { .. })));
        assert_eq!(play.iterates(), 1);
        assert_eq!(play.average(), &average);
        assert!(play.stats().history.is_empty());
    }

    #[test]
    fn test_callback_interval() {
        let mut play = selfplay(&leduc::descriptor());
        let mut calls = 0;
        let stats = play.train_with_callback(6, 3, |_| calls += 1).unwrap();
        assert_eq!(stats.iterations, 7);
        assert_eq!(calls, 2);
        assert!(stats.nash_gap.unwrap() > -1e-9);
    }
}
