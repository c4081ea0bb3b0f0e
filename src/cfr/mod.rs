//! CFR (Counterfactual Regret Minimization) solver module.
//!
//! This module computes approximate Nash equilibria of finite
//! extensive-form games described as history tables.
//!
//! # Overview
//!
//! A game flows through four layers:
//! 1. [`GameDescriptor`]: nodes keyed by history, info sets and payoffs
//! 2. [`GameTree`]: the descriptor flattened into a pre-order arena
//! 3. [`Treeplex`]: one player's view of the tree, alternating decision
//!    points and observation points
//! 4. [`CfrSolver`]: one regret minimizer per decision point, combined
//!    bottom-up over the treeplex
//!
//! [`SelfPlay`] runs one solver per player, averages their strategies and
//! measures the average with the Nash-equilibrium gap.
//!
//! # Supported Variants
//!
//! - **Regret Matching**: strategy proportional to positive regret
//! - **Regret Matching+**: regret floored at zero after every update
//! - **Multiplicative Weights**: softmax of accumulated regret
//! - **MCCFR**: per-info-set learners over the game tree, in a full
//!   traversal or sampled one outcome at a time
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use treeplex_cfr::cfr::{GameTree, MinimizerKind, SelfPlay, SolverConfig};
//! use treeplex_cfr::games::kuhn;
//!
//! let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
//! let config = SolverConfig::default().with_minimizer(MinimizerKind::RegretMatchingPlus);
//! let mut selfplay = SelfPlay::new(tree, &config).unwrap();
//!
//! let stats = selfplay.train(499).unwrap();
//! println!("value {:?}, gap {:?}", stats.average_utility, stats.nash_gap);
//! ```
//!
//! # Theory
//!
//! **Counterfactual value**: the value of an action at a decision point,
//! weighted by the probability that the other players and chance reach it.
//!
//! **Regret**: the difference between the value of an action and the value
//! of the current strategy.
//! ```text
//! Regret(a) = Value(a) - Value(current_strategy)
//! ```
//!
//! **Regret Matching**: set strategy proportional to positive regrets.
//! ```text
//! Strategy(a) = max(0, Regret(a)) / sum(max(0, Regret(a')))
//! ```
//!
//! **Convergence**: in a two-player zero-sum game the time-averaged
//! profile converges to a Nash equilibrium, so its gap goes to zero.
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Tammelin, O. "Solving Large Imperfect Information Games Using CFR+" (2014)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in Extensive Games" (2009)

pub mod config;
pub mod descriptor;
pub mod error;
pub mod mccfr;
pub mod minimizer;
pub mod selfplay;
pub mod solver;
pub mod storage;
pub mod trace;
pub mod tree;
pub mod treeplex;

// Re-export main types for convenient access
pub use config::{
    ConfigError, IterationPoint, MinimizerKind, SelfPlayStats, SolverConfig, CONSISTENCY_TOLERANCE,
};
pub use descriptor::{GameDescriptor, History, InfoSet, NodeDescriptor, Player, ROOT};
pub use error::{BuildError, EvalError};
pub use mccfr::{Mccfr, OutcomeSampling};
pub use minimizer::RegretMinimizer;
pub use selfplay::{nash_gap, SelfPlay};
pub use solver::CfrSolver;
pub use storage::SolverState;
pub use trace::{Trace, TraceSink};
pub use tree::{GameNode, GameTree, Profile};
pub use treeplex::{BestResponse, Convention, Treeplex, TreeplexNode};
