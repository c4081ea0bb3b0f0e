//! # Treeplex CFR
//!
//! A Counterfactual Regret Minimization (CFR) solver that computes Nash
//! equilibrium strategies of finite extensive-form games with imperfect
//! information.
//!
//! ## Features
//!
//! - **Table-Driven Games**: Any game given as histories, info sets and
//!   payoffs, built in code or loaded from JSON
//! - **Treeplex Learners**: CFR over each player's sequence-form view
//! - **Pluggable Regret Minimizers**: RM, RM+ and multiplicative weights
//! - **MCCFR**: Full-traversal and outcome-sampling variants
//! - **Equilibrium Measurement**: Parallel best responses and Nash gap
//! - **Checkpointing**: Save and resume learner state
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use treeplex_cfr::cfr::{GameTree, SelfPlay, SolverConfig};
//! use treeplex_cfr::games::kuhn;
//!
//! // 1. Describe a game and build its tree
//! let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
//!
//! // 2. Create the self-play driver
//! let mut selfplay = SelfPlay::new(tree, &SolverConfig::default()).unwrap();
//!
//! // 3. Train and read the gap
//! selfplay.train(99).unwrap();
//! assert!(selfplay.nash_gap().unwrap() >= -1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: Game tree, treeplex, learners and measurement
//! - [`games`]: Built-in games (Kuhn Poker, Leduc Hold'em, Rock-Paper-Scissors)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          SelfPlay                               │
//! │  - Strategy averaging     - Nash gap (parallel best responses)  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                 one CfrSolver per player
//!                               ▼
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//!    ┌──────────┐        ┌───────────┐        ┌──────────────┐
//!    │ Treeplex │  ───▶  │ GameTree  │  ◀───  │GameDescriptor│
//!    └──────────┘        └───────────┘        └──────────────┘
//! ```

#![warn(missing_docs)]

/// CFR (Counterfactual Regret Minimization) solver module.
///
/// Game trees, treeplexes, regret minimizers and self-play.
pub mod cfr;

/// Built-in games.
///
/// Descriptors for Kuhn Poker, Leduc Hold'em and Rock-Paper-Scissors.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use cfr::{CfrSolver, GameDescriptor, GameTree, SelfPlay, SolverConfig, Treeplex};
