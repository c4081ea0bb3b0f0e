//! Counterfactual Regret Minimization over a treeplex.
//!
//! One [`RegretMinimizer`] drives every decision point of the player's
//! treeplex. An iteration is a pair of calls:
//!
//! - [`CfrSolver::next_strategy_behavioral`] asks every learner for its next
//!   distribution, scatters it into a treeplex-indexed vector, remembers it
//!   and maps it to a behavioral strategy over game nodes;
//! - [`CfrSolver::improve`] takes the other players' behavioral strategies,
//!   computes the counterfactual utility of each treeplex node and runs one
//!   leaf-to-root pass, feeding every learner the values of its children.
//!
//! ```text
//! decision:     value = own + sum(last[c] * value[c])   -> learner(value[c]...)
//! observation:  value = own + sum(value[c])
//! ```
//!
//! The time-averaged reach probabilities of the produced strategies converge
//! to a Nash equilibrium in two-player zero-sum games. Averaging is left to
//! the caller, see [`SelfPlay`](crate::cfr::SelfPlay).

use std::sync::Arc;

use crate::cfr::config::SolverConfig;
use crate::cfr::error::EvalError;
use crate::cfr::minimizer::RegretMinimizer;
use crate::cfr::storage::{MinimizerState, SolverState};
use crate::cfr::trace::{emit, Trace, TraceSink};
use crate::cfr::tree::Profile;
use crate::cfr::treeplex::{Treeplex, TreeplexNode};

/// The CFR learner of one player.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use treeplex_cfr::cfr::{CfrSolver, GameTree, SolverConfig, Treeplex};
/// use treeplex_cfr::games::kuhn;
///
/// let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
/// let treeplex = Arc::new(Treeplex::new(tree.clone(), "1").unwrap());
/// let mut solver = CfrSolver::new(treeplex, &SolverConfig::default());
///
/// let strategy = solver.next_strategy_behavioral();
/// assert_eq!(strategy.len(), tree.len());
/// ```
#[derive(Debug)]
pub struct CfrSolver {
    treeplex: Arc<Treeplex>,
    /// Learner per treeplex node; `Some` exactly at decision points.
    minimizers: Vec<Option<Box<dyn RegretMinimizer>>>,
    last_strategy: Option<Vec<f64>>,
    iteration: u64,
}

impl CfrSolver {
    /// Create a solver with one fresh learner per decision point.
    pub fn new(treeplex: Arc<Treeplex>, config: &SolverConfig) -> Self {
        let minimizers = treeplex
            .nodes()
            .iter()
            .map(|node| match node {
                TreeplexNode::Decision { actions, .. } => {
                    Some(config.minimizer.build(actions.len()))
                }
                TreeplexNode::Observation { .. } => None,
            })
            .collect();
        Self {
            treeplex,
            minimizers,
            last_strategy: None,
            iteration: 0,
        }
    }

    /// The treeplex this solver plays on.
    pub fn treeplex(&self) -> &Arc<Treeplex> {
        &self.treeplex
    }

    /// The player this solver plays for.
    pub fn player(&self) -> &str {
        self.treeplex.player()
    }

    /// Number of completed `improve` calls.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// The last produced strategy over treeplex nodes.
    pub fn last_strategy(&self) -> Option<&[f64]> {
        self.last_strategy.as_deref()
    }

    /// Produce the next strategy as a behavioral strategy over game nodes.
    pub fn next_strategy_behavioral(&mut self) -> Vec<f64> {
        let mut strategy = self.treeplex.empty_prop();
        for (node, minimizer) in self.treeplex.nodes().iter().zip(self.minimizers.iter_mut()) {
            if let (TreeplexNode::Decision { children, .. }, Some(minimizer)) = (node, minimizer) {
                for (&child, p) in children.iter().zip(minimizer.next_strategy()) {
                    strategy[child] = p;
                }
            }
        }
        let behavioral = self.treeplex.to_behavioral(&strategy);
        self.last_strategy = Some(strategy);
        behavioral
    }

    /// Feed back the other players' behavioral strategies.
    ///
    /// # Errors
    /// Fails with [`EvalError::NoStrategy`] before the first
    /// [`CfrSolver::next_strategy_behavioral`], or if `others` does not hold
    /// one node-indexed vector per other player.
    pub fn improve(
        &mut self,
        others: &Profile,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), EvalError> {
        let mut trace = trace;
        let last = self.last_strategy.as_ref().ok_or(EvalError::NoStrategy)?;
        let mut value = self.treeplex.utility_for_strats(others)?;

        for (index, node) in self.treeplex.nodes().iter().enumerate().rev() {
            match node {
                TreeplexNode::Decision { children, .. } => {
                    let feedback: Vec<f64> = children.iter().map(|&c| value[c]).collect();
                    value[index] += children.iter().map(|&c| last[c] * value[c]).sum::<f64>();
                    if let Some(minimizer) = self.minimizers[index].as_mut() {
                        minimizer.observe_utility(&feedback);
                    }
                }
                TreeplexNode::Observation { children, .. } => {
                    value[index] += children.iter().map(|&c| value[c]).sum::<f64>();
                }
            }
            emit(&mut trace, Trace::Treeplex { node: index, value: value[index] });
        }

        self.iteration += 1;
        Ok(())
    }

    /// Export learner state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        let mut state = SolverState::new(self.player(), self.iteration);
        for (node, minimizer) in self.treeplex.nodes().iter().zip(&self.minimizers) {
            if let (TreeplexNode::Decision { info_set, .. }, Some(minimizer)) = (node, minimizer) {
                let name = self.treeplex.tree().info_sets()[*info_set].name.clone();
                state
                    .minimizers
                    .insert(name, MinimizerState::capture(&**minimizer));
            }
        }
        state
    }

    /// Import learner state from a checkpoint.
    ///
    /// The last strategy is cleared; call
    /// [`CfrSolver::next_strategy_behavioral`] before the next `improve`.
    ///
    /// # Errors
    /// Fails if the checkpoint belongs to another player, does not cover
    /// every decision point with correctly sized vectors, or holds info sets
    /// the player does not own. The solver is left unchanged on error.
    pub fn import_state(&mut self, state: &SolverState) -> Result<(), EvalError> {
        if state.player != self.player() {
            return Err(EvalError::PlayerMismatch {
                expected: vec![self.player().to_string()],
                actual: vec![state.player.clone()],
            });
        }
        let names = self.treeplex.nodes().iter().filter_map(|node| match node {
            TreeplexNode::Decision { info_set, .. } => {
                Some(self.treeplex.tree().info_sets()[*info_set].name.as_str())
            }
            TreeplexNode::Observation { .. } => None,
        });
        state.check_covers_only(names)?;
        let mut restored = self.fresh_minimizers_like();
        for (node, minimizer) in self.treeplex.nodes().iter().zip(restored.iter_mut()) {
            if let (TreeplexNode::Decision { info_set, .. }, Some(minimizer)) = (node, minimizer) {
                let name = &self.treeplex.tree().info_sets()[*info_set].name;
                state.restore_into(name, &mut **minimizer)?;
            }
        }
        self.minimizers = restored;
        self.iteration = state.iteration;
        self.last_strategy = None;
        Ok(())
    }

    fn fresh_minimizers_like(&self) -> Vec<Option<Box<dyn RegretMinimizer>>> {
        // restoring overwrites all state, only the learner kind matters
        self.minimizers
            .iter()
            .map(|m| m.as_ref().map(|m| m.boxed_clone()))
            .collect()
    }
}
