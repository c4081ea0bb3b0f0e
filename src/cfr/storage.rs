//! Checkpoints of learner state.
//!
//! A [`SolverState`] stores, per decision point, the accumulated regret and
//! the last produced distribution of its regret minimizer, plus the
//! accumulated average policy for learners that keep one. Decision points
//! are keyed by info-set name so a checkpoint survives rebuilding the tree
//! from the same descriptor.

use std::fs;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::cfr::config::ConfigError;
use crate::cfr::descriptor::Player;
use crate::cfr::error::EvalError;
use crate::cfr::minimizer::RegretMinimizer;

/// Saved state of one regret minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerState {
    /// Accumulated regret per action.
    pub regrets: Vec<f64>,
    /// Last produced distribution, if any.
    pub previous: Option<Vec<f64>>,
    /// Unnormalized average policy, for learners that accumulate one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<Vec<f64>>,
}

impl MinimizerState {
    /// Snapshot a learner.
    pub fn capture(minimizer: &dyn RegretMinimizer) -> Self {
        Self {
            regrets: minimizer.regrets().to_vec(),
            previous: minimizer.previous().map(<[f64]>::to_vec),
            average: None,
        }
    }

    /// Attach an accumulated average policy.
    pub fn with_average(mut self, average: &[f64]) -> Self {
        self.average = Some(average.to_vec());
        self
    }
}

/// Serializable learner state for checkpointing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverState {
    /// Player the learner belongs to. Learners over all players store the
    /// player names joined by commas.
    pub player: Player,
    /// Number of completed `improve` calls.
    pub iteration: u64,
    /// Minimizer state per info-set name.
    pub minimizers: FxHashMap<String, MinimizerState>,
}

impl SolverState {
    /// Create an empty state.
    pub fn new(player: &str, iteration: u64) -> Self {
        Self {
            player: player.to_string(),
            iteration,
            minimizers: FxHashMap::default(),
        }
    }

    /// Load a checkpoint from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Write the checkpoint to a JSON file.
    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path.as_ref(), json).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Overwrite `minimizer` with the saved state of `info_set`.
    ///
    /// # Errors
    /// Fails with [`EvalError::StateMismatch`] when the info set is absent
    /// from the checkpoint or its vectors do not have one entry per action.
    pub fn restore_into(
        &self,
        info_set: &str,
        minimizer: &mut dyn RegretMinimizer,
    ) -> Result<(), EvalError> {
        let mismatch = || EvalError::StateMismatch {
            info_set: info_set.to_string(),
        };
        let saved = self.minimizers.get(info_set).ok_or_else(mismatch)?;
        let n = minimizer.num_actions();
        if saved.regrets.len() != n || saved.previous.as_ref().map_or(false, |p| p.len() != n) {
            return Err(mismatch());
        }
        minimizer.restore(saved.regrets.clone(), saved.previous.clone());
        Ok(())
    }

    /// Saved average policy of `info_set`.
    ///
    /// # Errors
    /// Fails with [`EvalError::StateMismatch`] when the info set is absent,
    /// has no average, or its average does not have `num_actions` entries.
    pub fn average_of(&self, info_set: &str, num_actions: usize) -> Result<&[f64], EvalError> {
        self.minimizers
            .get(info_set)
            .and_then(|saved| saved.average.as_deref())
            .filter(|average| average.len() == num_actions)
            .ok_or_else(|| EvalError::StateMismatch {
                info_set: info_set.to_string(),
            })
    }

    /// Check that the checkpoint holds no info set outside `expected`.
    ///
    /// # Errors
    /// Fails with [`EvalError::StateMismatch`] naming an unexpected entry.
    pub fn check_covers_only<'a, I>(&self, expected: I) -> Result<(), EvalError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let expected: FxHashSet<&str> = expected.into_iter().collect();
        match self.minimizers.keys().find(|k| !expected.contains(k.as_str())) {
            Some(extra) => Err(EvalError::StateMismatch {
                info_set: extra.clone(),
            }),
            None => Ok(()),
        }
    }
}
