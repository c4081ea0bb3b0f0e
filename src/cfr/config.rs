//! Configuration options for the solvers.
//!
//! This module provides the configuration struct that selects the regret
//! minimizer used at every decision point, the tolerance of the internal
//! consistency checks, and the sampling parameters of the experimental
//! outcome-sampling learner. It also holds the statistics recorded by
//! [`SelfPlay`](crate::cfr::SelfPlay).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cfr::minimizer::{
    MultiplicativeWeightUpdates, RegretMatching, RegretMatchingPlus, RegretMinimizer,
};

/// Absolute tolerance of the best-response consistency check.
pub const CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// Which online learner drives each decision point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MinimizerKind {
    /// Plain regret matching.
    RegretMatching,
    /// Regret matching that discards negative instantaneous regret.
    RegretMatchingPlus,
    /// Softmax over accumulated regret.
    MultiplicativeWeights {
        /// Learning rate, stored but not applied by the update rule.
        learning_rate: f64,
    },
}

impl Default for MinimizerKind {
    fn default() -> Self {
        MinimizerKind::RegretMatchingPlus
    }
}

impl MinimizerKind {
    /// Create a fresh learner over `num_actions` actions.
    pub fn build(&self, num_actions: usize) -> Box<dyn RegretMinimizer> {
        match *self {
            MinimizerKind::RegretMatching => Box::new(RegretMatching::new(num_actions)),
            MinimizerKind::RegretMatchingPlus => Box::new(RegretMatchingPlus::new(num_actions)),
            MinimizerKind::MultiplicativeWeights { learning_rate } => {
                Box::new(MultiplicativeWeightUpdates::new(num_actions, learning_rate))
            }
        }
    }
}

/// Configuration for the solvers.
///
/// # Example
/// ```
/// use treeplex_cfr::cfr::{MinimizerKind, SolverConfig};
///
/// let config = SolverConfig::default();
/// assert_eq!(config.minimizer, MinimizerKind::RegretMatchingPlus);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Learner created for every decision point.
    #[serde(default)]
    pub minimizer: MinimizerKind,

    /// Absolute tolerance for internal consistency checks.
    ///
    /// Used to compare best-response values computed on the treeplex and on
    /// the game tree, and to reject negative best-response improvements.
    /// It is never used as a convergence criterion.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Exploration probability of the outcome-sampling learner.
    ///
    /// The sampler picks the traversing player's actions from
    /// `exploration / n + (1 - exploration) * strategy`.
    #[serde(default = "default_exploration")]
    pub exploration: f64,

    /// Random seed for the outcome-sampling learner.
    ///
    /// If `None`, a random seed is drawn from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_tolerance() -> f64 {
    CONSISTENCY_TOLERANCE
}

fn default_exploration() -> f64 {
    0.6
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            minimizer: MinimizerKind::default(),
            tolerance: default_tolerance(),
            exploration: default_exploration(),
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the learner kind.
    pub fn with_minimizer(mut self, minimizer: MinimizerKind) -> Self {
        self.minimizer = minimizer;
        self
    }

    /// Builder method: set the consistency tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method: set exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.clamp(0.0, 1.0);
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse a config from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }

        if let MinimizerKind::MultiplicativeWeights { learning_rate } = self.minimizer {
            if !(learning_rate > 0.0) {
                return Err(ConfigError::InvalidLearningRate(learning_rate));
            }
        }

        Ok(())
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Exploration probability is out of range [0, 1].
    InvalidExploration(f64),
    /// Tolerance is not finite and strictly positive.
    InvalidTolerance(f64),
    /// Learning rate is not strictly positive.
    InvalidLearningRate(f64),
    /// Reading a file failed.
    IoError(String),
    /// JSON could not be parsed.
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidExploration(val) => {
                write!(f, "Exploration probability {} is out of range [0, 1]", val)
            }
            ConfigError::InvalidTolerance(val) => {
                write!(f, "Tolerance {} must be finite and positive", val)
            }
            ConfigError::InvalidLearningRate(val) => {
                write!(f, "Learning rate {} must be positive", val)
            }
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics tracked during self-play.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfPlayStats {
    /// Total number of strategy iterates produced.
    pub iterations: u64,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Latest time-averaged utility of the reference player.
    pub average_utility: Option<f64>,

    /// Latest Nash-equilibrium gap of the averaged profile.
    pub nash_gap: Option<f64>,

    /// Per-iteration measurements.
    pub history: Vec<IterationPoint>,
}

/// Measurements of the averaged profile after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationPoint {
    /// Number of iterates averaged so far.
    pub iteration: u64,
    /// Time-averaged utility of the reference player.
    pub average_utility: f64,
    /// Nash-equilibrium gap of the averaged profile.
    pub nash_gap: f64,
}

impl SelfPlayStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }

    /// Record the measurements of one iteration.
    pub fn record(&mut self, point: IterationPoint) {
        self.iterations = point.iteration;
        self.average_utility = Some(point.average_utility);
        self.nash_gap = Some(point.nash_gap);
        self.history.push(point);
    }
}
