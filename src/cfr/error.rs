//! Error types for tree construction and evaluation.
//!
//! Construction faults are fatal: a [`GameTree`](crate::cfr::GameTree) or
//! [`Treeplex`](crate::cfr::Treeplex) is built once and reused for many
//! iterations, so a partially built structure is never returned.

use std::fmt;

use crate::cfr::config::ConfigError;

/// Errors raised while expanding a descriptor into a game tree or treeplex.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The descriptor has no `"/"` entry.
    MissingRoot,
    /// The descriptor names no players.
    NoPlayers,
    /// An action leads to a history that the descriptor does not contain.
    MissingChild {
        /// History of the node owning the action.
        parent: String,
        /// The action taken.
        action: String,
        /// The child history that was expected.
        child: String,
    },
    /// An info set lists a history that the descriptor does not contain.
    UnknownMember {
        /// Info set name.
        info_set: String,
        /// The unresolved history.
        history: String,
    },
    /// An info set lists a history that is not a decision node.
    NotDecision {
        /// Info set name.
        info_set: String,
        /// The offending history.
        history: String,
    },
    /// A history appears in more than one info set.
    DuplicateMember {
        /// The offending history.
        history: String,
    },
    /// A decision node of the treeplex player belongs to no info set.
    Unassigned {
        /// History of the decision node.
        history: String,
    },
    /// A group of decision nodes does not form a single info set.
    MixedInfoSets {
        /// Histories of the group.
        histories: Vec<String>,
    },
    /// Members of one info set disagree on the action set.
    ActionsNotEqual {
        /// Info set name.
        info_set: String,
        /// History whose actions differ from the first member's.
        history: String,
    },
    /// One info set was reached through several treeplex decision points,
    /// which only happens in games without perfect recall.
    SplitInfoSet {
        /// Info set name.
        info_set: String,
    },
    /// The solver configuration is invalid.
    InvalidConfig(ConfigError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingRoot => write!(f, "descriptor has no root history \"/\""),
            BuildError::NoPlayers => write!(f, "descriptor declares no players"),
            BuildError::MissingChild { parent, action, child } => write!(
                f,
                "action {} at {} leads to {}, which is not in the descriptor",
                action, parent, child
            ),
            BuildError::UnknownMember { info_set, history } => {
                write!(f, "info set {} lists unknown history {}", info_set, history)
            }
            BuildError::NotDecision { info_set, history } => write!(
                f,
                "info set {} lists {}, which is not a decision node",
                info_set, history
            ),
            BuildError::DuplicateMember { history } => {
                write!(f, "history {} belongs to more than one info set", history)
            }
            BuildError::Unassigned { history } => {
                write!(f, "decision node {} belongs to no info set", history)
            }
            BuildError::MixedInfoSets { histories } => write!(
                f,
                "decision nodes {:?} do not form a single info set",
                histories
            ),
            BuildError::ActionsNotEqual { info_set, history } => write!(
                f,
                "info set {}: actions at {} differ from the other members",
                info_set, history
            ),
            BuildError::SplitInfoSet { info_set } => write!(
                f,
                "info set {} is reached through several decision points (imperfect recall)",
                info_set
            ),
            BuildError::InvalidConfig(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<ConfigError> for BuildError {
    fn from(e: ConfigError) -> Self {
        BuildError::InvalidConfig(e)
    }
}

/// Errors raised while evaluating strategies against a built tree.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The supplied vectors do not cover exactly the expected players.
    PlayerMismatch {
        /// Players that were required.
        expected: Vec<String>,
        /// Players that were supplied.
        actual: Vec<String>,
    },
    /// A node-indexed vector has the wrong length.
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// The treeplex best-response value disagrees with the game-tree evaluation.
    Inconsistent {
        /// Root value computed on the treeplex.
        treeplex: f64,
        /// Value computed on the game tree.
        tree: f64,
    },
    /// A best response scored below the strategy it should improve on.
    NegativeImprovement {
        /// Player whose best response was evaluated.
        player: String,
        /// The (negative) improvement.
        improvement: f64,
    },
    /// `improve` was called before any strategy was produced.
    NoStrategy,
    /// A checkpoint does not match the decision points of the learner.
    StateMismatch {
        /// Info set that is missing, not expected, or has the wrong size.
        info_set: String,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::PlayerMismatch { expected, actual } => write!(
                f,
                "expected vectors for players {:?}, got {:?}",
                expected, actual
            ),
            EvalError::LengthMismatch { expected, actual } => write!(
                f,
                "vector has {} entries, tree has {} nodes",
                actual, expected
            ),
            EvalError::Inconsistent { treeplex, tree } => write!(
                f,
                "best response value {} disagrees with tree evaluation {}",
                treeplex, tree
            ),
            EvalError::NegativeImprovement { player, improvement } => write!(
                f,
                "best response of player {} loses {} against the average strategy",
                player, -improvement
            ),
            EvalError::NoStrategy => write!(f, "improve called before next_strategy_behavioral"),
            EvalError::StateMismatch { info_set } => {
                write!(f, "checkpoint does not match info set {}", info_set)
            }
        }
    }
}

impl std::error::Error for EvalError {}
