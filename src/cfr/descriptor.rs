//! Static game description consumed by the solver.
//!
//! A [`GameDescriptor`] is a table keyed by *history*: the string encoding
//! of the path of actions from the root. The root history is `"/"`, and
//! every transition appends one segment:
//!
//! ```text
//! decision:  {history}P{player}:{action}/
//! chance:    {history}C:{action}/
//! ```
//!
//! Descriptors are immutable once handed to [`GameTree::new`](crate::cfr::GameTree::new).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::config::ConfigError;

/// Path of actions from the root, e.g. `/C:JQ/P1:r/`.
pub type History = String;

/// Player name as used in histories and payoff tables.
pub type Player = String;

/// Action label, unique among the actions of one node.
pub type Action = String;

/// History of the root node.
pub const ROOT: &str = "/";

/// History reached by `player` taking `action` at `history`.
pub fn decision_child(history: &str, player: &str, action: &str) -> History {
    format!("{}P{}:{}/", history, player, action)
}

/// History reached by chance producing `action` at `history`.
pub fn chance_child(history: &str, action: &str) -> History {
    format!("{}C:{}/", history, action)
}

/// One entry of the descriptor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDescriptor {
    /// A player chooses among `actions`.
    Decision {
        /// Key of this node.
        history: History,
        /// The acting player.
        player: Player,
        /// Available actions, in a fixed order.
        actions: Vec<Action>,
    },
    /// Nature picks an outcome with the given probability.
    Chance {
        /// Key of this node.
        history: History,
        /// Outcome label and probability, in a fixed order.
        outcomes: Vec<(Action, f64)>,
    },
    /// The game ends with a payoff per player.
    Terminal {
        /// Key of this node.
        history: History,
        /// Payoff per player. Players without an entry receive 0.
        payoffs: BTreeMap<Player, f64>,
    },
}

impl NodeDescriptor {
    /// Key of this node.
    pub fn history(&self) -> &str {
        match self {
            NodeDescriptor::Decision { history, .. }
            | NodeDescriptor::Chance { history, .. }
            | NodeDescriptor::Terminal { history, .. } => history,
        }
    }

    /// Labels of the outgoing transitions, in order.
    pub fn actions(&self) -> Vec<&str> {
        match self {
            NodeDescriptor::Decision { actions, .. } => {
                actions.iter().map(String::as_str).collect()
            }
            NodeDescriptor::Chance { outcomes, .. } => {
                outcomes.iter().map(|(a, _)| a.as_str()).collect()
            }
            NodeDescriptor::Terminal { .. } => Vec::new(),
        }
    }

    /// History reached by taking `action` here, or `None` at a terminal.
    pub fn child_history(&self, action: &str) -> Option<History> {
        match self {
            NodeDescriptor::Decision { history, player, .. } => {
                Some(decision_child(history, player, action))
            }
            NodeDescriptor::Chance { history, .. } => Some(chance_child(history, action)),
            NodeDescriptor::Terminal { .. } => None,
        }
    }

    /// The acting player at a decision node.
    pub fn player(&self) -> Option<&str> {
        match self {
            NodeDescriptor::Decision { player, .. } => Some(player),
            _ => None,
        }
    }

    /// Whether this is a decision node owned by `player`.
    pub fn is_decision_of(&self, player: &str) -> bool {
        self.player() == Some(player)
    }

    /// Terminal payoff for `player`; zero elsewhere.
    pub fn payoff(&self, player: &str) -> f64 {
        match self {
            NodeDescriptor::Terminal { payoffs, .. } => payoffs.get(player).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// A named set of decision histories one player cannot tell apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSet {
    /// Display name.
    pub name: String,
    /// Member histories.
    pub nodes: Vec<History>,
}

/// Complete static description of an extensive-form game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameDescriptor {
    /// All nodes keyed by history.
    pub nodes: FxHashMap<History, NodeDescriptor>,
    /// Information sets, in declaration order.
    pub info_sets: Vec<InfoSet>,
    /// Every player that acts or receives a payoff.
    pub players: BTreeSet<Player>,
}

impl GameDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decision node and register its player.
    pub fn add_decision(&mut self, history: &str, player: &str, actions: &[&str]) -> &mut Self {
        self.players.insert(player.to_string());
        self.insert(NodeDescriptor::Decision {
            history: history.to_string(),
            player: player.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// Add a chance node.
    pub fn add_chance(&mut self, history: &str, outcomes: &[(&str, f64)]) -> &mut Self {
        self.insert(NodeDescriptor::Chance {
            history: history.to_string(),
            outcomes: outcomes.iter().map(|(a, p)| (a.to_string(), *p)).collect(),
        })
    }

    /// Add a terminal node and register every paid player.
    pub fn add_terminal(&mut self, history: &str, payoffs: &[(&str, f64)]) -> &mut Self {
        for (player, _) in payoffs {
            self.players.insert(player.to_string());
        }
        self.insert(NodeDescriptor::Terminal {
            history: history.to_string(),
            payoffs: payoffs.iter().map(|(p, u)| (p.to_string(), *u)).collect(),
        })
    }

    /// Add an info set.
    pub fn add_info_set<S: AsRef<str>>(&mut self, name: &str, members: &[S]) -> &mut Self {
        self.info_sets.push(InfoSet {
            name: name.to_string(),
            nodes: members.iter().map(|m| m.as_ref().to_string()).collect(),
        });
        self
    }

    fn insert(&mut self, node: NodeDescriptor) -> &mut Self {
        self.nodes.insert(node.history().to_string(), node);
        self
    }

    /// Look up a node by history.
    pub fn node(&self, history: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(history)
    }

    /// Load a descriptor from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse a descriptor from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
