//! Built-in game descriptors.
//!
//! Each module builds a [`GameDescriptor`] table for a small game with a
//! known solution. They serve as:
//!
//! 1. **Validation**: Kuhn Poker has a value of -1/18 for the first player
//!    at every equilibrium, and uniform play is an equilibrium of
//!    Rock-Paper-Scissors.
//!
//! 2. **Examples**: Demonstrate how to describe a game as histories, info
//!    sets and payoffs.
//!
//! 3. **Benchmarks**: Leduc Hold'em is large enough to time the solver.
//!
//! ## Available Games
//!
//! - [`kuhn`]: Kuhn Poker, 3 cards and one betting round
//! - [`leduc`]: Leduc Hold'em, 6 cards, a public card and two betting rounds
//! - [`rps`]: Rock-Paper-Scissors, one simultaneous move
//!
//! ## Adding New Games
//!
//! 1. Create a new module under `src/games/`
//! 2. Add every node with [`GameDescriptor::add_decision`],
//!    [`GameDescriptor::add_chance`] and [`GameDescriptor::add_terminal`]
//! 3. Group decision nodes into info sets
//! 4. Add tests that check the tree builds and known values
//!
//! Games can also be loaded from JSON with [`GameDescriptor::from_json_file`].

use rustc_hash::FxHashMap;

use crate::cfr::descriptor::{GameDescriptor, History};

pub mod kuhn;
pub mod leduc;
pub mod rps;

/// Collects info-set members while a game is generated and declares the
/// sets in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct InfoSetCollector {
    names: Vec<String>,
    members: FxHashMap<String, Vec<History>>,
}

impl InfoSetCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Put `history` in the info set called `name`.
    pub(crate) fn add(&mut self, name: String, history: &str) {
        let members = self.members.entry(name.clone()).or_insert_with(|| {
            self.names.push(name);
            Vec::new()
        });
        members.push(history.to_string());
    }

    /// Declare every collected info set on `game`.
    pub(crate) fn finish(self, game: &mut GameDescriptor) {
        for name in &self.names {
            if let Some(members) = self.members.get(name) {
                game.add_info_set(name, members);
            }
        }
    }
}

/// Look up a game by name.
pub fn by_name(name: &str) -> Option<GameDescriptor> {
    match name {
        "kuhn" => Some(kuhn::descriptor()),
        "leduc" => Some(leduc::descriptor()),
        "rps" => Some(rps::descriptor()),
        _ => None,
    }
}
