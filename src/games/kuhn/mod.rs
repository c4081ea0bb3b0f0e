//! Kuhn Poker descriptor for CFR validation.
//!
//! Kuhn Poker is a simplified poker game used to validate CFR implementations
//! because its equilibria are known in closed form.
//!
//! ## Game Rules
//!
//! - 3 cards: Jack, Queen, King
//! - 2 players, each antes 1 chip
//! - Each player receives 1 card, dealt by one chance node over the 6
//!   ordered deals
//! - Player 1 acts first: check (`c`) or bet (`r`, 1 chip)
//! - Player 2 responds; facing a bet, the actions are fold (`f`) or call (`c`)
//! - Higher card wins at showdown
//!
//! ## Game Tree
//!
//! ```text
//! C:{deal}
//! ├── P1:c
//! │   └── P2
//! │       ├── c → Showdown (pot = 2)
//! │       └── r
//! │           └── P1
//! │               ├── f → P2 wins (pot = 3)
//! │               └── c → Showdown (pot = 4)
//! └── P1:r
//!     └── P2
//!         ├── f → P1 wins (pot = 3)
//!         └── c → Showdown (pot = 4)
//! ```
//!
//! ## Info Sets
//!
//! Named by player, own card and the betting so far: `1J`, `2Qc`, `1Kcr`,
//! `2Jr`.
//!
//! ## Known Nash Equilibrium
//!
//! - **Player 1 with Jack**: Bet with probability α ≤ 1/3
//! - **Player 1 with Queen**: Always check, call a bet with probability α + 1/3
//! - **Player 1 with King**: Bet with probability 3α
//! - **Player 2 facing Bet with Jack**: Always Fold
//! - **Player 2 facing Bet with Queen**: Call with probability 1/3
//! - **Player 2 facing Bet with King**: Always Call
//!
//! **Expected Value**: Player 1 EV = -1/18 ≈ -0.0556

use crate::cfr::descriptor::{chance_child, decision_child, GameDescriptor, ROOT};
use crate::games::InfoSetCollector;

/// Cards from lowest to highest.
pub const CARDS: [char; 3] = ['J', 'Q', 'K'];

/// Value of the game for player 1 at every equilibrium.
pub const GAME_VALUE: f64 = -1.0 / 18.0;

/// Build the Kuhn Poker descriptor.
pub fn descriptor() -> GameDescriptor {
    let mut game = GameDescriptor::new();
    let mut info_sets = InfoSetCollector::new();

    let deals: Vec<(usize, usize)> = (0..CARDS.len())
        .flat_map(|a| (0..CARDS.len()).filter(move |&b| b != a).map(move |b| (a, b)))
        .collect();
    let labels: Vec<String> = deals
        .iter()
        .map(|&(a, b)| format!("{}{}", CARDS[a], CARDS[b]))
        .collect();
    let p = 1.0 / deals.len() as f64;
    let outcomes: Vec<(&str, f64)> = labels.iter().map(|l| (l.as_str(), p)).collect();
    game.add_chance(ROOT, &outcomes);

    for (&(a, b), label) in deals.iter().zip(&labels) {
        let (mine, theirs) = (CARDS[a], CARDS[b]);
        // showdown winnings per chip in the pot, from player 1's side
        let w = if a > b { 1.0 } else { -1.0 };
        let dealt = chance_child(ROOT, label);

        game.add_decision(&dealt, "1", &["c", "r"]);
        info_sets.add(format!("1{}", mine), &dealt);

        let checked = decision_child(&dealt, "1", "c");
        game.add_decision(&checked, "2", &["c", "r"]);
        info_sets.add(format!("2{}c", theirs), &checked);
        game.add_terminal(&decision_child(&checked, "2", "c"), &payoffs(w));

        let check_raise = decision_child(&checked, "2", "r");
        game.add_decision(&check_raise, "1", &["f", "c"]);
        info_sets.add(format!("1{}cr", mine), &check_raise);
        game.add_terminal(&decision_child(&check_raise, "1", "f"), &payoffs(-1.0));
        game.add_terminal(&decision_child(&check_raise, "1", "c"), &payoffs(2.0 * w));

        let bet = decision_child(&dealt, "1", "r");
        game.add_decision(&bet, "2", &["f", "c"]);
        info_sets.add(format!("2{}r", theirs), &bet);
        game.add_terminal(&decision_child(&bet, "2", "f"), &payoffs(1.0));
        game.add_terminal(&decision_child(&bet, "2", "c"), &payoffs(2.0 * w));
    }

    info_sets.finish(&mut game);
    game
}

fn payoffs(to_first: f64) -> [(&'static str, f64); 2] {
    [("1", to_first), ("2", -to_first)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cfr::descriptor::NodeDescriptor;
    use crate::cfr::selfplay::nash_gap;
    use crate::cfr::tree::{GameTree, Profile};
    use crate::cfr::treeplex::Treeplex;

    #[test]
    fn test_kuhn_game_tree() {
        let game = descriptor();
        assert_eq!(game.nodes.len(), 55);
        assert_eq!(game.info_sets.len(), 12);
        assert_eq!(game.players.len(), 2);

        let tree = GameTree::new(&game).unwrap();
        assert_eq!(tree.len(), 55);
        assert_eq!(tree.node(0).history(), "/");
        assert_eq!(tree.node(1).history(), "/C:JQ/");
        assert_eq!(tree.node(2).history(), "/C:JQ/P1:c/");
    }

    #[test]
    fn test_kuhn_terminal_payoffs() {
        let game = descriptor();
        let payoff = |history: &str| game.node(history).unwrap().payoff("1");

        // check-check: higher card wins the ante
        assert_eq!(payoff("/C:KJ/P1:c/P2:c/"), 1.0);
        assert_eq!(payoff("/C:JK/P1:c/P2:c/"), -1.0);
        // bet-fold: bettor wins the ante
        assert_eq!(payoff("/C:JK/P1:r/P2:f/"), 1.0);
        // check-bet-fold: player 2 wins the ante
        assert_eq!(payoff("/C:KQ/P1:c/P2:r/P1:f/"), -1.0);
        // bet-call: showdown for 2
        assert_eq!(payoff("/C:QJ/P1:r/P2:c/"), 2.0);
        assert_eq!(payoff("/C:QK/P1:c/P2:r/P1:c/"), -2.0);

        for node in game.nodes.values() {
            if let NodeDescriptor::Terminal { .. } = node {
                assert_eq!(node.payoff("1") + node.payoff("2"), 0.0);
            }
        }
    }

    #[test]
    fn test_kuhn_info_states() {
        let game = descriptor();
        let members = |name: &str| {
            let mut nodes = game
                .info_sets
                .iter()
                .find(|i| i.name == name)
                .unwrap()
                .nodes
                .clone();
            nodes.sort();
            nodes
        };
        // player 1 with a jack cannot tell a queen from a king
        assert_eq!(members("1J"), vec!["/C:JK/", "/C:JQ/"]);
        assert_eq!(members("2Kr"), vec!["/C:JK/P1:r/", "/C:QK/P1:r/"]);
    }

    #[test]
    fn test_known_equilibrium() {
        let tree = Arc::new(GameTree::new(&descriptor()).unwrap());
        // probability of each action per info set, with alpha = 0
        let equilibrium = [
            ("1J", [1.0, 0.0]),
            ("1Jcr", [1.0, 0.0]),
            ("1Q", [1.0, 0.0]),
            ("1Qcr", [2.0 / 3.0, 1.0 / 3.0]),
            ("1K", [1.0, 0.0]),
            ("1Kcr", [0.0, 1.0]),
            ("2Jc", [2.0 / 3.0, 1.0 / 3.0]),
            ("2Jr", [1.0, 0.0]),
            ("2Qc", [1.0, 0.0]),
            ("2Qr", [2.0 / 3.0, 1.0 / 3.0]),
            ("2Kc", [0.0, 1.0]),
            ("2Kr", [0.0, 1.0]),
        ];

        let mut profile = Profile::new();
        for player in tree.players() {
            profile.insert(player.clone(), vec![1.0; tree.len()]);
        }
        for (name, probabilities) in equilibrium {
            let info_set = tree.info_sets().iter().find(|i| i.name == name).unwrap();
            for history in &info_set.nodes {
                let node = tree.node(tree.index_of(history).unwrap());
                let player = node.descriptor.player().unwrap().to_string();
                let strategy = profile.get_mut(&player).unwrap();
                for (child, p) in node.child_indices().zip(probabilities) {
                    strategy[child] = p;
                }
            }
        }

        let value = tree.eval_utility(&profile, "1").unwrap();
        assert!((value - GAME_VALUE).abs() < 1e-12);

        let treeplexes: Vec<Arc<Treeplex>> = tree
            .players()
            .iter()
            .map(|p| Arc::new(Treeplex::new(tree.clone(), p).unwrap()))
            .collect();
        let reaches: Profile = profile
            .iter()
            .map(|(p, s)| (p.clone(), tree.behavioral_to_reach_probability(s)))
            .collect();
        assert!(nash_gap(&treeplexes, &reaches).unwrap().abs() < 1e-9);
    }
}
