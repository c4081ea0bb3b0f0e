//! Rock-Paper-Scissors as an extensive-form game.
//!
//! Player 1 moves at the root; player 2 moves without seeing that choice,
//! so all three of player 2's nodes form one info set. Actions are `r`,
//! `p` and `s`. The winner takes one unit.
//!
//! Uniform play is the unique equilibrium of the symmetric game. The
//! [`weighted`] variant scales each winning throw's payoff, which moves
//! the equilibrium away from uniform.

use crate::cfr::descriptor::{decision_child, GameDescriptor, ROOT};

/// Throws in declaration order.
pub const ACTIONS: [&str; 3] = ["r", "p", "s"];

/// Build the symmetric game.
pub fn descriptor() -> GameDescriptor {
    weighted([1.0, 1.0, 1.0])
}

/// Build a variant where winning with `ACTIONS[i]` pays `weights[i]`.
pub fn weighted(weights: [f64; 3]) -> GameDescriptor {
    let mut game = GameDescriptor::new();
    game.add_decision(ROOT, "1", &ACTIONS);

    let mut second = Vec::new();
    for (i, first) in ACTIONS.iter().enumerate() {
        let history = decision_child(ROOT, "1", first);
        game.add_decision(&history, "2", &ACTIONS);
        for (j, reply) in ACTIONS.iter().enumerate() {
            // i beats j when i is one step after j
            let to_first = if i == j {
                0.0
            } else if i == (j + 1) % 3 {
                weights[i]
            } else {
                -weights[j]
            };
            game.add_terminal(
                &decision_child(&history, "2", reply),
                &[("1", to_first), ("2", -to_first)],
            );
        }
        second.push(history);
    }

    game.add_info_set("1", &[ROOT]).add_info_set("2", &second);
    game
}
