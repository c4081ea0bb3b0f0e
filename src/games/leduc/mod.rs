//! Leduc Hold'em descriptor.
//!
//! ## Game Rules
//!
//! - 6 cards: two suits (`s`, `h`) of Jack, Queen, King
//! - 2 players, each antes 1 chip and receives one private card
//! - Round 1: bets and raises of 2 chips
//! - One public card is turned, then round 2 with bets and raises of 4
//! - At most 2 bets or raises per round; player 1 opens both rounds
//! - At showdown a private card pairing the public card wins, otherwise
//!   the higher rank wins; equal ranks split the pot
//!
//! Actions are `c` (check or call), `r` (bet or raise) and `f` (fold,
//! only when facing a bet). The deal is one chance node over the 30
//! ordered pairs of cards, labelled like `JsQh`; the public card is a
//! chance node labelled with the card.
//!
//! ## Info Sets
//!
//! A player sees the rank of their own card, the rank of the public card
//! and the betting. Names look like `1J:cr` in round 1 and `2Q:cc/K:rc`
//! in round 2. Suits are never observed, so deals that differ only by
//! suit share info sets.

use crate::cfr::descriptor::{chance_child, decision_child, GameDescriptor, ROOT};
use crate::games::InfoSetCollector;

/// Ranks from lowest to highest.
pub const RANKS: [char; 3] = ['J', 'Q', 'K'];

const SUITS: [char; 2] = ['s', 'h'];
const ANTE: f64 = 1.0;
const BET_SIZES: [f64; 2] = [2.0, 4.0];
const MAX_RAISES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Card {
    rank: usize,
    suit: usize,
}

impl Card {
    fn label(&self) -> String {
        format!("{}{}", RANKS[self.rank], SUITS[self.suit])
    }
}

fn deck() -> Vec<Card> {
    (0..RANKS.len())
        .flat_map(|rank| (0..SUITS.len()).map(move |suit| Card { rank, suit }))
        .collect()
}

/// Everything the betting needs to know besides the history string.
#[derive(Debug, Clone)]
struct Hand {
    private: [Card; 2],
    public: Option<Card>,
    contributions: [f64; 2],
    round: usize,
    /// Actions of the finished first round.
    opening: String,
    /// Actions so far in the current round.
    actions: String,
    raises: usize,
}

impl Hand {
    fn to_act(&self) -> usize {
        self.actions.len() % 2
    }

    fn facing_bet(&self) -> bool {
        self.actions.ends_with('r')
    }

    fn info_set(&self) -> String {
        let player = self.to_act();
        let rank = RANKS[self.private[player].rank];
        match self.public {
            None => format!("{}{}:{}", player + 1, rank, self.actions),
            Some(public) => format!(
                "{}{}:{}/{}:{}",
                player + 1,
                rank,
                self.opening,
                RANKS[public.rank],
                self.actions
            ),
        }
    }

    /// Chips won by player 1 at showdown.
    fn showdown(&self) -> f64 {
        let Some(public) = self.public else {
            return 0.0;
        };
        let strength = |card: Card| {
            let pair = usize::from(card.rank == public.rank);
            pair * RANKS.len() + card.rank
        };
        let (first, second) = (strength(self.private[0]), strength(self.private[1]));
        if first > second {
            self.contributions[1]
        } else if first < second {
            -self.contributions[0]
        } else {
            0.0
        }
    }
}

/// Build the Leduc Hold'em descriptor.
pub fn descriptor() -> GameDescriptor {
    let mut game = GameDescriptor::new();
    let mut info_sets = InfoSetCollector::new();
    let deck = deck();

    let deals: Vec<[Card; 2]> = deck
        .iter()
        .flat_map(|&a| deck.iter().filter(move |&&b| b != a).map(move |&b| [a, b]))
        .collect();
    let labels: Vec<String> = deals
        .iter()
        .map(|[a, b]| format!("{}{}", a.label(), b.label()))
        .collect();
    let p = 1.0 / deals.len() as f64;
    let outcomes: Vec<(&str, f64)> = labels.iter().map(|l| (l.as_str(), p)).collect();
    game.add_chance(ROOT, &outcomes);

    for (private, label) in deals.into_iter().zip(&labels) {
        let hand = Hand {
            private,
            public: None,
            contributions: [ANTE, ANTE],
            round: 0,
            opening: String::new(),
            actions: String::new(),
            raises: 0,
        };
        betting(&mut game, &mut info_sets, &deck, &chance_child(ROOT, label), hand);
    }

    info_sets.finish(&mut game);
    game
}

fn betting(
    game: &mut GameDescriptor,
    info_sets: &mut InfoSetCollector,
    deck: &[Card],
    history: &str,
    hand: Hand,
) {
    let player = hand.to_act();
    let label = (player + 1).to_string();
    let actions: &[&str] = if !hand.facing_bet() {
        &["c", "r"]
    } else if hand.raises < MAX_RAISES {
        &["f", "c", "r"]
    } else {
        &["f", "c"]
    };
    game.add_decision(history, &label, actions);
    info_sets.add(hand.info_set(), history);

    for &action in actions {
        let child = decision_child(history, &label, action);
        let mut next = hand.clone();
        next.actions.push_str(action);
        match action {
            "f" => {
                let lost = hand.contributions[player];
                let to_first = if player == 0 { -lost } else { lost };
                game.add_terminal(&child, &[("1", to_first), ("2", -to_first)]);
            }
            "r" => {
                next.contributions[player] =
                    hand.contributions[1 - player] + BET_SIZES[hand.round];
                next.raises += 1;
                betting(game, info_sets, deck, &child, next);
            }
            _ if !hand.facing_bet() && hand.actions.is_empty() => {
                betting(game, info_sets, deck, &child, next);
            }
            _ => {
                next.contributions[player] = hand.contributions[1 - player];
                end_round(game, info_sets, deck, &child, next);
            }
        }
    }
}

fn end_round(
    game: &mut GameDescriptor,
    info_sets: &mut InfoSetCollector,
    deck: &[Card],
    history: &str,
    hand: Hand,
) {
    if hand.round > 0 {
        let to_first = hand.showdown();
        game.add_terminal(history, &[("1", to_first), ("2", -to_first)]);
        return;
    }

    let remaining: Vec<Card> = deck
        .iter()
        .copied()
        .filter(|c| !hand.private.contains(c))
        .collect();
    let labels: Vec<String> = remaining.iter().map(Card::label).collect();
    let p = 1.0 / remaining.len() as f64;
    let outcomes: Vec<(&str, f64)> = labels.iter().map(|l| (l.as_str(), p)).collect();
    game.add_chance(history, &outcomes);

    for (public, label) in remaining.into_iter().zip(&labels) {
        let next = Hand {
            public: Some(public),
            round: 1,
            opening: hand.actions.clone(),
            actions: String::new(),
            raises: 0,
            ..hand.clone()
        };
        betting(game, info_sets, deck, &chance_child(history, label), next);
    }
}
