//! Debug script for Kuhn Poker CFR

use std::sync::Arc;

use treeplex_cfr::cfr::{GameTree, SelfPlay, SolverConfig, Treeplex};
use treeplex_cfr::games::kuhn;

fn main() {
    let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());

    // Print player 1's treeplex
    let treeplex = Treeplex::new(tree.clone(), "1").unwrap();
    println!("Treeplex of player 1:");
    println!("{}", treeplex);

    let mut selfplay = SelfPlay::new(tree.clone(), &SolverConfig::default()).unwrap();

    // Run iterations and print progress
    for i in 1..=10 {
        selfplay.train(1_000).unwrap();

        println!("After {} iterates:", selfplay.iterates());
        println!("  Value for P1: {:.5}", selfplay.average_utility("1").unwrap());
        println!("  Nash gap:     {:.5}", selfplay.nash_gap().unwrap());
        if i < 10 {
            println!();
        }
    }

    // Average behavior at each info set, recovered from reach probabilities
    println!("\nAverage strategies:");
    for info_set in tree.info_sets() {
        let Some(history) = info_set.nodes.first() else {
            continue;
        };
        let Some(index) = tree.index_of(history) else {
            continue;
        };
        let node = tree.node(index);
        let Some(player) = node.descriptor.player() else {
            continue;
        };
        let reach = &selfplay.average()[player];
        let total: f64 = info_set
            .nodes
            .iter()
            .filter_map(|h| tree.index_of(h))
            .map(|n| reach[n])
            .sum();
        let line: Vec<String> = node
            .children
            .iter()
            .map(|(action, _)| {
                let mass: f64 = info_set
                    .nodes
                    .iter()
                    .filter_map(|h| tree.index_of(h))
                    .filter_map(|n| tree.node(n).child(action))
                    .map(|c| reach[c])
                    .sum();
                format!("{}={:.3}", action, if total > 0.0 { mass / total } else { 0.0 })
            })
            .collect();
        println!("  {:<5} {}", info_set.name, line.join(", "));
    }

    // Expected Nash equilibrium (alpha in [0, 1/3]):
    println!("\nExpected Nash Equilibrium:");
    println!("  P1 Jack:  c=1-a, r=a");
    println!("  P1 Queen: c=1.000, r=0.000; facing a bet, c=a+1/3");
    println!("  P1 King:  c=1-3a, r=3a");
    println!("  P2 Jack vs bet:  f=1.000, c=0.000");
    println!("  P2 Queen vs bet: f=0.667, c=0.333");
    println!("  P2 King vs bet:  f=0.000, c=1.000");
    println!("  Value for P1: {:.5}", kuhn::GAME_VALUE);
}
