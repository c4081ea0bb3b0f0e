//! Benchmarks for CFR solver.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use treeplex_cfr::cfr::{Convention, GameTree, Profile, SelfPlay, SolverConfig, Treeplex};
use treeplex_cfr::games::{kuhn, leduc};

fn kuhn_step_benchmark(c: &mut Criterion) {
    let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());
    let mut selfplay = SelfPlay::new(tree, &SolverConfig::default()).unwrap();

    c.bench_function("kuhn_selfplay_step", |b| {
        b.iter(|| black_box(selfplay.step().unwrap()))
    });
}

fn kuhn_1000_iterations_benchmark(c: &mut Criterion) {
    let tree = Arc::new(GameTree::new(&kuhn::descriptor()).unwrap());

    c.bench_function("kuhn_1000_iterations", |b| {
        b.iter(|| {
            let mut selfplay = SelfPlay::new(tree.clone(), &SolverConfig::default()).unwrap();
            selfplay.train(black_box(999)).unwrap().nash_gap
        })
    });
}

fn leduc_treeplex_benchmark(c: &mut Criterion) {
    let tree = Arc::new(GameTree::new(&leduc::descriptor()).unwrap());

    c.bench_function("leduc_treeplex_build", |b| {
        b.iter(|| Treeplex::new(tree.clone(), black_box("1")).unwrap().len())
    });

    let treeplex = Treeplex::new(tree.clone(), "1").unwrap();
    let uniform: Profile = treeplex
        .others()
        .iter()
        .map(|p| (p.clone(), tree.player_uniform_strategy_behavioral(p)))
        .collect();
    c.bench_function("leduc_best_response", |b| {
        b.iter(|| {
            treeplex
                .best_response(black_box(&uniform), Convention::Behavioral, None)
                .unwrap()
                .value
        })
    });
}

criterion_group!(
    benches,
    kuhn_step_benchmark,
    kuhn_1000_iterations_benchmark,
    leduc_treeplex_benchmark
);
criterion_main!(benches);
