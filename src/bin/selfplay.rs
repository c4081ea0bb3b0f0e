//! CFR self-play binary.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --game <NAME>          Built-in game: kuhn, leduc, rps (default: kuhn)
//!   --descriptor <FILE>    Game descriptor JSON file (overrides --game)
//!   --config <FILE>        Solver configuration JSON file (optional)
//!   --minimizer <KIND>     rm, rm+ or mwu (overrides the config)
//!   --iterations <N>       Number of self-play steps (default: 1000)
//!   --interval <N>         Report every N steps (default: iterations / 10)
//!   --outcome-sampling     Train with sampled MCCFR instead of treeplex CFR
//!   --seed <N>             Random seed for outcome sampling
//!   --output <FILE>        Write statistics as JSON

use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use treeplex_cfr::cfr::{
    nash_gap, GameDescriptor, GameTree, MinimizerKind, OutcomeSampling, Profile, SelfPlay,
    SolverConfig, Treeplex,
};
use treeplex_cfr::games;

struct Args {
    game: String,
    descriptor: Option<String>,
    config: Option<String>,
    minimizer: Option<MinimizerKind>,
    iterations: u64,
    interval: Option<u64>,
    outcome_sampling: bool,
    seed: Option<u64>,
    output: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(args) = parse_args() else {
        return;
    };

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn parse_args() -> Option<Args> {
    let raw: Vec<String> = env::args().collect();
    let mut args = Args {
        game: "kuhn".to_string(),
        descriptor: None,
        config: None,
        minimizer: None,
        iterations: 1000,
        interval: None,
        outcome_sampling: false,
        seed: None,
        output: None,
    };

    let mut i = 1;
    while i < raw.len() {
        let value = raw.get(i + 1).cloned();
        match raw[i].as_str() {
            "--game" | "-g" => {
                args.game = value.unwrap_or_default();
                i += 1;
            }
            "--descriptor" | "-d" => {
                args.descriptor = value;
                i += 1;
            }
            "--config" | "-c" => {
                args.config = value;
                i += 1;
            }
            "--minimizer" | "-m" => {
                args.minimizer = match value.as_deref() {
                    Some("rm") => Some(MinimizerKind::RegretMatching),
                    Some("rm+") => Some(MinimizerKind::RegretMatchingPlus),
                    Some("mwu") => {
                        Some(MinimizerKind::MultiplicativeWeights { learning_rate: 1.0 })
                    }
                    other => {
                        eprintln!("Unknown minimizer: {}", other.unwrap_or(""));
                        print_help();
                        return None;
                    }
                };
                i += 1;
            }
            "--iterations" | "-i" => {
                args.iterations = value.and_then(|v| v.parse().ok()).unwrap_or(args.iterations);
                i += 1;
            }
            "--interval" => {
                args.interval = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--outcome-sampling" => {
                args.outcome_sampling = true;
            }
            "--seed" | "-s" => {
                args.seed = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--output" | "-o" => {
                args.output = value;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return None;
            }
            _ => {
                eprintln!("Unknown argument: {}", raw[i]);
                print_help();
                return None;
            }
        }
        i += 1;
    }
    Some(args)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let descriptor = match &args.descriptor {
        Some(path) => {
            println!("Loading game from: {}", path);
            GameDescriptor::from_json_file(path)?
        }
        None => games::by_name(&args.game)
            .ok_or_else(|| format!("unknown game '{}'", args.game))?,
    };

    let mut config = match &args.config {
        Some(path) => SolverConfig::from_json_file(path)?,
        None => SolverConfig::default(),
    };
    if let Some(minimizer) = args.minimizer {
        config = config.with_minimizer(minimizer);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;

    let tree = Arc::new(GameTree::new(&descriptor)?);

    println!("=================================================");
    println!("  CFR Self-Play");
    println!("=================================================");
    println!("Game nodes: {}", tree.len());
    println!("Players: {:?}", tree.players());
    println!("Info sets: {}", tree.info_sets().len());
    println!("Minimizer: {:?}", config.minimizer);
    println!("Iterations: {}", args.iterations);
    println!();

    if args.outcome_sampling {
        return run_outcome_sampling(tree, &config, &args);
    }

    let mut selfplay = SelfPlay::new(tree, &config)?;
    for treeplex in selfplay.treeplexes() {
        println!("Treeplex of player {}: {} nodes", treeplex.player(), treeplex.len());
    }

    let interval = args.interval.unwrap_or(args.iterations / 10).max(1);
    let progress = progress_bar(args.iterations);
    let start_time = Instant::now();
    let stats = selfplay
        .train_with_callback(args.iterations, interval, |stats| {
            progress.set_position(stats.iterations.saturating_sub(1));
            progress.set_message(format!(
                "utility {:.5} | gap {:.5}",
                stats.average_utility.unwrap_or(0.0),
                stats.nash_gap.unwrap_or(0.0)
            ));
        })?
        .clone();
    progress.finish_and_clear();

    println!("Training complete!");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Iterates averaged: {}", stats.iterations);
    if let Some(utility) = stats.average_utility {
        println!("Average utility of player {}: {:.6}", selfplay.reference_player(), utility);
    }
    if let Some(gap) = stats.nash_gap {
        println!("Nash gap: {:.6}", gap);
    }
    println!("Average speed: {:.0} iterations/second", stats.iterations_per_second);

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&stats)?)?;
        println!("Statistics saved to {}", path);
    }
    Ok(())
}

fn run_outcome_sampling(
    tree: Arc<GameTree>,
    config: &SolverConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sampler = OutcomeSampling::new(tree.clone(), config)?;
    let progress = progress_bar(args.iterations);
    let start_time = Instant::now();
    for _ in 0..args.iterations {
        sampler.run_iteration();
        progress.inc(1);
    }
    progress.finish_and_clear();

    let treeplexes = tree
        .players()
        .iter()
        .map(|p| Treeplex::new(tree.clone(), p).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    let reaches: Profile = sampler
        .average_profile()
        .into_iter()
        .map(|(p, s)| {
            let reach = tree.behavioral_to_reach_probability(&s);
            (p, reach)
        })
        .collect();

    println!("Training complete!");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Nash gap of the average strategies: {:.6}", nash_gap(&treeplexes, &reaches)?);
    Ok(())
}

fn progress_bar(iterations: u64) -> ProgressBar {
    let progress = ProgressBar::new(iterations);
    let style = ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

fn print_help() {
    println!("CFR Self-Play");
    println!();
    println!("Usage: selfplay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -g, --game <NAME>        Built-in game: kuhn, leduc, rps (default: kuhn)");
    println!("  -d, --descriptor <FILE>  Game descriptor JSON file");
    println!("  -c, --config <FILE>      Solver configuration JSON file");
    println!("  -m, --minimizer <KIND>   rm, rm+ or mwu");
    println!("  -i, --iterations <N>     Number of self-play steps (default: 1000)");
    println!("  --interval <N>           Report every N steps");
    println!("  --outcome-sampling       Train with sampled MCCFR");
    println!("  -s, --seed <N>           Random seed for outcome sampling");
    println!("  -o, --output <FILE>      Write statistics as JSON");
    println!("  -h, --help               Show this help");
    println!();
    println!("Examples:");
    println!("  # Solve Kuhn poker for 10k steps");
    println!("  selfplay --game kuhn --iterations 10000");
    println!();
    println!("  # Leduc hold'em with plain regret matching, saving statistics");
    println!("  selfplay --game leduc --minimizer rm -i 500 -o leduc_stats.json");
}
