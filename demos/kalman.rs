use clap::Parser;

use symdiff_rs::eval::EvalContext;
use symdiff_rs::graph::Graph;
use symdiff_rs::kalman::{KalmanFilter, KalmanParameters};
use symdiff_rs::newton::Newton;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of synthetic observations.
    #[arg(value_name = "INT", default_value = "40")]
    observations: usize,

    /// Number of Newton steps on the likelihood gradient.
    #[clap(long, value_name = "INT", default_value = "10")]
    iterations: usize,

    /// Enable debug logging.
    #[clap(long)]
    debug: bool,
}

/// Observations of y = 2 + input * x with x following x' = 0.3 + 0.6 x, plus deterministic noise.
fn synthetic(n: usize) -> Vec<(f64, f64)> {
    let mut state: f64 = 0.5;
    (0..n)
        .map(|t| {
            let t = t as f64;
            let input = 1.0 + 0.5 * (t * 0.7).sin();
            state = 0.3 + 0.6 * state + 0.2 * (t * 1.3).cos();
            (input, 2.0 + input * state + 0.1 * (t * 2.9).sin())
        })
        .collect()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.debug {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let time_total = std::time::Instant::now();

    let mut graph = Graph::<f64>::default();
    let mut filter = KalmanFilter::new(
        &graph,
        KalmanParameters {
            drift: 0.2,
            tension: 0.5,
            offset: 1.5,
            log_measure_variance: -1.0,
            log_state_variance: -1.0,
        },
        0.5,
        1.0,
    );
    filter.filter_all(&graph, synthetic(args.observations));

    let likelihood = filter.likelihood();
    println!(
        "likelihood: {} distinct nodes, {} as a tree",
        graph.size(likelihood),
        graph.tree_size(likelihood)
    );

    let time_diff = std::time::Instant::now();
    let gradient = filter.gradient(&graph);
    let newton = Newton::new(&graph, gradient, filter.parameters());
    println!(
        "gradient and hessian built in {:.3}s, graph = {:?}",
        time_diff.elapsed().as_secs_f64(),
        graph
    );

    for step in 1..=args.iterations {
        newton.step(&mut graph)?;
        let mut ctx = EvalContext::new(&graph);
        let value = ctx.evaluate(likelihood);
        log::info!(
            "step {}: likelihood = {:.6} ({} evaluations, {} cache hits)",
            step,
            value,
            ctx.evaluate_count(),
            ctx.cache_hit_count()
        );
    }

    let names = ["drift", "tension", "offset", "log_measure_variance", "log_state_variance"];
    for (name, p) in names.iter().zip(filter.parameters()) {
        println!("{} = {}", name, graph.parameter_value(p));
    }

    println!("Total time: {:.3}s", time_total.elapsed().as_secs_f64());

    Ok(())
}
