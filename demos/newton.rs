use clap::Parser;

use symdiff_rs::graph::Graph;
use symdiff_rs::newton::Newton;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Maximum number of Newton steps.
    #[arg(value_name = "INT", default_value = "20")]
    iterations: usize,

    /// Stop once every residual is below this value.
    #[clap(long, value_name = "FLOAT", default_value = "1e-12")]
    tolerance: f64,

    /// Initial guess for both parameters.
    #[clap(long, value_name = "FLOAT", default_value = "1.0")]
    start: f64,

    /// Graph size (in bits, so the initial capacity is `2^size` nodes).
    #[clap(long, value_name = "INT", default_value = "10")]
    size: usize,

    /// Enable debug logging.
    #[clap(long)]
    debug: bool,
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

    let mut graph = Graph::<f64>::new(args.size);

    // Intersect the circle x^2 + y^2 = 4 with the curve y = exp(x) - 1.
    let x = graph.mk_parameter(args.start);
    let y = graph.mk_parameter(args.start);
    let four = graph.mk_constant(4.0);
    let circle = graph.mk_sub(graph.mk_add(graph.mk_square(x), graph.mk_square(y)), four);
    let curve = graph.mk_sub(graph.mk_sub(graph.mk_exp(x), graph.one), y);

    println!("f1 = {}", graph.to_infix_string(circle));
    println!("f2 = {}", graph.to_infix_string(curve));

    let newton = Newton::new(&graph, vec![circle, curve], vec![x, y]);
    for (i, row) in newton.jacobian().iter().enumerate() {
        for (j, &entry) in row.iter().enumerate() {
            println!("J[{}][{}] = {}", i, j, graph.to_infix_string(entry));
        }
    }
    println!("graph = {:?}", graph);

    for step in 1..=args.iterations {
        newton.step(&mut graph)?;
        let residuals = newton.residuals(&graph);
        log::info!(
            "step {}: x = {}, y = {}, residuals = {:?}",
            step,
            graph.parameter_value(x),
            graph.parameter_value(y),
            residuals
        );
        if residuals.iter().all(|r| r.abs() < args.tolerance) {
            println!("Converged after {} steps", step);
            break;
        }
    }

    println!("x = {}", graph.parameter_value(x));
    println!("y = {}", graph.parameter_value(y));

    Ok(())
}
