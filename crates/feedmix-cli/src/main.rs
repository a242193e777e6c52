use clap::{Parser, Subcommand, ValueEnum};
use feedmix_engine::{
    DEFAULT_TOLERANCE, FormulationOption, NutrientVector, NutritionalTarget, OptimizeRequest, Optimizer,
    Strategy, build_option, check_compliance,
};
use feedmix_solver::Analysis;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "feedmix")]
#[command(about = "Least-cost feed formulation", long_about = None)]
struct Cli {
    /// Log solver progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Formulate a request file with one or all strategies
    Solve {
        /// JSON formulation request
        file: PathBuf,
        /// Strategy to run (least-cost, balanced, premium); all when omitted
        #[arg(short, long)]
        strategy: Option<Strategy>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
        /// Show detailed analysis
        #[arg(short, long)]
        analysis: bool,
    },
    /// Check a request file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Grade a nutrient profile against a target
    Comply {
        /// JSON file with `actual`, `target` and optional `tolerance`
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
    },
}

#[derive(Deserialize)]
struct ComplyInput {
    actual: NutrientVector,
    target: NutritionalTarget,
    #[serde(default)]
    tolerance: Option<f64>,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Solve {
            file,
            strategy,
            format,
            analysis,
        } => {
            let request = read_request(&file);
            let optimizer = Optimizer::new();

            match strategy {
                Some(strategy) => {
                    let result = match optimizer.optimize(&request, strategy) {
                        Ok(r) => r,
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    };
                    let option = build_option(&request, &result);

                    if format == Format::Json {
                        print_json(&option);
                    } else {
                        match &option {
                            Some(option) => {
                                print_option(option);
                                if let (true, Some(a)) = (analysis, &result.analysis) {
                                    print_analysis(a);
                                }
                            }
                            None => print_infeasible(strategy, result.message.as_deref()),
                        }
                    }
                    if option.is_none() {
                        std::process::exit(1);
                    }
                }
                None => {
                    let outcome = match optimizer.optimize_all(&request) {
                        Ok(o) => o,
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    };

                    if format == Format::Json {
                        print_json(&outcome);
                    } else {
                        for (i, option) in outcome.options.iter().enumerate() {
                            if i > 0 {
                                println!();
                            }
                            print_option(option);
                        }
                        for infeasible in &outcome.infeasible {
                            println!();
                            print_infeasible(infeasible.strategy, Some(&infeasible.message));
                        }
                        for failed in &outcome.failed {
                            println!();
                            println!("Strategy: {}", failed.strategy);
                            println!("Status: ERROR");
                            println!("{}", failed.error);
                        }
                        if analysis {
                            println!();
                            println!("(--analysis applies to a single --strategy)");
                        }
                    }

                    if let Some(suggestion) = outcome.suggestion() {
                        eprintln!();
                        eprintln!("No feasible formulation. {}", suggestion);
                        std::process::exit(1);
                    }
                }
            }
        }
        Commands::Check { file } => {
            let request = read_request(&file);
            match request.validate() {
                Ok(()) => {
                    let additives = request.ingredients.iter().filter(|i| i.is_auto_calculated()).count();
                    let targets = request.nutritional_target.ranges().count();

                    println!("✓ {} is valid", file.display());
                    println!("  {} kg batch", request.target_weight_kg);
                    println!("  {} ingredients", request.ingredients.len() - additives);
                    println!("  {} auto-calculated additives", additives);
                    println!("  {} nutrient targets", targets);
                    println!("  {}% tolerance", request.base_tolerance());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Comply { file, format } => {
            let source = read_file(&file);
            let input: ComplyInput = match serde_json::from_str(&source) {
                Ok(i) => i,
                Err(e) => {
                    eprintln!("Error parsing {}: {}", file.display(), e);
                    std::process::exit(1);
                }
            };

            let result = check_compliance(
                &input.actual,
                &input.target,
                input.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            );
            if format == Format::Json {
                print_json(&result);
            } else {
                print!("{}", result.report());
            }
        }
    }
}

fn read_file(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_request(file: &Path) -> OptimizeRequest {
    let source = read_file(file);
    match serde_json::from_str::<OptimizeRequest>(&source) {
        Ok(r) => {
            tracing::debug!(
                file = %file.display(),
                ingredients = r.ingredients.len(),
                weight = r.target_weight_kg,
                "loaded request"
            );
            r
        }
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_option(option: &FormulationOption) {
    println!("Strategy: {}", option.strategy);
    println!("Status: FEASIBLE ({:?})", option.tier);
    if let Some(message) = &option.message {
        println!("Note: {}", message);
    }
    println!("Total cost: {:.2}", option.total_cost);
    println!("Cost per kg: {:.2}", option.cost_per_kg);
    if option.overhead_cost > 0.0 {
        println!("  (includes {:.2} overhead)", option.overhead_cost);
    }
    println!();

    println!("Recipe:");
    for line in &option.recipe {
        let unit = if line.auto_calculated {
            "auto".to_string()
        } else if line.bags > 0 {
            format!("{} bags", line.bags)
        } else {
            "loose".to_string()
        };
        println!(
            "  {:20} {:10.2} kg  {:>8}  @ {:.2}",
            line.name, line.qty_kg, unit, line.price
        );
    }
    println!();

    print!("{}", option.compliance.report());
}

fn print_infeasible(strategy: Strategy, message: Option<&str>) {
    println!("Strategy: {}", strategy);
    println!("Status: INFEASIBLE");
    if let Some(message) = message {
        println!("{}", message);
    }
}

fn print_analysis(analysis: &Analysis) {
    println!();
    println!("Analysis:");
    println!();

    if !analysis.binding_constraints.is_empty() {
        println!("Binding constraints (pinch points):");
        for name in &analysis.binding_constraints {
            println!("  - {}", name);
        }
        println!();
    }

    println!("Shadow prices:");
    for sp in &analysis.shadow_prices {
        if sp.value.abs() > 0.001 {
            println!("  {:30} {:10.4}", sp.constraint, sp.value);
            println!("    {}", sp.interpretation);
        }
    }
    println!();

    println!("Reduced costs (ingredients not in solution):");
    for rc in &analysis.reduced_costs {
        if !rc.is_basic && rc.reduced_cost.abs() > 0.001 {
            println!(
                "  {:20} cost must decrease by {:.2} to enter solution",
                rc.variable, rc.reduced_cost
            );
        }
    }
}
