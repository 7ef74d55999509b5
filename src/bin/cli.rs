//! freightmatch CLI - run the consolidation pipeline on a JSON network
//!
//! Usage:
//!   freightmatch-cli analyze <input.json> [--cache-dir <dir>] [--output <file>]
//!   freightmatch-cli evaluate <cache-dir> [--min-freight <t>] [--min-distance <d>] [--pareto]
//!
//! The input file holds `{ "locations": [...], "routes": [...], "shipments": [...] }`
//! where `locations` is optional. With a cache directory the caches are
//! restored before the run and saved after it, so a rerun with more routes
//! only compares the new route pairs.

use clap::{Parser, Subcommand};
use freightmatch::{
    ConsolidationConfig, ConsolidationEngine, ContiguousSectionCombination, Evaluation,
    EvaluationConfig, Location, Route, Shipment, evaluate, load_snapshot, save_snapshot,
};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "freightmatch-cli")]
#[command(about = "Find shared route legs worth consolidating freight onto", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args)]
struct EvaluationArgs {
    /// Minimum freight (tons) a candidate must exceed
    #[arg(long, default_value = "100")]
    min_freight: f64,

    /// Minimum distance a candidate must exceed
    #[arg(long, default_value = "100")]
    min_distance: f64,

    /// Also compute the Pareto front of distance and freight
    #[arg(long)]
    pareto: bool,
}

impl EvaluationArgs {
    fn config(&self) -> EvaluationConfig {
        EvaluationConfig {
            min_freight_amount: self.min_freight,
            min_distance: self.min_distance,
            pareto_front: self.pareto,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a route network and evaluate consolidation candidates
    Analyze {
        /// JSON file with locations, routes and shipments
        input: PathBuf,

        /// Directory to restore caches from and save them to
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write the evaluation as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Coordinate tolerance for point identity
        #[arg(long, default_value = "1e-7")]
        tolerance: f64,

        /// Capacity of one load unit in tons
        #[arg(long, default_value = "28.3")]
        unit_capacity: f64,

        /// Weekly utilization a route must exceed for its freight to count
        #[arg(long, default_value = "0.8")]
        min_utilization: f64,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },

    /// Re-evaluate a stored combination cache without recomputing it
    Evaluate {
        /// Cache directory written by `analyze`
        cache_dir: PathBuf,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },
}

/// A route as it appears in the input file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteInput {
    origin_id: u64,
    destination_id: u64,
    #[serde(alias = "polyline")]
    coordinates: Vec<[f64; 2]>,
    total_length: f64,
}

impl From<RouteInput> for Route {
    fn from(input: RouteInput) -> Self {
        Route::new(
            input.origin_id,
            input.destination_id,
            input.coordinates.into_iter().map(|[x, y]| (x, y)).collect(),
            input.total_length,
        )
    }
}

#[derive(Deserialize)]
struct NetworkInput {
    #[serde(default)]
    locations: Vec<Location>,
    routes: Vec<RouteInput>,
    #[serde(default)]
    shipments: Vec<Shipment>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Analyze {
            input,
            cache_dir,
            output,
            tolerance,
            unit_capacity,
            min_utilization,
            evaluation,
        } => {
            let config = ConsolidationConfig {
                coordinate_tolerance: tolerance,
                unit_capacity,
                min_utilization,
            };
            run_analyze(
                &input,
                cache_dir.as_deref(),
                output.as_deref(),
                config,
                &evaluation.config(),
            )
        }
        Commands::Evaluate {
            cache_dir,
            evaluation,
        } => run_evaluate(&cache_dir, &evaluation.config()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_network(path: &Path) -> freightmatch::Result<NetworkInput> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Warn about route endpoints that reference locations missing from the input.
fn check_locations(network: &NetworkInput) {
    if network.locations.is_empty() {
        return;
    }
    let known: HashSet<u64> = network.locations.iter().map(|l| l.location_id).collect();
    for route in &network.routes {
        for id in [route.origin_id, route.destination_id] {
            if !known.contains(&id) {
                warn!(
                    "Route r{}_r{} references unknown location {}",
                    route.origin_id, route.destination_id, id
                );
            }
        }
    }
}

fn run_analyze(
    input: &Path,
    cache_dir: Option<&Path>,
    output: Option<&Path>,
    config: ConsolidationConfig,
    evaluation_config: &EvaluationConfig,
) -> freightmatch::Result<()> {
    println!("\n{}", "=".repeat(60));
    println!("Loading network from: {}", input.display());
    println!("{}", "=".repeat(60));

    let network = load_network(input)?;
    check_locations(&network);
    println!(
        "  {} locations, {} routes, {} shipments",
        network.locations.len(),
        network.routes.len(),
        network.shipments.len()
    );

    let mut engine = ConsolidationEngine::with_config(config);
    if let Some(dir) = cache_dir {
        engine.restore(load_snapshot(dir)?);
    }
    engine.add_routes(network.routes.into_iter().map(Route::from))?;
    engine.add_shipments(network.shipments);

    let report = engine.run();

    println!("\n{}", "=".repeat(60));
    println!("Pipeline");
    println!("{}", "=".repeat(60));
    println!(
        "  Intersection points: {} (+{})",
        engine.intersection_points().len(),
        report.new_points
    );
    println!(
        "  Compared pairs:      {} (+{})",
        engine.compared_pairs().len(),
        report.new_compared_pairs
    );
    println!(
        "  Sections:            {} (+{})",
        engine.section_count(),
        report.new_sections
    );
    println!(
        "  Combinations:        {} (+{})",
        engine.combinations().len(),
        report.new_combinations
    );
    if !report.diagnostics.is_empty() {
        println!("  Diagnostics:         {}", report.diagnostics.len());
    }

    if let Some(dir) = cache_dir {
        save_snapshot(dir, &engine.snapshot())?;
    }

    let evaluation = engine.evaluate(evaluation_config);
    print_evaluation(&evaluation);

    if let Some(path) = output {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &evaluation)?;
        writer.flush()?;
        info!("Wrote evaluation to {}", path.display());
    }
    Ok(())
}

fn run_evaluate(cache_dir: &Path, config: &EvaluationConfig) -> freightmatch::Result<()> {
    let snapshot = load_snapshot(cache_dir)?;
    if snapshot.combinations.is_empty() {
        warn!("No combinations stored in {}", cache_dir.display());
    }
    let evaluation = evaluate(&snapshot.combinations, config);
    print_evaluation(&evaluation);
    Ok(())
}

fn print_candidate(c: &ContiguousSectionCombination) {
    println!(
        "  {:>5} -> {:<5} {:>12.1} t {:>12.1}  ({} sections of {})",
        c.from_point_index, c.to_point_index, c.freight_amount, c.distance, c.section_count, c.route_id
    );
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("\n{}", "=".repeat(60));
    println!("Candidates: {}", evaluation.candidates.len());
    println!("{}", "=".repeat(60));
    for c in &evaluation.candidates {
        print_candidate(c);
    }

    if let Some(front) = &evaluation.pareto_front {
        println!("\n{}", "=".repeat(60));
        println!("Pareto front: {}", front.len());
        println!("{}", "=".repeat(60));
        for c in front {
            print_candidate(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_geometry_accepts_polyline() {
        let input: NetworkInput = serde_json::from_str(
            r#"{"routes": [
                {"originId": 1, "destinationId": 2, "coordinates": [[0.0, 0.0], [10.0, 0.0]], "totalLength": 100.0},
                {"originId": 3, "destinationId": 4, "polyline": [[2.0, 0.0], [8.0, 0.0]], "totalLength": 60.0}
            ]}"#,
        )
        .unwrap();

        let routes: Vec<Route> = input.routes.into_iter().map(Route::from).collect();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].id, freightmatch::RouteId::new(3, 4));
        assert_eq!(routes[1].geometry.0.len(), 2);
        assert!(input.shipments.is_empty());
    }
}
