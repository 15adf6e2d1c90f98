//! Plant Arbitrator - Entry point
//!
//! Runs a single crop (or an ensemble of copies) through daily arbitration
//! and prints a season summary.
//!
//! CLI Usage:
//!   cargo run                              # 120 days with default parameters
//!   cargo run -- -n 60 -p data/parameters  # Custom days and parameter dir
//!   cargo run -- --export                  # Write CSV and JSON to exports/
//!   cargo run -- --ensemble 8              # Eight members in parallel

use anyhow::Result;
use plant_arbitrator::{
    config::Parameters,
    export::{export_state_json, CsvExporter},
    schedule::{Ensemble, Simulation},
    state::CollectingSink,
};

struct Options {
    days: u32,
    params_dir: Option<String>,
    export: bool,
    ensemble: usize,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        days: 120,
        params_dir: None,
        export: false,
        ensemble: 0,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--days" => {
                i += 1;
                if i < args.len() {
                    options.days = args[i].parse().unwrap_or(120);
                }
            }
            "-p" | "--params" => {
                i += 1;
                if i < args.len() {
                    options.params_dir = Some(args[i].clone());
                }
            }
            "-e" | "--export" => options.export = true,
            "--ensemble" => {
                i += 1;
                if i < args.len() {
                    options.ensemble = args[i].parse().unwrap_or(0);
                }
            }
            "--help" | "-h" => {
                println!("Plant Arbitrator");
                println!();
                println!("Usage: plant-arbitrator [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days N       Number of days to simulate (default: 120)");
                println!("  -p, --params DIR   Directory with soil.json, crop.json, run.json");
                println!("  -e, --export       Write daily CSV and final JSON state to exports/");
                println!("  --ensemble N       Run N independent copies in parallel");
                println!("  --help, -h         Show this help");
                std::process::exit(0);
            }
            other => log::warn!("Ignoring unknown argument {}", other),
        }
        i += 1;
    }

    options
}

fn print_summary(sim: &Simulation) {
    println!("=== Plant Arbitrator - Season Summary ===\n");
    println!("Days committed: {}", sim.day());
    if sim.is_terminated() {
        println!("Run terminated early");
    }

    let supplied: f64 = sim.history().iter().map(|r| r.dm.supply).sum();
    let allocated: f64 = sim.history().iter().map(|r| r.dm.allocated).sum();
    let n_uptake: f64 = sim.history().iter().map(|r| r.n.allocated).sum();
    let water: f64 = sim.history().iter().map(|r| r.water.allocated).sum();
    println!("DM supplied:  {:10.3} g/m2", supplied);
    println!("DM allocated: {:10.3} g/m2", allocated);
    println!("N allocated:  {:10.4} g/m2", n_uptake);
    println!("Water uptake: {:10.2} mm", water);
    println!();

    println!("{:<12} {:>10} {:>10} {:>10}", "Organ", "Wt", "N", "Dead");
    for organ in sim.organs() {
        println!(
            "{:<12} {:>10.3} {:>10.4} {:>10.3}",
            organ.name(),
            organ.wt(),
            organ.n(),
            organ.dead_wt()
        );
    }
    if let Some(root) = sim.organs().iter().find_map(|o| o.root_properties()) {
        println!("\nRoot depth: {:.0} mm", root.depth_mm);
        for (i, rld) in root.length_density.iter().enumerate() {
            println!("  layer {}: RLD {:.3e} m/mm3", i, rld);
        }
    }
}

fn run_ensemble(params: &Parameters, members: usize, days: u32) -> Result<()> {
    let sims = (0..members)
        .map(|_| params.build_simulation(Box::new(CollectingSink::default())))
        .collect::<Result<Vec<_>, _>>()?;
    let mut ensemble = Ensemble::new(sims);
    let drivers = params.drivers.clone();
    let results = ensemble.run(days, |_| drivers.clone());

    for (i, (sim, result)) in ensemble.members().iter().zip(&results).enumerate() {
        let wt: f64 = sim.organs().iter().map(|o| o.wt()).sum();
        match result {
            Ok(()) => println!("member {:>3}: day {:>4}, crop wt {:.3} g/m2", i, sim.day(), wt),
            Err(e) => println!("member {:>3}: failed: {}", i, e),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let options = parse_args();

    log::info!("Plant Arbitrator starting...");

    let params = match &options.params_dir {
        Some(dir) => Parameters::load_from_dir(dir),
        None => Parameters::load_or_default(),
    };
    log::info!(
        "Parameters loaded: {} soil layers, {} above-ground organs",
        params.soil.layers.len(),
        params.organs.len()
    );

    if options.ensemble > 0 {
        return run_ensemble(&params, options.ensemble, options.days);
    }

    let mut sim = params.build_simulation(Box::new(CollectingSink::default()))?;
    let mut drivers = params.drivers.clone();
    if let Err(e) = sim.run(options.days, &mut drivers) {
        log::error!("Simulation stopped: {}", e);
    }

    print_summary(&sim);

    if options.export {
        let mut exporter = CsvExporter::new()?;
        exporter.record_all(sim.history())?;
        let csv_path = exporter.finish()?;
        let json_path = export_state_json(&sim)?;
        println!("\nExported {} and {}", csv_path.display(), json_path.display());
    }

    sim.end_crop()?;
    Ok(())
}
