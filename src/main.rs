// main.rs
// Command-line entry: rydberg_sim <config.toml> [output-file]

use rydberg_sim::config::{RunConfig, MIN_THREADS, THREADS_LEAVE_FREE};
use rydberg_sim::field::DatFieldReader;
use rydberg_sim::geometry::AcceleratorGeometry;
use rydberg_sim::io::{write_export, TrajectoryExport};
use rydberg_sim::particle::EnsembleGenerator;
use rydberg_sim::simulation::Simulator;
use rydberg_sim::{SimError, SimResult};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Global thread pool with threads = max(3, total cores) - 2
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_THREADS)
        .max(MIN_THREADS)
        - THREADS_LEAVE_FREE;
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        log::warn!("Could not size the thread pool: {e}");
    }

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> SimResult<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .ok_or_else(|| SimError::Config("usage: rydberg_sim <config.toml> [output-file]".into()))?;
    let output_override = args.next().map(PathBuf::from);

    let config = RunConfig::load_from_file(&config_path)?;
    log::info!("Loaded configuration from {config_path}");
    let format = config.storage.export_format()?;

    let acc = &config.accelerator;
    let reader = DatFieldReader::new(&acc.dat_directory, acc.pa_name.as_str(), acc.n_electrodes);
    let mut geometry = AcceleratorGeometry::import(acc, &reader)?;

    let voltages = config.simulation.sweep_voltages();
    if output_override.is_some() && voltages.len() > 1 {
        log::warn!("Output file ignored for a sweep, writing one file per voltage to {}", config.storage.output_dir.display());
    }

    for max_voltage in voltages.iter().copied() {
        let particles = EnsembleGenerator::new(&config.particles, acc, config.simulation.seed)?.generate()?;
        let mut sim = Simulator::new(
            geometry,
            particles,
            config.simulation.with_max_voltage(max_voltage),
            config.storage.clone(),
        )?;
        let numbers = sim.run()?;
        println!("{max_voltage} V\n{numbers}");

        let path = match &output_override {
            Some(p) if voltages.len() == 1 => p.clone(),
            _ => config.storage.output_path(max_voltage),
        };
        write_export(&path, &TrajectoryExport::from_simulator(&sim), format, config.storage.compress)?;

        #[cfg(feature = "profiling")]
        rydberg_sim::PROFILER.lock().log_and_clear();

        geometry = sim.into_parts().0;
    }
    Ok(())
}
