//! Parameter-sweep binary for the Mosaic simulation.
//!
//! Runs every combination of the swept parameters for a number of repeats
//! of multi-season chains, and writes summary statistics and raw
//! trajectories as CSV.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `mosaic-config.yaml` and the environment
//! 3. Expand and validate the parameter grid
//! 4. Optionally record one diagnostic season hour by hour
//! 5. Run the worker pool until every parameter set is written
//! 6. Write the run manifest

mod config;
mod error;
mod grid;
mod output;
mod pool;
mod stats;

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::SweepConfig;
use crate::error::SweepError;
use crate::output::RunManifest;
use crate::pool::{PoolOptions, SweepJob};

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "mosaic-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, simulation, or output writing fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("mosaic-sweep starting");

    // 2. Load configuration.
    let mut config = load_config()?;
    config.apply_env()?;
    let master_seed = config.sweep.seed.unwrap_or_else(rand::random::<u64>);
    config.sweep.seed = Some(master_seed);
    let workers = config.worker_count();
    info!(
        seasons = config.sweep.seasons,
        repeats = config.sweep.repeats,
        workers,
        master_seed,
        output_dir = %config.sweep.output_dir.display(),
        "Configuration loaded"
    );

    // 3. Expand the grid.
    let sets = grid::build_grid(&config.sweep.grid, &config.model)?;
    info!(parameter_sets = sets.len(), "Parameter grid built");

    let output_dir = config.sweep.output_dir.clone();
    std::fs::create_dir_all(&output_dir)?;
    let mut manifest = RunManifest::start(config.clone(), master_seed, sets.len());

    // 4. Diagnostic season.
    if config.sweep.hourly_visits {
        let mut rng = StdRng::seed_from_u64(master_seed);
        output::record_season_visits(
            &output_dir,
            &config.sweep.initial_population,
            &config.model.season,
            &mut rng,
        )?;
    }

    // 5. Run the sweep.
    let job = SweepJob {
        base: config.model,
        initial: config.sweep.initial_population,
        seasons: config.sweep.seasons,
        repeats: config.sweep.repeats,
        master_seed,
    };
    let options = PoolOptions {
        workers,
        channel_capacity: config.sweep.channel_capacity,
    };
    let report = pool::run_sweep(sets, job, options, &output_dir).await?;

    // 6. Manifest.
    manifest.finish(report.chains);
    manifest.write(&output_dir)?;

    info!(
        experiment_id = %manifest.experiment_id,
        parameter_sets = report.parameter_sets,
        chains = report.chains,
        "mosaic-sweep complete"
    );

    Ok(())
}

/// Load the sweep configuration from `MOSAIC_CONFIG` or
/// `mosaic-config.yaml`, falling back to defaults when the file is missing.
fn load_config() -> Result<SweepConfig, SweepError> {
    let config_path = std::env::var("MOSAIC_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        let config = SweepConfig::from_file(&config_path)?;
        info!(path = %config_path.display(), "Config file loaded");
        Ok(config)
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        Ok(SweepConfig::default())
    }
}
