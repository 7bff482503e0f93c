//! The sweep worker pool.
//!
//! Parameter sets are fed through a bounded task channel shared by a fixed
//! number of workers. Each worker runs the repeats of one set on the
//! blocking thread pool, summarises them, and forwards the summaries and the
//! raw trajectories to two bounded result channels. A dedicated writer drains
//! each result channel into its CSV file.
//!
//! Shutdown is ordered: the task sender is dropped once every set is queued,
//! workers exit when the task channel is empty, their result senders drop
//! with them, and the writers flush and exit when their channels close.

use std::path::Path;
use std::sync::Arc;

use mosaic_core::{ModelConfig, ModelError, run_chain};
use mosaic_types::PlantPopulation;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::SweepError;
use crate::grid::ParameterSet;
use crate::output::{SUMMARY_FILE, SummaryCsv, TRAJECTORY_FILE, TrajectoryCsv, create};
use crate::stats::{SeasonSummary, summarize};

/// What every chain of the sweep shares.
#[derive(Debug, Clone)]
pub struct SweepJob {
    /// Base model the parameter sets are applied to.
    pub base: ModelConfig,
    /// Planting every chain starts from.
    pub initial: PlantPopulation,
    /// Generations per chain.
    pub seasons: u32,
    /// Chains per parameter set.
    pub repeats: u32,
    /// Seed every chain seed is derived from.
    pub master_seed: u64,
}

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Number of workers.
    pub workers: usize,
    /// Capacity of the task and result channels.
    pub channel_capacity: usize,
}

/// Totals reported once the sweep has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Parameter sets completed.
    pub parameter_sets: usize,
    /// Chains completed.
    pub chains: u64,
}

/// All repeats of one parameter set.
#[derive(Debug, Clone)]
pub struct SetOutcome {
    /// The parameter set.
    pub set: ParameterSet,
    /// One trajectory per repeat.
    pub trajectories: Vec<Vec<PlantPopulation>>,
    /// Per-season summaries over the repeats.
    pub summaries: Vec<SeasonSummary>,
}

type SummaryMessage = (ParameterSet, Vec<SeasonSummary>);
type TrajectoryMessage = (ParameterSet, Vec<Vec<PlantPopulation>>);

/// Seed for one chain, distinct for every `(set, repeat)` pair.
pub fn chain_seed(master_seed: u64, set_index: usize, repeat: u32) -> u64 {
    let set_index = u64::try_from(set_index).unwrap_or(u64::MAX);
    master_seed
        .wrapping_add(set_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(u64::from(repeat).wrapping_mul(0xD1B5_4A32_D192_ED03))
}

/// Run every repeat of a parameter set. Each repeat restarts from the initial
/// population with its own RNG stream.
///
/// # Errors
///
/// Returns [`ModelError`] if the set's model is invalid.
pub fn run_parameter_set(set: ParameterSet, job: &SweepJob) -> Result<SetOutcome, ModelError> {
    let model = set.apply(&job.base);
    let mut trajectories = Vec::new();
    for repeat in 0..job.repeats {
        let mut rng = StdRng::seed_from_u64(chain_seed(job.master_seed, set.index, repeat));
        let trajectory = run_chain(&job.initial, &model, job.seasons, &mut rng)?;
        debug!(set = set.index, repeat, "Chain complete");
        trajectories.push(trajectory);
    }
    let summaries = summarize(&trajectories);
    Ok(SetOutcome {
        set,
        trajectories,
        summaries,
    })
}

/// Run the whole sweep, writing the summary and trajectory files into
/// `output_dir`.
///
/// # Errors
///
/// Returns [`SweepError`] if a model is invalid, a file cannot be written, or
/// a task fails. The first error is returned once the pool has drained.
pub async fn run_sweep(
    sets: Vec<ParameterSet>,
    job: SweepJob,
    options: PoolOptions,
    output_dir: &Path,
) -> Result<SweepReport, SweepError> {
    let capacity = options.channel_capacity.max(1);
    let workers = options.workers.max(1);
    let total_sets = sets.len();

    let summary_csv = SummaryCsv::new(create(output_dir, SUMMARY_FILE)?)?;
    let trajectory_csv = TrajectoryCsv::new(create(output_dir, TRAJECTORY_FILE)?)?;

    let (task_tx, task_rx) = mpsc::channel::<ParameterSet>(capacity);
    let (summary_tx, summary_rx) = mpsc::channel::<SummaryMessage>(capacity);
    let (trajectory_tx, trajectory_rx) = mpsc::channel::<TrajectoryMessage>(capacity);

    let summary_writer = tokio::task::spawn_blocking(move || write_summaries(summary_csv, summary_rx));
    let trajectory_writer =
        tokio::task::spawn_blocking(move || write_trajectories(trajectory_csv, trajectory_rx));

    info!(
        parameter_sets = total_sets,
        workers,
        repeats = job.repeats,
        seasons = job.seasons,
        "Sweep starting"
    );

    let task_rx = Arc::new(Mutex::new(task_rx));
    let job = Arc::new(job);
    let worker_handles: Vec<JoinHandle<Result<usize, SweepError>>> = (0..workers)
        .map(|worker| {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&task_rx),
                Arc::clone(&job),
                summary_tx.clone(),
                trajectory_tx.clone(),
            ))
        })
        .collect();
    drop(task_rx);
    drop(summary_tx);
    drop(trajectory_tx);

    for set in sets {
        if task_tx.send(set).await.is_err() {
            // Every worker has exited; its error is reported below.
            break;
        }
    }
    drop(task_tx);

    let mut completed: usize = 0;
    let mut first_error: Option<SweepError> = None;
    for handle in worker_handles {
        match handle.await {
            Ok(Ok(count)) => completed = completed.saturating_add(count),
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(e.into());
            }
        }
    }

    // Writer errors take precedence over the ChannelClosed they cause.
    for writer in [summary_writer.await, trajectory_writer.await] {
        writer??;
    }
    if let Some(error) = first_error {
        return Err(error);
    }

    let chains = u64::try_from(completed)
        .unwrap_or(u64::MAX)
        .saturating_mul(u64::from(job.repeats));
    info!(parameter_sets = completed, chains, "Sweep complete");

    Ok(SweepReport {
        parameter_sets: completed,
        chains,
    })
}

/// Pull sets until the task channel closes. Returns the number of sets this
/// worker completed.
async fn worker_loop(
    worker: usize,
    tasks: Arc<Mutex<mpsc::Receiver<ParameterSet>>>,
    job: Arc<SweepJob>,
    summaries: mpsc::Sender<SummaryMessage>,
    trajectories: mpsc::Sender<TrajectoryMessage>,
) -> Result<usize, SweepError> {
    let mut completed: usize = 0;
    loop {
        let next = tasks.lock().await.recv().await;
        let Some(set) = next else {
            break;
        };

        let shared = Arc::clone(&job);
        let outcome = tokio::task::spawn_blocking(move || run_parameter_set(set, &shared)).await??;

        info!(
            worker,
            set = outcome.set.index,
            nbees = outcome.set.number_of_bees,
            attraction = outcome.set.attraction,
            "Parameter set complete"
        );

        summaries
            .send((outcome.set, outcome.summaries))
            .await
            .map_err(|_closed| SweepError::ChannelClosed { channel: "summary" })?;
        trajectories
            .send((outcome.set, outcome.trajectories))
            .await
            .map_err(|_closed| SweepError::ChannelClosed {
                channel: "trajectory",
            })?;
        completed = completed.saturating_add(1);
    }
    debug!(worker, completed, "Worker exiting");
    Ok(completed)
}

fn write_summaries<W: std::io::Write>(
    mut csv: SummaryCsv<W>,
    mut rx: mpsc::Receiver<SummaryMessage>,
) -> Result<(), SweepError> {
    while let Some((set, summaries)) = rx.blocking_recv() {
        csv.write_set(&set, &summaries)?;
    }
    csv.finish()?;
    Ok(())
}

fn write_trajectories<W: std::io::Write>(
    mut csv: TrajectoryCsv<W>,
    mut rx: mpsc::Receiver<TrajectoryMessage>,
) -> Result<(), SweepError> {
    while let Some((set, trajectories)) = rx.blocking_recv() {
        csv.write_set(&set, &trajectories)?;
    }
    csv.finish()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use mosaic_core::{SeasonConfig, default_initial_population};

    use super::*;
    use crate::config::{CountRange, GridConfig, ParameterRange};
    use crate::grid::build_grid;

    fn quick_job(seasons: u32, repeats: u32) -> SweepJob {
        SweepJob {
            base: ModelConfig {
                season: SeasonConfig {
                    season_length_hours: 16,
                    ..SeasonConfig::default()
                },
                ..ModelConfig::default()
            },
            initial: default_initial_population(),
            seasons,
            repeats,
            master_seed: 1234,
        }
    }

    fn small_grid() -> Vec<ParameterSet> {
        let grid = GridConfig {
            bees: CountRange {
                start: 1,
                stop: 21,
                step: 10,
            },
            attraction: ParameterRange {
                start: 0.5,
                stop: 1.0,
                step: 0.25,
            },
            infected_penalty: ParameterRange {
                start: 0.36,
                stop: 0.4,
                step: 1.0,
            },
            non_buzz_penalty: ParameterRange {
                start: 0.74,
                stop: 0.8,
                step: 1.0,
            },
            non_buzz_infected_penalty: ParameterRange {
                start: 0.09,
                stop: 0.1,
                step: 1.0,
            },
        };
        build_grid(&grid, &ModelConfig::default()).unwrap()
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let unique = format!(
            "mosaic_pool_{name}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn chain_seeds_are_distinct() {
        let mut seeds = std::collections::BTreeSet::new();
        for set in 0..32 {
            for repeat in 0..3 {
                seeds.insert(chain_seed(7, set, repeat));
            }
        }
        assert_eq!(seeds.len(), 96);
    }

    #[test]
    fn chain_seed_mixes_set_and_repeat() {
        assert_eq!(chain_seed(7, 0, 0), 7);
        assert_eq!(
            chain_seed(7, 1, 0),
            7_u64.wrapping_add(0x9E37_79B9_7F4A_7C15)
        );
        assert_eq!(
            chain_seed(7, 0, 1),
            7_u64.wrapping_add(0xD1B5_4A32_D192_ED03)
        );
        assert_ne!(chain_seed(7, usize::MAX, 2), chain_seed(7, usize::MAX, 3));
    }

    #[test]
    fn parameter_set_runs_every_repeat() {
        let sets = small_grid();
        let outcome = run_parameter_set(sets[0], &quick_job(2, 3)).unwrap();
        assert_eq!(outcome.trajectories.len(), 3);
        assert_eq!(outcome.summaries.len(), 3);
        for trajectory in &outcome.trajectories {
            assert_eq!(trajectory.len(), 3);
            assert_eq!(trajectory[0], default_initial_population());
        }
        assert!(outcome.summaries[0].susceptible.sem.abs() < f64::EPSILON);
    }

    #[test]
    fn parameter_set_is_reproducible() {
        let sets = small_grid();
        let a = run_parameter_set(sets[1], &quick_job(2, 2)).unwrap();
        let b = run_parameter_set(sets[1], &quick_job(2, 2)).unwrap();
        assert_eq!(a.trajectories, b.trajectories);
    }

    #[tokio::test]
    async fn sweep_writes_every_set() {
        let dir = temp_dir("sweep");
        let sets = small_grid();
        assert_eq!(sets.len(), 4);

        let options = PoolOptions {
            workers: 3,
            channel_capacity: 1,
        };
        let report = run_sweep(sets, quick_job(2, 2), options, &dir)
            .await
            .unwrap();
        assert_eq!(report.parameter_sets, 4);
        assert_eq!(report.chains, 8);

        let summary = std::fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap();
        // header + 4 sets * 3 seasons * 2 populations
        assert_eq!(summary.lines().count(), 1 + 4 * 3 * 2);

        let trajectories = std::fs::read_to_string(dir.join(TRAJECTORY_FILE)).unwrap();
        // header + 4 sets * 2 repeats * 3 seasons
        assert_eq!(trajectories.lines().count(), 1 + 4 * 2 * 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn sweep_is_independent_of_worker_count() {
        let run = |workers: usize, name: &'static str| async move {
            let dir = temp_dir(name);
            let options = PoolOptions {
                workers,
                channel_capacity: 2,
            };
            run_sweep(small_grid(), quick_job(1, 2), options, &dir)
                .await
                .unwrap();
            let mut lines: Vec<String> = std::fs::read_to_string(dir.join(TRAJECTORY_FILE))
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect();
            lines.sort();
            std::fs::remove_dir_all(&dir).ok();
            lines
        };

        let single = run(1, "single").await;
        let many = run(4, "many").await;
        assert_eq!(single, many);
    }

    #[tokio::test]
    async fn empty_grid_writes_headers_only() {
        let dir = temp_dir("empty");
        let options = PoolOptions {
            workers: 2,
            channel_capacity: 4,
        };
        let report = run_sweep(Vec::new(), quick_job(1, 1), options, &dir)
            .await
            .unwrap();
        assert_eq!(report.parameter_sets, 0);
        let summary = std::fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
