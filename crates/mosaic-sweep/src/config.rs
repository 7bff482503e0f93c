//! Sweep configuration: the base model plus the parameter grid and run
//! settings.
//!
//! Loaded from `mosaic-config.yaml` (or the path in `MOSAIC_CONFIG`). The
//! `season` and `reproduction` sections are the base [`ModelConfig`] that
//! every parameter set starts from; the `sweep` section controls the grid,
//! the number of seasons and repeats, and where output goes. A few settings
//! can be overridden from the environment.

use std::path::{Path, PathBuf};

use mosaic_core::{ConfigError, ModelConfig, default_initial_population};
use mosaic_types::PlantPopulation;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Complete sweep configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Base model parameters shared by every parameter set.
    #[serde(flatten)]
    pub model: ModelConfig,

    /// Sweep settings.
    #[serde(default)]
    pub sweep: SweepSettings,
}

/// How the sweep is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Generations per chain.
    #[serde(default = "default_seasons")]
    pub seasons: u32,

    /// Independent chains per parameter set.
    #[serde(default = "default_repeats")]
    pub repeats: u32,

    /// Worker count. Defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Capacity of the task and result channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Directory the output files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Master seed for every chain. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Also record one diagnostic season hour by hour.
    #[serde(default)]
    pub hourly_visits: bool,

    /// Planting every chain starts from.
    #[serde(default = "default_initial_population")]
    pub initial_population: PlantPopulation,

    /// Parameter ranges.
    #[serde(default)]
    pub grid: GridConfig,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            seasons: default_seasons(),
            repeats: default_repeats(),
            workers: None,
            channel_capacity: default_channel_capacity(),
            output_dir: default_output_dir(),
            seed: None,
            hourly_visits: false,
            initial_population: default_initial_population(),
            grid: GridConfig::default(),
        }
    }
}

/// The five swept parameters. Each range is half-open: `stop` is excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of foraging bees.
    #[serde(default = "default_bees")]
    pub bees: CountRange,

    /// Attraction bias toward infected flowers.
    #[serde(default = "default_attraction")]
    pub attraction: ParameterRange,

    /// Seed lost by infected mothers.
    #[serde(default = "default_infected_penalty")]
    pub infected_penalty: ParameterRange,

    /// Seed retained by non-buzz selfing.
    #[serde(default = "default_non_buzz_penalty")]
    pub non_buzz_penalty: ParameterRange,

    /// Further seed retained by infected selfing mothers.
    #[serde(default = "default_non_buzz_infected_penalty")]
    pub non_buzz_infected_penalty: ParameterRange,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bees: default_bees(),
            attraction: default_attraction(),
            infected_penalty: default_infected_penalty(),
            non_buzz_penalty: default_non_buzz_penalty(),
            non_buzz_infected_penalty: default_non_buzz_infected_penalty(),
        }
    }
}

/// A half-open integer range with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// First value.
    pub start: u32,
    /// Exclusive upper bound.
    pub stop: u32,
    /// Increment between values.
    pub step: u32,
}

impl CountRange {
    /// Expand the range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the step is zero or the range is
    /// empty.
    pub fn values(&self, field: &'static str) -> Result<Vec<u32>, ConfigError> {
        let step = usize::try_from(self.step)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| ConfigError::Invalid {
                field,
                reason: "step must be at least 1".to_owned(),
            })?;
        let values: Vec<u32> = (self.start..self.stop).step_by(step).collect();
        if values.is_empty() {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("range {}..{} is empty", self.start, self.stop),
            });
        }
        Ok(values)
    }
}

/// A half-open floating-point range with a step, expanded as
/// `start + i * step` for every `i` that stays below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// First value.
    pub start: f64,
    /// Exclusive upper bound.
    pub stop: f64,
    /// Increment between values.
    pub step: f64,
}

/// Upper bound on values produced by one range.
const MAX_RANGE_VALUES: f64 = 10_000.0;

impl ParameterRange {
    /// Expand the range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the step is not positive, any bound
    /// is not finite, the range is empty, or it would produce an unreasonable
    /// number of values.
    pub fn values(&self, field: &'static str) -> Result<Vec<f64>, ConfigError> {
        let finite = self.start.is_finite() && self.stop.is_finite() && self.step.is_finite();
        if !finite || self.step <= 0.0 {
            return Err(ConfigError::Invalid {
                field,
                reason: format!(
                    "range {}..{} step {} needs finite bounds and a positive step",
                    self.start, self.stop, self.step
                ),
            });
        }

        let count = ((self.stop - self.start) / self.step).ceil();
        if count < 1.0 || count > MAX_RANGE_VALUES {
            return Err(ConfigError::Invalid {
                field,
                reason: format!(
                    "range {}..{} step {} yields {count} values",
                    self.start, self.stop, self.step
                ),
            });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = count as u32;
        Ok((0..count)
            .map(|i| f64::from(i).mul_add(self.step, self.start))
            .collect())
    }
}

impl SweepConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// base model value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the string is not valid YAML or a value is
    /// out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the base model and the run settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        if self.sweep.repeats == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep.repeats",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.sweep.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep.channel_capacity",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.sweep.workers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "sweep.workers",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Apply `MOSAIC_WORKERS`, `MOSAIC_OUTPUT_DIR` and `MOSAIC_SEED`
    /// overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Env`] if a variable is set but cannot be parsed.
    pub fn apply_env(&mut self) -> Result<(), SweepError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SweepError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MOSAIC_WORKERS") {
            let workers: usize = raw.trim().parse().map_err(|e| SweepError::Env {
                name: "MOSAIC_WORKERS",
                reason: format!("{e}"),
            })?;
            if workers == 0 {
                return Err(SweepError::Env {
                    name: "MOSAIC_WORKERS",
                    reason: "must be at least 1".to_owned(),
                });
            }
            self.sweep.workers = Some(workers);
        }
        if let Some(raw) = lookup("MOSAIC_OUTPUT_DIR") {
            self.sweep.output_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MOSAIC_SEED") {
            let seed: u64 = raw.trim().parse().map_err(|e| SweepError::Env {
                name: "MOSAIC_SEED",
                reason: format!("{e}"),
            })?;
            self.sweep.seed = Some(seed);
        }
        Ok(())
    }

    /// Worker count to use: the configured one, or the available
    /// parallelism.
    pub fn worker_count(&self) -> usize {
        self.sweep.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seasons() -> u32 {
    500
}

const fn default_repeats() -> u32 {
    3
}

const fn default_channel_capacity() -> usize {
    64
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

const fn default_bees() -> CountRange {
    CountRange {
        start: 1,
        stop: 101,
        step: 50,
    }
}

const fn default_attraction() -> ParameterRange {
    ParameterRange {
        start: 0.5,
        stop: 1.0,
        step: 0.25,
    }
}

const fn default_infected_penalty() -> ParameterRange {
    ParameterRange {
        start: 0.0,
        stop: 1.0,
        step: 0.5,
    }
}

const fn default_non_buzz_penalty() -> ParameterRange {
    ParameterRange {
        start: 0.0,
        stop: 1.0,
        step: 0.5,
    }
}

const fn default_non_buzz_infected_penalty() -> ParameterRange {
    ParameterRange {
        start: 0.0,
        stop: 0.5,
        step: 0.25,
    }
}
