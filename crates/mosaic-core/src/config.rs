//! Configuration loading and typed config structures for the model engines.
//!
//! Every tunable of the greenhouse model lives in an explicit, immutable
//! config value handed to each engine at construction. Nothing is read from
//! global state.
//!
//! Configs deserialize from YAML with every field optional; missing fields
//! fall back to the reference parameterisation. [`ModelConfig::validate`]
//! rejects out-of-range values before they reach a simulation loop.

use std::path::Path;

use mosaic_types::{Genotype, PlantPopulation};
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its permitted range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Explanation of what is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Configuration for one generation: a pollination season followed by
/// reproduction and germination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Pollination season parameters.
    #[serde(default)]
    pub season: SeasonConfig,

    /// Reproduction and germination parameters.
    #[serde(default)]
    pub reproduction: ReproductionConfig,
}

impl ModelConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.season.validate()?;
        self.reproduction.validate()
    }
}

// ---------------------------------------------------------------------------
// SeasonConfig
// ---------------------------------------------------------------------------

/// Pollination season parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Attraction bias toward infected flowers, in `[0, 1]`. `0.5` is
    /// unbiased foraging.
    #[serde(default = "default_attraction")]
    pub attraction: f64,

    /// Flowers each plant carries at the start of the season.
    #[serde(default = "default_flowers_per_plant")]
    pub flowers_per_plant: u32,

    /// Maximum visits per bee per hour (one per minute).
    #[serde(default = "default_max_visit_rate")]
    pub max_visit_rate: u32,

    /// Length of the flowering window in hours (40 days of 16-hour light).
    #[serde(default = "default_season_length_hours")]
    pub season_length_hours: u32,

    /// Number of foraging bees.
    #[serde(default = "default_number_of_bees")]
    pub number_of_bees: u32,

    /// Greenhouse floor area in m². All flowers share a single plane.
    #[serde(default = "default_greenhouse_area")]
    pub greenhouse_area: f64,

    /// Flower density (per m²) at which the visit rate reaches half its
    /// maximum.
    #[serde(default = "default_half_saturation")]
    pub half_saturation: f64,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            attraction: default_attraction(),
            flowers_per_plant: default_flowers_per_plant(),
            max_visit_rate: default_max_visit_rate(),
            season_length_hours: default_season_length_hours(),
            number_of_bees: default_number_of_bees(),
            greenhouse_area: default_greenhouse_area(),
            half_saturation: default_half_saturation(),
        }
    }
}

impl SeasonConfig {
    /// Check every field against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("season.attraction", self.attraction)?;
        check_positive("season.flowers_per_plant", self.flowers_per_plant)?;
        check_positive("season.max_visit_rate", self.max_visit_rate)?;
        check_positive("season.season_length_hours", self.season_length_hours)?;
        check_positive("season.number_of_bees", self.number_of_bees)?;
        check_positive_finite("season.greenhouse_area", self.greenhouse_area)?;
        check_positive_finite("season.half_saturation", self.half_saturation)
    }
}

// ---------------------------------------------------------------------------
// ReproductionConfig
// ---------------------------------------------------------------------------

/// Seed production and germination parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Fraction of out-crossed seed lost when the mother is infected.
    #[serde(default = "default_infected_penalty")]
    pub infected_penalty: f64,

    /// Fraction of seed retained by unvisited flowers that self-pollinate
    /// passively instead of being buzz-pollinated.
    #[serde(default = "default_non_buzz_penalty")]
    pub non_buzz_penalty: f64,

    /// Further multiplier on selfed seed when the selfing mother is infected.
    #[serde(default = "default_non_buzz_infected_penalty")]
    pub non_buzz_infected_penalty: f64,

    /// Seeds the farmer sows each season.
    #[serde(default = "default_sowing_budget")]
    pub sowing_budget: u32,

    /// Fraction of sown `SS` seedlings that become infected plants.
    #[serde(default = "default_susceptible_infection_rate")]
    pub susceptible_infection_rate: f64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            infected_penalty: default_infected_penalty(),
            non_buzz_penalty: default_non_buzz_penalty(),
            non_buzz_infected_penalty: default_non_buzz_infected_penalty(),
            sowing_budget: default_sowing_budget(),
            susceptible_infection_rate: default_susceptible_infection_rate(),
        }
    }
}

impl ReproductionConfig {
    /// Check every field against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("reproduction.infected_penalty", self.infected_penalty)?;
        check_unit_interval("reproduction.non_buzz_penalty", self.non_buzz_penalty)?;
        check_unit_interval(
            "reproduction.non_buzz_infected_penalty",
            self.non_buzz_infected_penalty,
        )?;
        check_positive("reproduction.sowing_budget", self.sowing_budget)?;
        check_unit_interval(
            "reproduction.susceptible_infection_rate",
            self.susceptible_infection_rate,
        )
    }
}

// ---------------------------------------------------------------------------
// Initial population
// ---------------------------------------------------------------------------

/// The greenhouse planting every experiment starts from: half resistant
/// homozygotes, half susceptible homozygotes of which half are infected.
pub fn default_initial_population() -> PlantPopulation {
    PlantPopulation::from_counts([
        (Genotype::Rr, 500),
        (Genotype::SsInfected, 250),
        (Genotype::SsUninfected, 250),
    ])
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

fn check_positive(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1".to_owned(),
        })
    }
}

fn check_positive_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be a positive finite number"),
        })
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_attraction() -> f64 {
    0.81
}

const fn default_flowers_per_plant() -> u32 {
    40
}

const fn default_max_visit_rate() -> u32 {
    60
}

const fn default_season_length_hours() -> u32 {
    640
}

const fn default_number_of_bees() -> u32 {
    10
}

const fn default_greenhouse_area() -> f64 {
    1000.0
}

const fn default_half_saturation() -> f64 {
    100.0
}

const fn default_infected_penalty() -> f64 {
    0.36
}

const fn default_non_buzz_penalty() -> f64 {
    0.74
}

const fn default_non_buzz_infected_penalty() -> f64 {
    0.09
}

const fn default_sowing_budget() -> u32 {
    1000
}

const fn default_susceptible_infection_rate() -> f64 {
    0.5
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.season.flowers_per_plant, 40);
        assert_eq!(config.season.season_length_hours, 640);
        assert_eq!(config.season.number_of_bees, 10);
        assert_eq!(config.reproduction.sowing_budget, 1000);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
season:
  attraction: 0.5
  flowers_per_plant: 20
  max_visit_rate: 30
  season_length_hours: 100
  number_of_bees: 51
  greenhouse_area: 500.0
  half_saturation: 50.0

reproduction:
  infected_penalty: 0.5
  non_buzz_penalty: 0.0
  non_buzz_infected_penalty: 0.25
  sowing_budget: 200
  susceptible_infection_rate: 0.3
";
        let config = ModelConfig::parse(yaml).unwrap();

        assert_eq!(config.season.flowers_per_plant, 20);
        assert_eq!(config.season.number_of_bees, 51);
        assert_eq!(config.reproduction.sowing_budget, 200);
        assert!((config.season.attraction - 0.5).abs() < f64::EPSILON);
        assert!((config.reproduction.non_buzz_infected_penalty - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "season:\n  number_of_bees: 1\n";
        let config = ModelConfig::parse(yaml).unwrap();

        // Bees are overridden
        assert_eq!(config.season.number_of_bees, 1);
        // Everything else uses defaults
        assert_eq!(config.season.max_visit_rate, 60);
        assert_eq!(config.reproduction, ReproductionConfig::default());
    }

    #[test]
    fn attraction_outside_unit_interval_is_rejected() {
        let config = SeasonConfig {
            attraction: 1.2,
            ..SeasonConfig::default()
        };
        let err = config.validate();
        assert!(matches!(
            err,
            Err(ConfigError::Invalid {
                field: "season.attraction",
                ..
            })
        ));
    }

    #[test]
    fn nan_penalty_is_rejected() {
        let config = ReproductionConfig {
            non_buzz_penalty: f64::NAN,
            ..ReproductionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config = SeasonConfig {
            number_of_bees: 0,
            ..SeasonConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ReproductionConfig {
            sowing_budget: 0,
            ..ReproductionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_yaml_value_fails_parse() {
        let yaml = "reproduction:\n  infected_penalty: -0.1\n";
        assert!(matches!(
            ModelConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let yaml = "season: [unclosed";
        assert!(matches!(
            ModelConfig::parse(yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn initial_population_fills_the_sowing_budget() {
        let plants = default_initial_population();
        assert_eq!(plants.total(), u64::from(default_sowing_budget()));
        assert_eq!(plants.get(Genotype::Rs), 0);
    }

    #[test]
    fn greenhouse_area_must_be_positive() {
        let config = SeasonConfig {
            greenhouse_area: 0.0,
            ..SeasonConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
