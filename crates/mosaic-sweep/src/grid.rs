//! The parameter grid: every combination of the swept parameters.

use std::fmt;

use mosaic_core::{ConfigError, ModelConfig};
use serde::Serialize;

use crate::config::GridConfig;

/// One point of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSet {
    /// Position in grid order.
    pub index: usize,
    /// Number of foraging bees.
    pub number_of_bees: u32,
    /// Attraction bias toward infected flowers.
    pub attraction: f64,
    /// Seed lost by infected mothers.
    pub infected_penalty: f64,
    /// Seed retained by non-buzz selfing.
    pub non_buzz_penalty: f64,
    /// Further seed retained by infected selfing mothers.
    pub non_buzz_infected_penalty: f64,
}

impl ParameterSet {
    /// The base model with this set's parameters applied.
    pub fn apply(&self, base: &ModelConfig) -> ModelConfig {
        let mut model = base.clone();
        model.season.number_of_bees = self.number_of_bees;
        model.season.attraction = self.attraction;
        model.reproduction.infected_penalty = self.infected_penalty;
        model.reproduction.non_buzz_penalty = self.non_buzz_penalty;
        model.reproduction.non_buzz_infected_penalty = self.non_buzz_infected_penalty;
        model
    }
}

/// Comma-separated `nbees,attr_inf,inf_penalty,nb_penalty,nb_inf_penalty`
/// columns.
impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.number_of_bees,
            self.attraction,
            self.infected_penalty,
            self.non_buzz_penalty,
            self.non_buzz_infected_penalty
        )
    }
}

/// Expand the grid in nested order bees, attraction, infected penalty,
/// non-buzz penalty, non-buzz infected penalty (last varies fastest).
///
/// Every set is validated against `base` so an out-of-range grid fails before
/// any chain is started.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if a range is malformed or a combination
/// is outside the model's permitted ranges.
pub fn build_grid(grid: &GridConfig, base: &ModelConfig) -> Result<Vec<ParameterSet>, ConfigError> {
    let bees = grid.bees.values("sweep.grid.bees")?;
    let attraction = grid.attraction.values("sweep.grid.attraction")?;
    let infected = grid.infected_penalty.values("sweep.grid.infected_penalty")?;
    let non_buzz = grid.non_buzz_penalty.values("sweep.grid.non_buzz_penalty")?;
    let non_buzz_infected = grid
        .non_buzz_infected_penalty
        .values("sweep.grid.non_buzz_infected_penalty")?;

    let mut sets = Vec::new();
    for &number_of_bees in &bees {
        for &attraction in &attraction {
            for &infected_penalty in &infected {
                for &non_buzz_penalty in &non_buzz {
                    for &non_buzz_infected_penalty in &non_buzz_infected {
                        let set = ParameterSet {
                            index: sets.len(),
                            number_of_bees,
                            attraction,
                            infected_penalty,
                            non_buzz_penalty,
                            non_buzz_infected_penalty,
                        };
                        set.apply(base).validate()?;
                        sets.push(set);
                    }
                }
            }
        }
    }
    Ok(sets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::{CountRange, ParameterRange};

    #[test]
    fn default_grid_has_32_sets_in_nested_order() {
        let sets = build_grid(&GridConfig::default(), &ModelConfig::default()).unwrap();
        assert_eq!(sets.len(), 32);

        let first = sets[0];
        assert_eq!(first.number_of_bees, 1);
        assert_eq!(first.attraction, 0.5);
        assert_eq!(first.non_buzz_infected_penalty, 0.0);

        // The last parameter varies fastest.
        assert_eq!(sets[1].non_buzz_infected_penalty, 0.25);
        assert_eq!(sets[1].non_buzz_penalty, 0.0);
        // Bees vary slowest.
        assert_eq!(sets[16].number_of_bees, 51);
        assert_eq!(sets[15].number_of_bees, 1);

        for (i, set) in sets.iter().enumerate() {
            assert_eq!(set.index, i);
        }
    }

    #[test]
    fn apply_overrides_only_swept_fields() {
        let base = ModelConfig::default();
        let set = ParameterSet {
            index: 0,
            number_of_bees: 51,
            attraction: 0.75,
            infected_penalty: 0.5,
            non_buzz_penalty: 0.0,
            non_buzz_infected_penalty: 0.25,
        };
        let model = set.apply(&base);
        assert_eq!(model.season.number_of_bees, 51);
        assert_eq!(model.season.attraction, 0.75);
        assert_eq!(model.reproduction.non_buzz_infected_penalty, 0.25);
        assert_eq!(model.season.flowers_per_plant, base.season.flowers_per_plant);
        assert_eq!(model.reproduction.sowing_budget, base.reproduction.sowing_budget);
    }

    #[test]
    fn out_of_range_combination_fails_fast() {
        let grid = GridConfig {
            attraction: ParameterRange {
                start: 0.5,
                stop: 1.6,
                step: 0.5,
            },
            ..GridConfig::default()
        };
        assert!(matches!(
            build_grid(&grid, &ModelConfig::default()),
            Err(ConfigError::Invalid {
                field: "season.attraction",
                ..
            })
        ));
    }

    #[test]
    fn zero_bees_fails_validation() {
        let grid = GridConfig {
            bees: CountRange {
                start: 0,
                stop: 2,
                step: 1,
            },
            ..GridConfig::default()
        };
        assert!(build_grid(&grid, &ModelConfig::default()).is_err());
    }

    #[test]
    fn display_gives_csv_prefix() {
        let set = ParameterSet {
            index: 3,
            number_of_bees: 1,
            attraction: 0.75,
            infected_penalty: 0.0,
            non_buzz_penalty: 0.5,
            non_buzz_infected_penalty: 0.25,
        };
        assert_eq!(set.to_string(), "1,0.75,0,0.5,0.25");
    }
}
