//! Chaining seasons into generations.
//!
//! The plant population is the only state carried from one season to the
//! next. A chain is therefore a fold over seasons that threads a single RNG
//! stream through every pollination season and reproduction step.

use mosaic_types::{PlantPopulation, SeedPopulation};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::reproduction::Reproduction;
use crate::season::{NoOpSink, PollinationSeason, SeasonResult, VisitationSink};

/// Everything produced by one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// The pollination season.
    pub season: SeasonResult,
    /// Seeds set at the end of the season.
    pub seeds: SeedPopulation,
    /// Plants sown for the following season.
    pub plants: PlantPopulation,
}

/// Run one pollination season followed by reproduction.
///
/// # Errors
///
/// Returns [`ModelError`] if the configuration is invalid or the flower
/// expansion overflows.
pub fn advance_generation<R: Rng + ?Sized>(
    plants: &PlantPopulation,
    model: &ModelConfig,
    rng: &mut R,
    sink: &mut dyn VisitationSink,
) -> Result<GenerationOutcome, ModelError> {
    let reproduction = Reproduction::new(model.reproduction.clone())?;
    let season = PollinationSeason::new(plants, model.season.clone())?.run(rng, sink);
    let (seeds, plants) = reproduction.next_generation(&season, rng);

    Ok(GenerationOutcome {
        season,
        seeds,
        plants,
    })
}

/// Run `seasons` generations from `initial`.
///
/// Returns the trajectory `[initial, gen 1, ..., gen seasons]`.
///
/// # Errors
///
/// Returns [`ModelError`] if the configuration is invalid or a flower
/// expansion overflows.
pub fn run_chain<R: Rng + ?Sized>(
    initial: &PlantPopulation,
    model: &ModelConfig,
    seasons: u32,
    rng: &mut R,
) -> Result<Vec<PlantPopulation>, ModelError> {
    model.validate()?;

    let capacity = usize::try_from(seasons).unwrap_or(0).saturating_add(1);
    let mut trajectory = Vec::with_capacity(capacity);
    let mut plants = initial.clone();

    for season in 1..=seasons {
        let outcome = advance_generation(&plants, model, rng, &mut NoOpSink)?;
        debug!(
            season,
            resistant = outcome.plants.resistant(),
            susceptible = outcome.plants.susceptible(),
            infected = outcome.plants.infected(),
            "Generation complete"
        );
        trajectory.push(plants);
        plants = outcome.plants;
    }
    trajectory.push(plants);

    Ok(trajectory)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::{SeasonConfig, default_initial_population};

    fn quick_model() -> ModelConfig {
        ModelConfig {
            season: SeasonConfig {
                season_length_hours: 40,
                ..SeasonConfig::default()
            },
            ..ModelConfig::default()
        }
    }

    #[test]
    fn trajectory_includes_initial_population() {
        let mut rng = StdRng::seed_from_u64(2);
        let initial = default_initial_population();
        let trajectory = run_chain(&initial, &quick_model(), 3, &mut rng).unwrap();
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory[0], initial);
        for plants in &trajectory[1..] {
            assert_eq!(plants.total(), 1000);
        }
    }

    #[test]
    fn zero_seasons_returns_initial_only() {
        let mut rng = StdRng::seed_from_u64(2);
        let initial = default_initial_population();
        let trajectory = run_chain(&initial, &quick_model(), 0, &mut rng).unwrap();
        assert_eq!(trajectory, vec![initial]);
    }

    #[test]
    fn generation_outcome_is_consistent() {
        let mut rng = StdRng::seed_from_u64(6);
        let outcome = advance_generation(
            &default_initial_population(),
            &quick_model(),
            &mut rng,
            &mut NoOpSink,
        )
        .unwrap();
        assert!(outcome.seeds.total() > 0);
        assert_eq!(outcome.plants.total(), 1000);
        assert_eq!(
            outcome.season.visitation.total() + outcome.season.surviving_flowers.total(),
            40_000
        );
    }

    #[test]
    fn extinct_population_stays_extinct() {
        let mut rng = StdRng::seed_from_u64(0);
        let trajectory = run_chain(&PlantPopulation::new(), &quick_model(), 2, &mut rng).unwrap();
        assert!(trajectory.iter().all(PlantPopulation::is_empty));
    }
}
