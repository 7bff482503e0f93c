//! The pollination season engine.
//!
//! A season runs for a fixed number of hours. Each hour the visit rate is
//! derived from the current flower density, the landing thresholds are
//! recomputed from the current flower mix, and every foraging event draws
//! once to pick a candidate genotype. A successful visit destroys the flower
//! and, when it follows another successful visit in the same hour, records a
//! `(father, mother)` cross.
//!
//! Flower deaths are applied at the end of each hour. Within an hour a
//! candidate is only available while it still has flowers that have not
//! already been visited that hour, so one successful visit always accounts for
//! exactly one flower.

use mosaic_types::{
    CrossLedger, FlowerPopulation, Genotype, HourlyVisitation, PlantPopulation, SeasonalVisitation,
};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::SeasonConfig;
use crate::error::ModelError;
use crate::landing::LandingThresholds;
use crate::numeric::{count_as_f64, round_count};

// ---------------------------------------------------------------------------
// Hourly diagnostics
// ---------------------------------------------------------------------------

/// Receives the visitation tally of every hour as the season runs.
pub trait VisitationSink {
    /// Called exactly once per hour, after flower deaths are applied.
    /// Hours with no foraging events deliver an all-zero tally.
    fn on_hour(&mut self, hour: u32, visits: &HourlyVisitation);
}

/// A sink that discards every hour.
pub struct NoOpSink;

impl VisitationSink for NoOpSink {
    fn on_hour(&mut self, _hour: u32, _visits: &HourlyVisitation) {}
}

impl<F> VisitationSink for F
where
    F: FnMut(u32, &HourlyVisitation),
{
    fn on_hour(&mut self, hour: u32, visits: &HourlyVisitation) {
        self(hour, visits);
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a season leaves behind for reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonResult {
    /// Successful visits per genotype over the whole season.
    pub visitation: SeasonalVisitation,
    /// Flowers still alive when the season ends. These self-pollinate.
    pub surviving_flowers: FlowerPopulation,
    /// Cross-pollination events recorded during the season.
    pub crosses: CrossLedger,
}

/// Summary of a single simulated hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourReport {
    /// One-based hour index within the season.
    pub hour: u32,
    /// Visits per bee this hour.
    pub visit_rate: u32,
    /// Foraging attempts this hour (`visit_rate * number_of_bees`).
    pub foraging_events: u32,
    /// Attempts that landed on an available flower.
    pub successful_visits: u32,
    /// Successful visits per genotype.
    pub visits: HourlyVisitation,
}

// ---------------------------------------------------------------------------
// PollinationSeason
// ---------------------------------------------------------------------------

/// State of one pollination season in progress.
#[derive(Debug, Clone)]
pub struct PollinationSeason {
    config: SeasonConfig,
    flowers: FlowerPopulation,
    crosses: CrossLedger,
    visitation: SeasonalVisitation,
    hours_elapsed: u32,
}

impl PollinationSeason {
    /// Start a season from a plant population.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if `config` is out of range, or
    /// [`ModelError::ArithmeticOverflow`] if expanding plants into flowers
    /// overflows.
    pub fn new(plants: &PlantPopulation, config: SeasonConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let flowers = plants
            .checked_scale(config.flowers_per_plant)
            .ok_or(ModelError::ArithmeticOverflow {
                context: "flower expansion",
            })?;

        Ok(Self {
            config,
            flowers,
            crosses: CrossLedger::new(),
            visitation: SeasonalVisitation::new(),
            hours_elapsed: 0,
        })
    }

    /// Flowers per square metre of greenhouse floor.
    pub fn density(&self) -> f64 {
        count_as_f64(self.flowers.total()) / self.config.greenhouse_area
    }

    /// Visits per bee per hour at the current density, following a
    /// saturating type III response.
    pub fn visit_rate(&self) -> u32 {
        let density_sq = self.density().powi(2);
        let half_sq = self.config.half_saturation.powi(2);
        let max_rate = f64::from(self.config.max_visit_rate);
        round_count(max_rate * density_sq / (half_sq + density_sq))
    }

    /// Landing thresholds for the current flower mix.
    pub fn landing_thresholds(&self) -> LandingThresholds {
        LandingThresholds::compute(&self.flowers, self.config.attraction)
    }

    /// Simulate the next hour.
    pub fn run_hour<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        sink: &mut dyn VisitationSink,
    ) -> HourReport {
        self.hours_elapsed = self.hours_elapsed.saturating_add(1);
        let hour = self.hours_elapsed;

        let visit_rate = self.visit_rate();
        let thresholds = self.landing_thresholds();
        let foraging_events = visit_rate.saturating_mul(self.config.number_of_bees);

        let mut visits = HourlyVisitation::new();
        let mut successful_visits: u32 = 0;
        let mut previous: Option<Genotype> = None;

        for _ in 0..foraging_events {
            let candidate = thresholds.choose(rng.random());
            if self.flowers.get(candidate) <= visits.get(candidate) {
                continue;
            }
            visits.add(candidate, 1);
            successful_visits = successful_visits.saturating_add(1);
            if let Some(father) = previous {
                self.crosses.record(father, candidate);
            }
            previous = Some(candidate);
        }

        self.flowers.deplete(&visits);
        self.visitation.absorb(&visits);
        sink.on_hour(hour, &visits);

        trace!(
            hour,
            visit_rate,
            foraging_events,
            successful_visits,
            flowers_remaining = self.flowers.total(),
            "Hour complete"
        );

        HourReport {
            hour,
            visit_rate,
            foraging_events,
            successful_visits,
            visits,
        }
    }

    /// Run the remaining hours of the season and hand over its results.
    pub fn run<R: Rng + ?Sized>(
        mut self,
        rng: &mut R,
        sink: &mut dyn VisitationSink,
    ) -> SeasonResult {
        while self.hours_elapsed < self.config.season_length_hours {
            self.run_hour(rng, sink);
        }

        debug!(
            hours = self.hours_elapsed,
            visits = self.visitation.total(),
            crosses = self.crosses.total(),
            surviving_flowers = self.flowers.total(),
            "Season complete"
        );

        SeasonResult {
            visitation: self.visitation,
            surviving_flowers: self.flowers,
            crosses: self.crosses,
        }
    }

    /// Current flower population.
    pub const fn flowers(&self) -> &FlowerPopulation {
        &self.flowers
    }

    /// Crosses recorded so far.
    pub const fn crosses(&self) -> &CrossLedger {
        &self.crosses
    }

    /// Successful visits so far.
    pub const fn visitation(&self) -> &SeasonalVisitation {
        &self.visitation
    }

    /// Hours simulated so far.
    pub const fn hours_elapsed(&self) -> u32 {
        self.hours_elapsed
    }
}

/// Run a full pollination season from a plant population.
///
/// # Errors
///
/// Returns [`ModelError`] if the configuration is invalid or the flower
/// expansion overflows.
pub fn run_season<R: Rng + ?Sized>(
    plants: &PlantPopulation,
    config: &SeasonConfig,
    rng: &mut R,
    sink: &mut dyn VisitationSink,
) -> Result<SeasonResult, ModelError> {
    let season = PollinationSeason::new(plants, config.clone())?;
    Ok(season.run(rng, sink))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use mosaic_types::GenotypeKey;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::default_initial_population;

    fn short_season(hours: u32) -> SeasonConfig {
        SeasonConfig {
            season_length_hours: hours,
            ..SeasonConfig::default()
        }
    }

    #[test]
    fn flowers_are_expanded_from_plants() {
        let season =
            PollinationSeason::new(&default_initial_population(), SeasonConfig::default()).unwrap();
        assert_eq!(season.flowers().get(Genotype::Rr), 20_000);
        assert_eq!(season.flowers().get(Genotype::SsInfected), 10_000);
        assert_eq!(season.flowers().total(), 40_000);
        assert_eq!(season.crosses().iter().count(), 25);
    }

    #[test]
    fn visit_rate_follows_saturating_response() {
        // 40 000 flowers over 1000 m² is density 40:
        // 60 * 1600 / (10000 + 1600) = 8.27...
        let season =
            PollinationSeason::new(&default_initial_population(), SeasonConfig::default()).unwrap();
        assert!((season.density() - 40.0).abs() < f64::EPSILON);
        assert_eq!(season.visit_rate(), 8);
    }

    #[test]
    fn flower_overflow_is_an_error() {
        let plants = PlantPopulation::from_counts([(Genotype::Rr, u32::MAX)]);
        let err = PollinationSeason::new(&plants, SeasonConfig::default());
        assert!(matches!(err, Err(ModelError::ArithmeticOverflow { .. })));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SeasonConfig {
            attraction: -0.5,
            ..SeasonConfig::default()
        };
        let err = PollinationSeason::new(&default_initial_population(), config);
        assert!(matches!(err, Err(ModelError::Config { .. })));
    }

    #[test]
    fn hourly_tally_matches_successful_visits() {
        let mut season =
            PollinationSeason::new(&default_initial_population(), SeasonConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let before = season.flowers().clone();
            let report = season.run_hour(&mut rng, &mut NoOpSink);
            assert_eq!(report.visits.total(), u64::from(report.successful_visits));
            assert!(report.successful_visits <= report.foraging_events);
            for &g in Genotype::ALL {
                assert_eq!(
                    season.flowers().get(g),
                    before.get(g) - report.visits.get(g),
                    "{g} flowers must drop by exactly its visits"
                );
            }
        }
    }

    #[test]
    fn zero_flower_genotypes_are_never_visited() {
        let mut season =
            PollinationSeason::new(&default_initial_population(), SeasonConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut attempts: u64 = 0;
        while attempts < 10_000 {
            let report = season.run_hour(&mut rng, &mut NoOpSink);
            attempts += u64::from(report.foraging_events);
            assert_eq!(report.visits.get(Genotype::Rs), 0);
            assert_eq!(report.visits.get(Genotype::Sr), 0);
        }
        assert_eq!(season.visitation().get(Genotype::Rs), 0);
        assert_eq!(season.crosses().get(Genotype::Rr, Genotype::Rs), 0);
    }

    #[test]
    fn single_flower_is_visited_once_then_never_again() {
        // One infected flower on a tiny floor: every draw lands on SS_i and
        // the hour has far more events than flowers.
        let config = SeasonConfig {
            flowers_per_plant: 1,
            greenhouse_area: 0.001,
            half_saturation: 1.0,
            season_length_hours: 4,
            ..SeasonConfig::default()
        };
        let plants = PlantPopulation::from_counts([(Genotype::SsInfected, 1)]);
        let mut season = PollinationSeason::new(&plants, config).unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        let first = season.run_hour(&mut rng, &mut NoOpSink);
        assert_eq!(first.visit_rate, 60);
        assert_eq!(first.foraging_events, 600);
        assert_eq!(first.successful_visits, 1);
        assert_eq!(first.visits.get(Genotype::SsInfected), 1);
        assert!(season.flowers().is_empty());

        let mut later = Vec::new();
        let mut sink = |hour: u32, visits: &HourlyVisitation| later.push((hour, visits.total()));
        let result = season.run(&mut rng, &mut sink);
        assert_eq!(later, vec![(2, 0), (3, 0), (4, 0)]);
        assert_eq!(result.visitation.get(Genotype::SsInfected), 1);
        assert_eq!(result.visitation.total(), 1);
        assert_eq!(result.crosses.total(), 0);
        assert!(result.surviving_flowers.is_empty());
    }

    #[test]
    fn sink_sees_every_hour_once() {
        let mut hours = Vec::new();
        let mut sink = |hour: u32, visits: &HourlyVisitation| hours.push((hour, visits.total()));
        let mut rng = StdRng::seed_from_u64(5);
        let result =
            run_season(&default_initial_population(), &short_season(12), &mut rng, &mut sink)
                .unwrap();

        let indices: Vec<u32> = hours.iter().map(|&(h, _)| h).collect();
        assert_eq!(indices, (1..=12).collect::<Vec<_>>());
        let summed: u64 = hours.iter().map(|&(_, v)| v).sum();
        assert_eq!(summed, result.visitation.total());
    }

    #[test]
    fn empty_population_still_reports_zero_hours() {
        let mut zero_hours = 0;
        let mut sink = |_: u32, visits: &HourlyVisitation| {
            assert!(visits.is_empty());
            zero_hours += 1;
        };
        let mut rng = StdRng::seed_from_u64(1);
        let result =
            run_season(&PlantPopulation::new(), &short_season(5), &mut rng, &mut sink).unwrap();
        assert_eq!(zero_hours, 5);
        assert_eq!(result.crosses.total(), 0);
        assert!(result.surviving_flowers.is_empty());
    }

    #[test]
    fn season_result_serialises_with_labels() {
        let mut rng = StdRng::seed_from_u64(2);
        let result = run_season(
            &default_initial_population(),
            &short_season(2),
            &mut rng,
            &mut NoOpSink,
        )
        .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["crosses"]["RR:SS_i"].is_u64());
        assert!(json["surviving_flowers"]["SS_u"].is_u64());
        assert_eq!(json["crosses"].as_object().unwrap().len(), 25);
    }

    #[test]
    fn crosses_follow_successful_visits() {
        let mut rng = StdRng::seed_from_u64(21);
        let result = run_season(
            &default_initial_population(),
            &short_season(20),
            &mut rng,
            &mut NoOpSink,
        )
        .unwrap();

        // Each hour with k successes contributes k - 1 crosses.
        let visits = result.visitation.total();
        let crosses = result.crosses.total();
        assert!(crosses < visits);
        assert!(crosses + 20 >= visits);
    }
}
