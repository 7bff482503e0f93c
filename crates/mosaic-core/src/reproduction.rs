//! Seed production at the end of a season.
//!
//! Every recorded cross sets seed on the mother flower, reduced when the
//! mother is infected. Flowers that survived the season unvisited
//! self-pollinate without buzzing, which yields fewer seeds and fewer still on
//! an infected plant. Each batch of seeds is split across the Mendelian
//! offspring of its parents by fair stochastic rounding. Selfed batches are
//! fractional; only the per-offspring shares are whole seeds.
//!
//! Crosses are processed in `(father, mother)` label order, then selfing in
//! genotype label order. Every nonzero ledger entry and every genotype with
//! surviving flowers draws once per non-final offspring type, even when its
//! penalised seed count is zero. This fixes how a seeded RNG maps to a seed
//! population.

use std::collections::BTreeSet;

use mosaic_types::{Allele, Genotype, PlantPopulation, SeedGenotype, SeedPopulation};
use rand::Rng;
use tracing::debug;

use crate::config::ReproductionConfig;
use crate::error::ModelError;
use crate::germination::germinate;
use crate::numeric::{round_count, to_count};
use crate::season::SeasonResult;

/// Turns a finished season into seeds and then plants.
#[derive(Debug, Clone)]
pub struct Reproduction {
    config: ReproductionConfig,
}

impl Reproduction {
    /// Create a reproduction engine.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if `config` is out of range.
    pub fn new(config: ReproductionConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's parameters.
    pub const fn config(&self) -> &ReproductionConfig {
        &self.config
    }

    /// Seeds set by `crosses` cross-pollination events on a `mother` flower.
    pub fn outcross_seed_count(&self, crosses: u32, mother: Genotype) -> u32 {
        if mother.is_infected() {
            round_count(f64::from(crosses) * (1.0 - self.config.infected_penalty))
        } else {
            crosses
        }
    }

    /// Seeds set by `flowers` unvisited flowers of `genotype` selfing. The
    /// result is fractional and is only rounded when split across offspring.
    pub fn selfed_seed_count(&self, flowers: u32, genotype: Genotype) -> f64 {
        let mut seeds = f64::from(flowers) * self.config.non_buzz_penalty;
        if genotype.is_infected() {
            seeds *= self.config.non_buzz_infected_penalty;
        }
        seeds
    }

    /// Accumulate the season's seed population.
    pub fn seed_population<R: Rng + ?Sized>(
        &self,
        season: &SeasonResult,
        rng: &mut R,
    ) -> SeedPopulation {
        let mut seeds = SeedPopulation::new();

        for (pair, count) in season.crosses.nonzero() {
            let seed_count = f64::from(self.outcross_seed_count(count, pair.mother));
            mendelian_cross(
                pair.father.alleles(),
                pair.mother.alleles(),
                seed_count,
                &mut seeds,
                rng,
            );
        }

        for (genotype, flowers) in season.surviving_flowers.iter() {
            if flowers == 0 {
                continue;
            }
            let seed_count = self.selfed_seed_count(flowers, genotype);
            mendelian_cross(
                genotype.alleles(),
                genotype.alleles(),
                seed_count,
                &mut seeds,
                rng,
            );
        }

        debug!(
            seeds = seeds.total(),
            crosses = season.crosses.total(),
            selfing_flowers = season.surviving_flowers.total(),
            "Seed population accumulated"
        );

        seeds
    }

    /// Seeds then plants: the population sown for the next season.
    pub fn next_generation<R: Rng + ?Sized>(
        &self,
        season: &SeasonResult,
        rng: &mut R,
    ) -> (SeedPopulation, PlantPopulation) {
        let seeds = self.seed_population(season, rng);
        let plants = germinate(
            &seeds,
            self.config.sowing_budget,
            self.config.susceptible_infection_rate,
        );
        (seeds, plants)
    }
}

/// Distinct offspring genotypes of a cross, father allele first, in seed
/// label order.
pub fn offspring(father: (Allele, Allele), mother: (Allele, Allele)) -> Vec<SeedGenotype> {
    let (f1, f2) = father;
    let (m1, m2) = mother;
    let set: BTreeSet<SeedGenotype> = [f1, f2]
        .into_iter()
        .flat_map(|f| [m1, m2].into_iter().map(move |m| SeedGenotype::from_alleles(f, m)))
        .collect();
    set.into_iter().collect()
}

/// Share `total` seeds across `parts` types by fair stochastic rounding.
///
/// With `remaining` seeds left for the last `k` types, the next type gets
/// `floor(remaining / k)` with probability `1 / k` and `ceil(remaining / k)`
/// otherwise, never more than the whole seeds left. The final type takes the
/// floor of whatever remains without a draw, so the shares always sum to
/// `floor(total)`. Negative and NaN totals are treated as zero.
pub fn fair_split<R: Rng + ?Sized>(total: f64, parts: usize, rng: &mut R) -> Vec<u32> {
    let mut shares = Vec::with_capacity(parts);
    let mut remaining = total.max(0.0);

    for index in 0..parts {
        let left = parts.saturating_sub(index);
        let share = if left <= 1 {
            to_count(remaining.floor())
        } else {
            let divisor = f64::from(u32::try_from(left).unwrap_or(u32::MAX));
            let even = remaining / divisor;
            let draw: f64 = rng.random();
            let rounded = if draw < divisor.recip() {
                even.floor()
            } else {
                even.ceil()
            };
            to_count(rounded.min(remaining.floor()))
        };
        shares.push(share);
        remaining = (remaining - f64::from(share)).max(0.0);
    }

    shares
}

/// Distribute `seed_count` seeds of a cross over its offspring set and add
/// them to `seeds`. A zero count still draws for every non-final type.
pub fn mendelian_cross<R: Rng + ?Sized>(
    father: (Allele, Allele),
    mother: (Allele, Allele),
    seed_count: f64,
    seeds: &mut SeedPopulation,
    rng: &mut R,
) {
    let types = offspring(father, mother);
    let shares = fair_split(seed_count, types.len(), rng);
    for (genotype, share) in types.into_iter().zip(shares) {
        seeds.add(genotype, share);
    }
}

/// Build the next plant population from a finished season.
///
/// # Errors
///
/// Returns [`ModelError::Config`] if `config` is out of range.
pub fn reproduce<R: Rng + ?Sized>(
    season: &SeasonResult,
    config: &ReproductionConfig,
    rng: &mut R,
) -> Result<PlantPopulation, ModelError> {
    let engine = Reproduction::new(config.clone())?;
    let (_, plants) = engine.next_generation(season, rng);
    Ok(plants)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::float_cmp
)]
mod tests {
    use mosaic_types::{CrossLedger, FlowerPopulation, SeasonalVisitation};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn engine() -> Reproduction {
        Reproduction::new(ReproductionConfig::default()).unwrap()
    }

    fn season_with(crosses: CrossLedger, surviving: FlowerPopulation) -> SeasonResult {
        SeasonResult {
            visitation: SeasonalVisitation::new(),
            surviving_flowers: surviving,
            crosses,
        }
    }

    #[test]
    fn offspring_sets() {
        use Allele::{R, S};
        assert_eq!(offspring((R, R), (S, S)), vec![SeedGenotype::Rs]);
        assert_eq!(offspring((S, S), (R, R)), vec![SeedGenotype::Sr]);
        assert_eq!(offspring((R, R), (R, R)), vec![SeedGenotype::Rr]);
        assert_eq!(
            offspring((R, S), (S, S)),
            vec![SeedGenotype::Rs, SeedGenotype::Ss]
        );
        assert_eq!(
            offspring((R, S), (R, S)),
            vec![
                SeedGenotype::Rr,
                SeedGenotype::Rs,
                SeedGenotype::Sr,
                SeedGenotype::Ss
            ]
        );
    }

    #[test]
    fn fair_split_sums_exactly() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for total in [0.0, 1.0, 2.0, 3.0, 7.0, 29.0, 1000.0, 4441.0] {
                for parts in 1..=4 {
                    let shares = fair_split(total, parts, &mut rng);
                    assert_eq!(shares.len(), parts);
                    assert_eq!(f64::from(shares.iter().sum::<u32>()), total);
                }
            }
        }
    }

    #[test]
    fn fractional_totals_sum_to_their_floor() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (total, whole) in [(0.5, 0), (1.9, 1), (2.664, 2), (8.5, 8), (29.6, 29)] {
                for parts in 1..=4 {
                    let shares = fair_split(total, parts, &mut rng);
                    assert_eq!(shares.len(), parts);
                    assert_eq!(shares.iter().sum::<u32>(), whole, "{total} over {parts}");
                }
            }
        }
    }

    #[test]
    fn fair_split_shares_are_near_even() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let shares = fair_split(10.0, 4, &mut rng);
            assert!(shares.iter().all(|&s| (2..=4).contains(&s)), "{shares:?}");
        }
    }

    #[test]
    fn single_part_takes_everything_without_drawing() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(1);
        assert_eq!(fair_split(17.0, 1, &mut a), vec![17]);
        assert_eq!(fair_split(17.9, 1, &mut a), vec![17]);
        // The stream is untouched.
        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn zero_seed_cross_still_draws() {
        // RS x SS_i at full infected penalty: two offspring types, no seed.
        let config = ReproductionConfig {
            infected_penalty: 1.0,
            ..ReproductionConfig::default()
        };
        let repro = Reproduction::new(config).unwrap();
        let mut crosses = CrossLedger::new();
        crosses.record(Genotype::Rs, Genotype::SsInfected);
        let season = season_with(crosses, FlowerPopulation::new());

        let mut rng = StdRng::seed_from_u64(13);
        let seeds = repro.seed_population(&season, &mut rng);
        assert!(seeds.is_empty());

        let mut expected = StdRng::seed_from_u64(13);
        let _: f64 = expected.random();
        assert_eq!(rng.random::<u64>(), expected.random::<u64>());
    }

    #[test]
    fn zero_seed_selfing_still_draws() {
        // Selfing with non_buzz_penalty = 0 yields no seed but still draws
        // three times for the RS self (four offspring types).
        let config = ReproductionConfig {
            non_buzz_penalty: 0.0,
            ..ReproductionConfig::default()
        };
        let repro = Reproduction::new(config).unwrap();
        let surviving = FlowerPopulation::from_counts([(Genotype::Rs, 40)]);
        let season = season_with(CrossLedger::new(), surviving);

        let mut rng = StdRng::seed_from_u64(21);
        let seeds = repro.seed_population(&season, &mut rng);
        assert!(seeds.is_empty());

        let mut expected = StdRng::seed_from_u64(21);
        for _ in 0..3 {
            let _: f64 = expected.random();
        }
        assert_eq!(rng.random::<u64>(), expected.random::<u64>());
    }

    #[test]
    fn cross_rr_by_ss_yields_only_rs() {
        let mut crosses = CrossLedger::new();
        for _ in 0..100 {
            crosses.record(Genotype::Rr, Genotype::SsUninfected);
        }
        let season = season_with(crosses, FlowerPopulation::new());
        let mut rng = StdRng::seed_from_u64(4);
        let seeds = engine().seed_population(&season, &mut rng);

        assert_eq!(seeds.get(SeedGenotype::Rs), 100);
        assert_eq!(seeds.total(), 100);
    }

    #[test]
    fn infected_mother_loses_seed() {
        let repro = engine();
        // round(100 * 0.64)
        assert_eq!(repro.outcross_seed_count(100, Genotype::SsInfected), 64);
        assert_eq!(repro.outcross_seed_count(100, Genotype::SsUninfected), 100);
        assert_eq!(repro.outcross_seed_count(100, Genotype::Rr), 100);
    }

    #[test]
    fn selfing_applies_both_penalties_without_rounding() {
        let repro = engine();
        // 40 * 0.74
        assert!((repro.selfed_seed_count(40, Genotype::Rs) - 29.6).abs() < 1e-9);
        // 40 * 0.74 * 0.09
        assert!((repro.selfed_seed_count(40, Genotype::SsInfected) - 2.664).abs() < 1e-9);
        assert!(repro.selfed_seed_count(0, Genotype::Rr).abs() < f64::EPSILON);
    }

    #[test]
    fn selfing_a_heterozygote_partitions_exactly() {
        let surviving = FlowerPopulation::from_counts([(Genotype::Rs, 40)]);
        let season = season_with(CrossLedger::new(), surviving);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let seeds = engine().seed_population(&season, &mut rng);
            // floor(29.6)
            assert_eq!(seeds.total(), 29);
            for (_, count) in seeds.iter() {
                assert!((6..=8).contains(&count), "{seeds:?}");
            }
        }
    }

    #[test]
    fn fractional_selfing_rounds_each_share_fairly() {
        // 17 RS flowers at half retention set 8.5 seeds. The first of four
        // offspring types gets floor(2.125) = 2 with probability 1/4 and
        // ceil(2.125) = 3 otherwise.
        let config = ReproductionConfig {
            non_buzz_penalty: 0.5,
            ..ReproductionConfig::default()
        };
        let repro = Reproduction::new(config).unwrap();
        let surviving = FlowerPopulation::from_counts([(Genotype::Rs, 17)]);
        let season = season_with(CrossLedger::new(), surviving);

        let mut rounded_up = 0;
        for seed in 0..1000 {
            let mut rng = StdRng::seed_from_u64(seed);
            let seeds = repro.seed_population(&season, &mut rng);
            assert_eq!(seeds.total(), 8);
            let rr = seeds.get(SeedGenotype::Rr);
            assert!((2..=3).contains(&rr));
            if rr == 3 {
                rounded_up += 1;
            }
        }
        assert!((650..=850).contains(&rounded_up), "{rounded_up}");
    }

    #[test]
    fn empty_season_produces_empty_population() {
        let season = season_with(CrossLedger::new(), FlowerPopulation::new());
        let mut rng = StdRng::seed_from_u64(0);
        let plants = reproduce(&season, &ReproductionConfig::default(), &mut rng).unwrap();
        assert!(plants.is_empty());
    }

    #[test]
    fn reproduce_sows_full_budget() {
        let mut crosses = CrossLedger::new();
        for _ in 0..300 {
            crosses.record(Genotype::Rr, Genotype::SsInfected);
        }
        let surviving =
            FlowerPopulation::from_counts([(Genotype::Rr, 500), (Genotype::SsUninfected, 200)]);
        let season = season_with(crosses, surviving);
        let mut rng = StdRng::seed_from_u64(8);
        let plants = reproduce(&season, &ReproductionConfig::default(), &mut rng).unwrap();
        assert_eq!(plants.total(), 1000);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ReproductionConfig {
            infected_penalty: 2.0,
            ..ReproductionConfig::default()
        };
        assert!(matches!(
            Reproduction::new(config),
            Err(ModelError::Config { .. })
        ));
    }
}
