//! Germination: sowing a fixed budget of seeds from the seed pool.
//!
//! Seed genotypes are sown in label order `RR, RS, SR, SS`. Each takes its
//! share of the pool not yet sown, scaled to the budget still unassigned and
//! rounded to the nearest plant. Because the last genotype with seeds always
//! takes a share of `1.0` of what is left, the plants sum exactly to the
//! budget. The rounding is order dependent and this order is fixed.
//!
//! Sown `SS` seedlings are then split into infected and uninfected plants.

use mosaic_types::{Genotype, GenotypeKey, PlantPopulation, SeedGenotype, SeedPopulation, Tally};

use crate::numeric::{count_as_f64, ratio, round_count};

/// Allocate `budget` plants across seed genotypes.
pub fn allocate(seeds: &SeedPopulation, budget: u32) -> Tally<SeedGenotype> {
    let mut sown = Tally::new();
    let mut unprocessed = seeds.total();
    let mut unassigned = budget;

    for &genotype in SeedGenotype::ALL {
        let available = u64::from(seeds.get(genotype));
        let share = ratio(available, unprocessed);
        let plants = round_count(count_as_f64(u64::from(unassigned)) * share).min(unassigned);
        sown.set(genotype, plants);
        unassigned = unassigned.saturating_sub(plants);
        unprocessed = unprocessed.saturating_sub(available);
    }

    sown
}

/// Split sown `SS` seedlings into `(infected, uninfected)`.
pub fn split_susceptible(susceptible: u32, infection_rate: f64) -> (u32, u32) {
    let infected = round_count(f64::from(susceptible) * infection_rate).min(susceptible);
    (infected, susceptible.saturating_sub(infected))
}

/// Sow the next plant population from a seed pool. An empty pool yields an
/// empty population.
pub fn germinate(seeds: &SeedPopulation, budget: u32, infection_rate: f64) -> PlantPopulation {
    let sown = allocate(seeds, budget);
    let mut plants = PlantPopulation::new();
    for &genotype in SeedGenotype::ALL {
        if let Some(plant) = genotype.plant_genotype() {
            plants.set(plant, sown.get(genotype));
        }
    }
    let (infected, uninfected) = split_susceptible(sown.get(SeedGenotype::Ss), infection_rate);
    plants.set(Genotype::SsInfected, infected);
    plants.set(Genotype::SsUninfected, uninfected);
    plants
}
