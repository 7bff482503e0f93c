//! Landing probabilities: where a foraging bee lands next.
//!
//! Bees are biased toward infected flowers by the attraction parameter. The
//! infected band is sized first from the attraction-weighted infected
//! frequency; the resistant genotypes then share the rest in proportion to
//! their share of the non-infected flowers, and the uninfected susceptible
//! band absorbs whatever remains up to exactly `1.0`.
//!
//! A single uniform draw in `[0, 1)` maps to the first band whose cumulative
//! threshold exceeds it.

use mosaic_types::{FlowerPopulation, Genotype};

use crate::numeric::ratio;

/// Band order of the cumulative thresholds.
pub const BAND_ORDER: [Genotype; 5] = [
    Genotype::SsInfected,
    Genotype::Rr,
    Genotype::Rs,
    Genotype::Sr,
    Genotype::SsUninfected,
];

/// Probability that a bee lands on an infected flower.
///
/// `attraction` of `0.5` reproduces the infected frequency unchanged; higher
/// values skew toward infected flowers. Returns `0.0` when there are no
/// flowers or when both weighted terms vanish.
pub fn infected_probability(flowers: &FlowerPopulation, attraction: f64) -> f64 {
    let infected_frequency = ratio(u64::from(flowers.infected()), flowers.total());
    let uninfected_frequency = 1.0 - infected_frequency;

    let weighted_infected = infected_frequency * attraction;
    let weighted_uninfected = uninfected_frequency * (1.0 - attraction);
    let weight = weighted_infected + weighted_uninfected;

    if weight > 0.0 {
        weighted_infected / weight
    } else {
        0.0
    }
}

/// Cumulative landing thresholds in [`BAND_ORDER`].
///
/// Thresholds are non-decreasing, lie in `[0, 1]`, and the last one is
/// exactly `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingThresholds {
    thresholds: [f64; 5],
}

impl LandingThresholds {
    /// Compute the thresholds for the current flower population.
    pub fn compute(flowers: &FlowerPopulation, attraction: f64) -> Self {
        let infected_prob = infected_probability(flowers, attraction).clamp(0.0, 1.0);
        let uninfected_prob = 1.0 - infected_prob;
        let non_infected = flowers
            .total()
            .saturating_sub(u64::from(flowers.infected()));

        let mut thresholds = [0.0; 5];
        let mut previous = 0.0_f64;
        for (slot, genotype) in thresholds.iter_mut().zip(BAND_ORDER) {
            let raw = match genotype {
                Genotype::SsInfected => infected_prob,
                Genotype::Rr | Genotype::Rs | Genotype::Sr => {
                    let share = ratio(u64::from(flowers.get(genotype)), non_infected);
                    uninfected_prob.mul_add(share, previous)
                }
                Genotype::SsUninfected => 1.0,
            };
            previous = raw.clamp(previous, 1.0);
            *slot = previous;
        }

        Self { thresholds }
    }

    /// Map a uniform draw in `[0, 1)` to a genotype.
    pub fn choose(&self, draw: f64) -> Genotype {
        self.thresholds
            .iter()
            .zip(BAND_ORDER)
            .find(|&(&threshold, _)| draw < threshold)
            .map_or(Genotype::SsUninfected, |(_, genotype)| genotype)
    }

    /// The thresholds in [`BAND_ORDER`].
    pub const fn thresholds(&self) -> &[f64; 5] {
        &self.thresholds
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn reference_flowers() -> FlowerPopulation {
        FlowerPopulation::from_counts([
            (Genotype::Rr, 20_000),
            (Genotype::SsInfected, 10_000),
            (Genotype::SsUninfected, 10_000),
        ])
    }

    #[test]
    fn unbiased_attraction_reproduces_frequency() {
        let p = infected_probability(&reference_flowers(), 0.5);
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn attraction_skews_toward_infected() {
        let p = infected_probability(&reference_flowers(), 0.81);
        // 0.25 * 0.81 / (0.25 * 0.81 + 0.75 * 0.19)
        let expected = 0.2025 / (0.2025 + 0.1425);
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn no_flowers_means_zero_infected_probability() {
        assert!(infected_probability(&FlowerPopulation::new(), 0.81).abs() < f64::EPSILON);
    }

    #[test]
    fn vanishing_weights_resolve_to_zero() {
        // All flowers infected but bees never choose infected flowers.
        let flowers = FlowerPopulation::from_counts([(Genotype::SsInfected, 100)]);
        assert!(infected_probability(&flowers, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn thresholds_are_monotone_and_end_at_one() {
        let populations = [
            reference_flowers(),
            FlowerPopulation::new(),
            FlowerPopulation::from_counts([(Genotype::Rs, 3), (Genotype::Sr, 7)]),
            FlowerPopulation::from_counts([(Genotype::SsInfected, 1)]),
            FlowerPopulation::from_counts([
                (Genotype::Rr, 1),
                (Genotype::Rs, 1),
                (Genotype::Sr, 1),
                (Genotype::SsInfected, 1),
                (Genotype::SsUninfected, 1),
            ]),
        ];
        for flowers in &populations {
            for attraction in [0.0, 0.25, 0.5, 0.81, 1.0] {
                let t = LandingThresholds::compute(flowers, attraction);
                let values = t.thresholds();
                assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
                assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
                assert!((values[4] - 1.0).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn draws_map_to_bands() {
        let t = LandingThresholds::compute(&reference_flowers(), 0.5);
        // Bands: SS_i [0, .25), RR [.25, .75), RS and SR empty, SS_u [.75, 1).
        assert_eq!(t.choose(0.0), Genotype::SsInfected);
        assert_eq!(t.choose(0.2499), Genotype::SsInfected);
        assert_eq!(t.choose(0.25), Genotype::Rr);
        assert_eq!(t.choose(0.7499), Genotype::Rr);
        assert_eq!(t.choose(0.75), Genotype::SsUninfected);
        assert_eq!(t.choose(0.9999), Genotype::SsUninfected);
    }

    #[test]
    fn absent_genotypes_are_never_chosen() {
        let t = LandingThresholds::compute(&reference_flowers(), 0.81);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let choice = t.choose(rng.random());
            assert_ne!(choice, Genotype::Rs);
            assert_ne!(choice, Genotype::Sr);
        }
    }
}
