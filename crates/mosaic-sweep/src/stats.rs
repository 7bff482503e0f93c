//! Summary statistics over repeated chains.
//!
//! For each season the repeats of a parameter set are reduced to a mean,
//! a population standard deviation, and a standard error of the mean for
//! the susceptible (`SS_i + SS_u`) and resistant (`RR + RS + SR`) totals.

use mosaic_types::PlantPopulation;
use serde::Serialize;

/// Mean, spread, and standard error of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation (divides by `n`).
    pub std: f64,
    /// Sample standard deviation divided by `sqrt(n)`; `0.0` when `n < 2`.
    pub sem: f64,
}

impl Summary {
    /// Summarise a sample. An empty sample summarises to zeros.
    #[allow(clippy::cast_precision_loss)]
    pub fn of(values: &[u64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                std: 0.0,
                sem: 0.0,
            };
        }
        let count = n as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count;
        let squares: f64 = values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();

        let std = (squares / count).sqrt();
        let sem = if n < 2 {
            0.0
        } else {
            (squares / (count - 1.0)).sqrt() / count.sqrt()
        };

        Self { mean, std, sem }
    }
}

/// Which total a summary row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Population {
    /// `SS_i + SS_u`.
    Susceptible,
    /// `RR + RS + SR`.
    Resistant,
}

impl Population {
    /// Output label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Susceptible => "susceptible",
            Self::Resistant => "resistant",
        }
    }

    /// The matching total of a plant population.
    pub fn total(self, plants: &PlantPopulation) -> u64 {
        match self {
            Self::Susceptible => plants.susceptible(),
            Self::Resistant => plants.resistant(),
        }
    }
}

/// Susceptible and resistant summaries for one season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonSummary {
    /// Season index; `0` is the initial population.
    pub season: usize,
    /// Summary of the susceptible totals.
    pub susceptible: Summary,
    /// Summary of the resistant totals.
    pub resistant: Summary,
}

impl SeasonSummary {
    /// Rows in output order: susceptible first.
    pub const fn rows(&self) -> [(Population, Summary); 2] {
        [
            (Population::Susceptible, self.susceptible),
            (Population::Resistant, self.resistant),
        ]
    }
}

/// Summarise trajectories season by season. Trajectories shorter than the
/// longest one simply drop out of later seasons.
pub fn summarize(trajectories: &[Vec<PlantPopulation>]) -> Vec<SeasonSummary> {
    let seasons = trajectories.iter().map(Vec::len).max().unwrap_or(0);
    (0..seasons)
        .map(|season| {
            let at_season: Vec<&PlantPopulation> = trajectories
                .iter()
                .filter_map(|trajectory| trajectory.get(season))
                .collect();
            let sample = |population: Population| -> Vec<u64> {
                at_season.iter().map(|p| population.total(p)).collect()
            };
            SeasonSummary {
                season,
                susceptible: Summary::of(&sample(Population::Susceptible)),
                resistant: Summary::of(&sample(Population::Resistant)),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use mosaic_types::Genotype;

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_matches_reference_values() {
        let s = Summary::of(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert!(close(s.mean, 5.0));
        assert!(close(s.std, 2.0));
        // sample std = sqrt(32 / 7)
        assert!(close(s.sem, (32.0_f64 / 7.0).sqrt() / 8.0_f64.sqrt()));
    }

    #[test]
    fn identical_values_have_no_spread() {
        let s = Summary::of(&[500, 500, 500]);
        assert!(close(s.mean, 500.0));
        assert!(close(s.std, 0.0));
        assert!(close(s.sem, 0.0));
    }

    #[test]
    fn single_value_has_zero_sem() {
        let s = Summary::of(&[42]);
        assert!(close(s.mean, 42.0));
        assert!(close(s.sem, 0.0));
        assert_eq!(Summary::of(&[]).mean.to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn trajectories_summarise_per_season() {
        let initial = PlantPopulation::from_counts([
            (Genotype::Rr, 500),
            (Genotype::SsInfected, 250),
            (Genotype::SsUninfected, 250),
        ]);
        let a = PlantPopulation::from_counts([(Genotype::Rr, 600), (Genotype::SsUninfected, 400)]);
        let b = PlantPopulation::from_counts([(Genotype::Rs, 800), (Genotype::SsInfected, 200)]);

        let summaries = summarize(&[vec![initial.clone(), a], vec![initial, b]]);
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].season, 0);
        assert!(close(summaries[0].susceptible.mean, 500.0));
        assert!(close(summaries[0].susceptible.sem, 0.0));

        assert!(close(summaries[1].resistant.mean, 700.0));
        assert!(close(summaries[1].susceptible.mean, 300.0));
        assert!(close(summaries[1].susceptible.std, 100.0));

        let rows = summaries[1].rows();
        assert_eq!(rows[0].0.label(), "susceptible");
        assert_eq!(rows[1].0.label(), "resistant");
    }
}
