//! Non-negative integer counts keyed by genotype.
//!
//! [`Tally`] backs every population-like mapping in the model: flowers,
//! plants, seasonal and hourly visitation, and seeds. A tally always holds an
//! entry for every key of its genotype space, so iteration order and length
//! never depend on which genotypes happen to be present.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::genotype::{Genotype, GenotypeKey, SeedGenotype};

/// Count per genotype, zero-initialised over the whole genotype space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tally<K: GenotypeKey> {
    /// One entry per key in `K::ALL`.
    counts: BTreeMap<K, u32>,
}

/// Flowers per genotype during a season.
pub type FlowerPopulation = Tally<Genotype>;

/// Plants per genotype; the state threaded from one season to the next.
pub type PlantPopulation = Tally<Genotype>;

/// Successful visits per genotype over a whole season.
pub type SeasonalVisitation = Tally<Genotype>;

/// Successful visits per genotype within a single hour.
pub type HourlyVisitation = Tally<Genotype>;

/// Seeds per seed genotype produced by reproduction.
pub type SeedPopulation = Tally<SeedGenotype>;

impl<K: GenotypeKey> Tally<K> {
    /// Create a tally with every key set to zero.
    pub fn new() -> Self {
        Self {
            counts: K::ALL.iter().map(|&k| (k, 0)).collect(),
        }
    }

    /// Build a tally from `(key, count)` pairs. Keys not mentioned are zero;
    /// repeated keys keep the last count.
    pub fn from_counts<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
    {
        let mut tally = Self::new();
        for (key, count) in pairs {
            tally.set(key, count);
        }
        tally
    }

    /// Count for `key`.
    pub fn get(&self, key: K) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Overwrite the count for `key`.
    pub fn set(&mut self, key: K, count: u32) {
        self.counts.insert(key, count);
    }

    /// Add `amount` to `key`, saturating at `u32::MAX`.
    pub fn add(&mut self, key: K, amount: u32) {
        let entry = self.counts.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Subtract `amount` from `key`, saturating at zero.
    pub fn subtract(&mut self, key: K, amount: u32) {
        let entry = self.counts.entry(key).or_insert(0);
        *entry = entry.saturating_sub(amount);
    }

    /// Add every count of `other` into this tally.
    pub fn absorb(&mut self, other: &Self) {
        for (key, count) in other.iter() {
            self.add(key, count);
        }
    }

    /// Subtract every count of `other` from this tally, saturating at zero.
    pub fn deplete(&mut self, other: &Self) {
        for (key, count) in other.iter() {
            self.subtract(key, count);
        }
    }

    /// Multiply every count by `factor`.
    ///
    /// Returns `None` on arithmetic overflow.
    pub fn checked_scale(&self, factor: u32) -> Option<Self> {
        let mut scaled = Self::new();
        for (key, count) in self.iter() {
            scaled.set(key, count.checked_mul(factor)?);
        }
        Some(scaled)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Whether every count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }

    /// Iterate `(key, count)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.counts.iter().map(|(&k, &c)| (k, c))
    }
}

impl<K: GenotypeKey> Default for Tally<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialises from a label-keyed map. Labels that are absent become zero,
/// so a partial map such as `{RR: 500, SS_i: 250}` is accepted.
impl<'de, K> Deserialize<'de> for Tally<K>
where
    K: GenotypeKey + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let counts = BTreeMap::<K, u32>::deserialize(deserializer)?;
        Ok(Self::from_counts(counts))
    }
}

impl Tally<Genotype> {
    /// Count of infected susceptible homozygotes (`SS_i`).
    pub fn infected(&self) -> u32 {
        self.get(Genotype::SsInfected)
    }

    /// Total over genotypes with at least one resistant allele.
    pub fn resistant(&self) -> u64 {
        self.iter()
            .filter(|(g, _)| g.is_resistant())
            .map(|(_, c)| u64::from(c))
            .sum()
    }

    /// Total over the susceptible homozygotes, infected or not.
    pub fn susceptible(&self) -> u64 {
        self.iter()
            .filter(|(g, _)| !g.is_resistant())
            .map(|(_, c)| u64::from(c))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_tally_covers_every_key() {
        let plants = PlantPopulation::new();
        assert_eq!(plants.iter().count(), 5);
        assert!(plants.is_empty());

        let seeds = SeedPopulation::new();
        let keys: Vec<_> = seeds.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, SeedGenotype::ALL.to_vec());
    }

    #[test]
    fn subtract_saturates_at_zero() {
        let mut flowers = FlowerPopulation::from_counts([(Genotype::Rr, 3)]);
        flowers.subtract(Genotype::Rr, 5);
        assert_eq!(flowers.get(Genotype::Rr), 0);
    }

    #[test]
    fn checked_scale_detects_overflow() {
        let plants = PlantPopulation::from_counts([(Genotype::Rs, u32::MAX)]);
        assert!(plants.checked_scale(2).is_none());

        let plants = PlantPopulation::from_counts([(Genotype::Rs, 7)]);
        let flowers = plants.checked_scale(40).unwrap();
        assert_eq!(flowers.get(Genotype::Rs), 280);
        assert_eq!(flowers.get(Genotype::Rr), 0);
    }

    #[test]
    fn absorb_and_deplete_are_keywise() {
        let mut season = SeasonalVisitation::new();
        let hour = HourlyVisitation::from_counts([(Genotype::Rr, 2), (Genotype::SsInfected, 4)]);
        season.absorb(&hour);
        season.absorb(&hour);
        assert_eq!(season.get(Genotype::Rr), 4);
        assert_eq!(season.get(Genotype::SsInfected), 8);

        let mut flowers = FlowerPopulation::from_counts([(Genotype::Rr, 10), (Genotype::SsInfected, 10)]);
        flowers.deplete(&hour);
        assert_eq!(flowers.get(Genotype::Rr), 8);
        assert_eq!(flowers.get(Genotype::SsInfected), 6);
    }

    #[test]
    fn resistant_and_susceptible_partition_the_total() {
        let plants = PlantPopulation::from_counts([
            (Genotype::Rr, 500),
            (Genotype::Sr, 20),
            (Genotype::SsInfected, 250),
            (Genotype::SsUninfected, 230),
        ]);
        assert_eq!(plants.resistant(), 520);
        assert_eq!(plants.susceptible(), 480);
        assert_eq!(plants.total(), 1000);
        assert_eq!(plants.infected(), 250);
    }

    #[test]
    fn partial_map_deserialises_to_full_tally() {
        let plants: PlantPopulation = serde_json::from_str(r#"{"RR":500,"SS_i":250}"#).unwrap();
        assert_eq!(plants.iter().count(), 5);
        assert_eq!(plants.get(Genotype::Rr), 500);
        assert_eq!(plants.get(Genotype::SsUninfected), 0);
    }

    #[test]
    fn serialises_as_label_map() {
        let plants = PlantPopulation::from_counts([(Genotype::SsUninfected, 9)]);
        let json = serde_json::to_string(&plants).unwrap();
        assert_eq!(json, r#"{"RR":0,"RS":0,"SR":0,"SS_i":0,"SS_u":9}"#);
    }
}
