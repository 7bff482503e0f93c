//! The cross ledger: ordered `(father, mother)` pollination events.
//!
//! Each time a bee makes two consecutive successful visits within the same
//! hour, pollen from the first flower (the father) reaches the second (the
//! mother) and the pair's counter is incremented. The ledger is created
//! zeroed over the full 5×5 genotype product at season start and is read by
//! reproduction once the season ends.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::genotype::{Genotype, GenotypeKey};

/// An ordered parent pair. Ordering is father first, then mother, both in
/// label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrossPair {
    /// Pollen donor: the earlier of two consecutive successful visits.
    pub father: Genotype,
    /// Pollen recipient: the later visit, whose flower sets the seed.
    pub mother: Genotype,
}

impl fmt::Display for CrossPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.father, self.mother)
    }
}

/// Cross-pollination event counts for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossLedger {
    crosses: BTreeMap<CrossPair, u32>,
}

impl CrossLedger {
    /// Create a ledger with every `(father, mother)` pair set to zero.
    pub fn new() -> Self {
        let crosses = Genotype::ALL
            .iter()
            .flat_map(|&father| {
                Genotype::ALL
                    .iter()
                    .map(move |&mother| (CrossPair { father, mother }, 0))
            })
            .collect();
        Self { crosses }
    }

    /// Record one cross, saturating at `u32::MAX`.
    pub fn record(&mut self, father: Genotype, mother: Genotype) {
        let entry = self
            .crosses
            .entry(CrossPair { father, mother })
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Number of crosses recorded for a pair.
    pub fn get(&self, father: Genotype, mother: Genotype) -> u32 {
        self.crosses
            .get(&CrossPair { father, mother })
            .copied()
            .unwrap_or(0)
    }

    /// Iterate every pair, including zero entries, in `(father, mother)`
    /// label order.
    pub fn iter(&self) -> impl Iterator<Item = (CrossPair, u32)> + '_ {
        self.crosses.iter().map(|(&pair, &count)| (pair, count))
    }

    /// Iterate only the pairs that were crossed at least once.
    pub fn nonzero(&self) -> impl Iterator<Item = (CrossPair, u32)> + '_ {
        self.iter().filter(|&(_, count)| count > 0)
    }

    /// Total number of crosses.
    pub fn total(&self) -> u64 {
        self.crosses.values().map(|&c| u64::from(c)).sum()
    }
}

impl Default for CrossLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialised as a map keyed `"FATHER:MOTHER"`, e.g. `"RR:SS_i"`.
impl Serialize for CrossLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(pair, count)| (pair.to_string(), count)))
    }
}
