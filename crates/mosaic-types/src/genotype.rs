//! The genotype space of the single modelled resistance locus.
//!
//! Two alleles (`R`, `S`) combine into four allele pairs. At flower and plant
//! level the susceptible homozygote is further split by infection status,
//! giving the five [`Genotype`] variants. Seeds carry no infection status yet
//! and use the four-way [`SeedGenotype`].
//!
//! Heterozygotes keep the parental origin of their alleles: the first allele
//! came from the father, the second from the mother. Genetically `RS` and `SR`
//! behave identically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a genotype label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown genotype label: {label:?}")]
pub struct ParseGenotypeError {
    /// The label that failed to parse.
    pub label: String,
}

/// A key with a fixed, ordered enumeration of all its values.
///
/// Tallies are initialised over `ALL`, and every iteration over a tally
/// follows this order. The order is part of the reproducibility contract:
/// stochastic rounding and germination allocation both depend on it.
pub trait GenotypeKey: Copy + Ord + fmt::Display + 'static {
    /// Every value of the key, in label order.
    const ALL: &'static [Self];
}

// ---------------------------------------------------------------------------
// Allele
// ---------------------------------------------------------------------------

/// A resistance allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Allele {
    /// Resistant.
    R,
    /// Susceptible.
    S,
}

impl Allele {
    /// Single-letter label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::R => "R",
            Self::S => "S",
        }
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Genotype
// ---------------------------------------------------------------------------

/// Flower- and plant-level genotype.
///
/// Variant order matches the label order `RR, RS, SR, SS_i, SS_u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genotype {
    /// Homozygous resistant.
    #[serde(rename = "RR")]
    Rr,
    /// Heterozygous, resistant allele from the father.
    #[serde(rename = "RS")]
    Rs,
    /// Heterozygous, susceptible allele from the father.
    #[serde(rename = "SR")]
    Sr,
    /// Homozygous susceptible, infected.
    #[serde(rename = "SS_i")]
    SsInfected,
    /// Homozygous susceptible, uninfected.
    #[serde(rename = "SS_u")]
    SsUninfected,
}

impl Genotype {
    /// Output label used in tables and serialised maps.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rr => "RR",
            Self::Rs => "RS",
            Self::Sr => "SR",
            Self::SsInfected => "SS_i",
            Self::SsUninfected => "SS_u",
        }
    }

    /// The allele pair with the infection marker stripped, father first.
    pub const fn alleles(self) -> (Allele, Allele) {
        match self {
            Self::Rr => (Allele::R, Allele::R),
            Self::Rs => (Allele::R, Allele::S),
            Self::Sr => (Allele::S, Allele::R),
            Self::SsInfected | Self::SsUninfected => (Allele::S, Allele::S),
        }
    }

    /// Whether this genotype carries the infection.
    pub const fn is_infected(self) -> bool {
        matches!(self, Self::SsInfected)
    }

    /// Whether this genotype carries at least one resistant allele.
    pub const fn is_resistant(self) -> bool {
        matches!(self, Self::Rr | Self::Rs | Self::Sr)
    }

    /// The seed-level genotype with the same allele pair.
    pub const fn seed_genotype(self) -> SeedGenotype {
        match self {
            Self::Rr => SeedGenotype::Rr,
            Self::Rs => SeedGenotype::Rs,
            Self::Sr => SeedGenotype::Sr,
            Self::SsInfected | Self::SsUninfected => SeedGenotype::Ss,
        }
    }
}

impl GenotypeKey for Genotype {
    const ALL: &'static [Self] = &[
        Self::Rr,
        Self::Rs,
        Self::Sr,
        Self::SsInfected,
        Self::SsUninfected,
    ];
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genotype {
    type Err = ParseGenotypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.label() == s)
            .ok_or_else(|| ParseGenotypeError {
                label: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// SeedGenotype
// ---------------------------------------------------------------------------

/// Seed-level genotype: an allele pair without infection status.
///
/// Variant order matches the label order `RR, RS, SR, SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeedGenotype {
    /// Homozygous resistant.
    #[serde(rename = "RR")]
    Rr,
    /// Heterozygous, resistant allele from the father.
    #[serde(rename = "RS")]
    Rs,
    /// Heterozygous, susceptible allele from the father.
    #[serde(rename = "SR")]
    Sr,
    /// Homozygous susceptible.
    #[serde(rename = "SS")]
    Ss,
}

impl SeedGenotype {
    /// Combine a paternal and a maternal allele.
    pub const fn from_alleles(father: Allele, mother: Allele) -> Self {
        match (father, mother) {
            (Allele::R, Allele::R) => Self::Rr,
            (Allele::R, Allele::S) => Self::Rs,
            (Allele::S, Allele::R) => Self::Sr,
            (Allele::S, Allele::S) => Self::Ss,
        }
    }

    /// The allele pair, father first.
    pub const fn alleles(self) -> (Allele, Allele) {
        match self {
            Self::Rr => (Allele::R, Allele::R),
            Self::Rs => (Allele::R, Allele::S),
            Self::Sr => (Allele::S, Allele::R),
            Self::Ss => (Allele::S, Allele::S),
        }
    }

    /// Output label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rr => "RR",
            Self::Rs => "RS",
            Self::Sr => "SR",
            Self::Ss => "SS",
        }
    }

    /// The plant genotype a germinated seed becomes, for the non-susceptible
    /// types. `SS` has no single counterpart because it is split by infection
    /// status during germination, so it returns `None`.
    pub const fn plant_genotype(self) -> Option<Genotype> {
        match self {
            Self::Rr => Some(Genotype::Rr),
            Self::Rs => Some(Genotype::Rs),
            Self::Sr => Some(Genotype::Sr),
            Self::Ss => None,
        }
    }
}

impl GenotypeKey for SeedGenotype {
    const ALL: &'static [Self] = &[Self::Rr, Self::Rs, Self::Sr, Self::Ss];
}

impl fmt::Display for SeedGenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SeedGenotype {
    type Err = ParseGenotypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.label() == s)
            .ok_or_else(|| ParseGenotypeError {
                label: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for g in Genotype::ALL {
            assert_eq!(g.label().parse::<Genotype>().unwrap(), *g);
        }
        for s in SeedGenotype::ALL {
            assert_eq!(s.label().parse::<SeedGenotype>().unwrap(), *s);
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "SS".parse::<Genotype>();
        assert_eq!(
            err,
            Err(ParseGenotypeError {
                label: "SS".to_owned()
            })
        );
        assert!("SS_i".parse::<SeedGenotype>().is_err());
    }

    #[test]
    fn infection_marker_is_stripped() {
        assert_eq!(Genotype::SsInfected.alleles(), (Allele::S, Allele::S));
        assert_eq!(Genotype::SsUninfected.alleles(), (Allele::S, Allele::S));
        assert_eq!(Genotype::SsInfected.seed_genotype(), SeedGenotype::Ss);
        assert_eq!(Genotype::SsUninfected.seed_genotype(), SeedGenotype::Ss);
    }

    #[test]
    fn heterozygotes_keep_parental_order() {
        assert_eq!(Genotype::Rs.alleles(), (Allele::R, Allele::S));
        assert_eq!(Genotype::Sr.alleles(), (Allele::S, Allele::R));
        assert_eq!(
            SeedGenotype::from_alleles(Allele::S, Allele::R),
            SeedGenotype::Sr
        );
    }

    #[test]
    fn only_ss_i_is_infected() {
        let infected: Vec<_> = Genotype::ALL
            .iter()
            .filter(|g| g.is_infected())
            .collect();
        assert_eq!(infected, vec![&Genotype::SsInfected]);
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Genotype::SsUninfected).unwrap();
        assert_eq!(json, "\"SS_u\"");
        let back: SeedGenotype = serde_json::from_str("\"SR\"").unwrap();
        assert_eq!(back, SeedGenotype::Sr);
    }
}
