//! Shared type definitions for the Mosaic simulation.
//!
//! This crate is the single source of truth for the genotype space and the
//! count structures exchanged between the pollination season, reproduction,
//! and the experiment driver.
//!
//! # Modules
//!
//! - [`genotype`] -- Alleles, the five flower/plant genotypes, and the four
//!   seed genotypes, with their fixed label order.
//! - [`tally`] -- [`Tally`] counts and the population aliases built on it.
//! - [`ledger`] -- [`CrossLedger`] of ordered `(father, mother)` crosses.

pub mod genotype;
pub mod ledger;
pub mod tally;

// Re-export all public types at crate root for convenience.
pub use genotype::{Allele, Genotype, GenotypeKey, ParseGenotypeError, SeedGenotype};
pub use ledger::{CrossLedger, CrossPair};
pub use tally::{
    FlowerPopulation, HourlyVisitation, PlantPopulation, SeasonalVisitation, SeedPopulation, Tally,
};
