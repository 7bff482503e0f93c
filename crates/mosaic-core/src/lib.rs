//! Core engines of the Mosaic greenhouse simulation.
//!
//! A generation is a pollination season followed by reproduction. During the
//! season bees forage hour by hour, biased toward infected flowers, killing
//! each flower they visit and cross-pollinating consecutive visits. At season
//! end crosses and surviving (selfing) flowers set seed, and a fixed budget of
//! seeds is sown as the next plant population.
//!
//! # Modules
//!
//! - [`config`] -- Typed, validated parameters with YAML loading.
//! - [`error`] -- [`ModelError`].
//! - [`landing`] -- Attraction-biased landing thresholds.
//! - [`season`] -- [`PollinationSeason`] and [`run_season`].
//! - [`reproduction`] -- Seed accumulation, Mendelian crosses, [`reproduce`].
//! - [`germination`] -- Sowing a seed pool into plants.
//! - [`generation`] -- Chaining seasons into trajectories.
//! - [`numeric`] -- Count and proportion conversions.
//!
//! The engines never touch the filesystem and never read global state; all
//! randomness comes from the `Rng` passed in by the caller.

pub mod config;
pub mod error;
pub mod generation;
pub mod germination;
pub mod landing;
pub mod numeric;
pub mod reproduction;
pub mod season;

pub use config::{
    ConfigError, ModelConfig, ReproductionConfig, SeasonConfig, default_initial_population,
};
pub use error::ModelError;
pub use generation::{GenerationOutcome, advance_generation, run_chain};
pub use germination::germinate;
pub use landing::LandingThresholds;
pub use reproduction::{Reproduction, reproduce};
pub use season::{
    HourReport, NoOpSink, PollinationSeason, SeasonResult, VisitationSink, run_season,
};
