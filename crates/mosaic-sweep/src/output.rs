//! Output files: summary and trajectory CSVs, the hourly visitation CSV,
//! and the run manifest.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use mosaic_core::{SeasonConfig, VisitationSink, run_season};
use mosaic_types::{Genotype, HourlyVisitation, PlantPopulation};
use rand::Rng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::error::SweepError;
use crate::grid::ParameterSet;
use crate::stats::SeasonSummary;

/// Summary statistics file name.
pub const SUMMARY_FILE: &str = "parameter_sweep.csv";
/// Per-chain trajectory file name.
pub const TRAJECTORY_FILE: &str = "allmodeldata.csv";
/// Hourly visitation file name.
pub const SEASON_VISITS_FILE: &str = "season_visits.csv";
/// Run manifest file name.
pub const MANIFEST_FILE: &str = "run_manifest.json";

const SUMMARY_HEADER: &str =
    "nbees,attr_inf,inf_penalty,nb_penalty,nb_inf_penalty,season,population,mean,std,sem";
const TRAJECTORY_HEADER: &str =
    "nbees,attr_inf,inf_penalty,nb_penalty,nb_inf_penalty,repeat,season,RR,RS,SR,SS_i,SS_u";

/// Column order of the hourly visitation file.
const SEASON_VISITS_COLUMNS: [Genotype; 5] = [
    Genotype::Sr,
    Genotype::SsUninfected,
    Genotype::SsInfected,
    Genotype::Rr,
    Genotype::Rs,
];

/// Open `dir/name` for buffered writing.
pub fn create(dir: &Path, name: &str) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

// ---------------------------------------------------------------------------
// Summary CSV
// ---------------------------------------------------------------------------

/// Long-format summary rows: one susceptible and one resistant row per
/// season per parameter set.
pub struct SummaryCsv<W: Write> {
    out: W,
}

impl<W: Write> SummaryCsv<W> {
    /// Write the header and wrap `out`.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{SUMMARY_HEADER}")?;
        Ok(Self { out })
    }

    /// Append every season of a parameter set.
    pub fn write_set(&mut self, set: &ParameterSet, summaries: &[SeasonSummary]) -> io::Result<()> {
        for summary in summaries {
            for (population, stats) in summary.rows() {
                writeln!(
                    self.out,
                    "{set},{},{},{},{},{}",
                    summary.season,
                    population.label(),
                    stats.mean,
                    stats.std,
                    stats.sem
                )?;
            }
        }
        Ok(())
    }

    /// Flush and return the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

// ---------------------------------------------------------------------------
// Trajectory CSV
// ---------------------------------------------------------------------------

/// Raw plant counts of every chain, season by season.
pub struct TrajectoryCsv<W: Write> {
    out: W,
}

impl<W: Write> TrajectoryCsv<W> {
    /// Write the header and wrap `out`.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{TRAJECTORY_HEADER}")?;
        Ok(Self { out })
    }

    /// Append the trajectories of every repeat of a parameter set.
    pub fn write_set(
        &mut self,
        set: &ParameterSet,
        trajectories: &[Vec<PlantPopulation>],
    ) -> io::Result<()> {
        for (repeat, trajectory) in trajectories.iter().enumerate() {
            for (season, plants) in trajectory.iter().enumerate() {
                write!(self.out, "{set},{repeat},{season}")?;
                for (_, count) in plants.iter() {
                    write!(self.out, ",{count}")?;
                }
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    /// Flush and return the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

// ---------------------------------------------------------------------------
// Hourly visitation CSV
// ---------------------------------------------------------------------------

/// A [`VisitationSink`] that writes one CSV row per hour.
///
/// The first write error is kept and every later hour is skipped; it is
/// reported by [`SeasonVisitsCsv::finish`].
pub struct SeasonVisitsCsv<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> SeasonVisitsCsv<W> {
    /// Write the header and wrap `out`.
    pub fn new(mut out: W) -> io::Result<Self> {
        write!(out, "hour")?;
        for genotype in SEASON_VISITS_COLUMNS {
            write!(out, ",{genotype}")?;
        }
        writeln!(out)?;
        Ok(Self { out, error: None })
    }

    fn write_row(&mut self, hour: u32, visits: &HourlyVisitation) -> io::Result<()> {
        write!(self.out, "{hour}")?;
        for genotype in SEASON_VISITS_COLUMNS {
            write!(self.out, ",{}", visits.get(genotype))?;
        }
        writeln!(self.out)
    }

    /// Flush and return the writer, or the first error seen.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> VisitationSink for SeasonVisitsCsv<W> {
    fn on_hour(&mut self, hour: u32, visits: &HourlyVisitation) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.write_row(hour, visits) {
            self.error = Some(error);
        }
    }
}

/// Run one diagnostic season and record its hourly visitation.
pub fn record_season_visits<R: Rng + ?Sized>(
    dir: &Path,
    plants: &PlantPopulation,
    config: &SeasonConfig,
    rng: &mut R,
) -> Result<(), SweepError> {
    let mut sink = SeasonVisitsCsv::new(create(dir, SEASON_VISITS_FILE)?)?;
    let result = run_season(plants, config, rng, &mut sink)?;
    sink.finish()?;
    info!(
        visits = result.visitation.total(),
        crosses = result.crosses.total(),
        file = SEASON_VISITS_FILE,
        "Diagnostic season recorded"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Run manifest
// ---------------------------------------------------------------------------

/// Identity, timing, and configuration of one sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    /// Unique, time-ordered run identifier.
    pub experiment_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished, once it has.
    pub finished_at: Option<DateTime<Utc>>,
    /// Seed every chain seed was derived from.
    pub master_seed: u64,
    /// Number of parameter sets in the grid.
    pub parameter_sets: usize,
    /// Number of chains completed.
    pub chains: u64,
    /// Effective configuration, after environment overrides.
    pub config: SweepConfig,
}

impl RunManifest {
    /// Start a manifest for a run beginning now.
    pub fn start(config: SweepConfig, master_seed: u64, parameter_sets: usize) -> Self {
        Self {
            experiment_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            master_seed,
            parameter_sets,
            chains: 0,
            config,
        }
    }

    /// Mark the run finished after `chains` chains.
    pub fn finish(&mut self, chains: u64) {
        self.chains = chains;
        self.finished_at = Some(Utc::now());
    }

    /// Write the manifest as pretty JSON into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(), SweepError> {
        let mut out = create(dir, MANIFEST_FILE)?;
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::stats::Summary;

    fn set() -> ParameterSet {
        ParameterSet {
            index: 0,
            number_of_bees: 1,
            attraction: 0.5,
            infected_penalty: 0.0,
            non_buzz_penalty: 0.5,
            non_buzz_infected_penalty: 0.25,
        }
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let unique = format!(
            "mosaic_output_{name}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn summary_rows_follow_header() {
        let summary = SeasonSummary {
            season: 0,
            susceptible: Summary {
                mean: 500.0,
                std: 0.0,
                sem: 0.0,
            },
            resistant: Summary {
                mean: 500.0,
                std: 0.0,
                sem: 0.0,
            },
        };
        let mut csv = SummaryCsv::new(Vec::new()).unwrap();
        csv.write_set(&set(), &[summary]).unwrap();
        let text = String::from_utf8(csv.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], SUMMARY_HEADER);
        assert_eq!(lines[1], "1,0.5,0,0.5,0.25,0,susceptible,500,0,0");
        assert_eq!(lines[2], "1,0.5,0,0.5,0.25,0,resistant,500,0,0");
    }

    #[test]
    fn trajectory_rows_use_label_order() {
        let plants = PlantPopulation::from_counts([
            (Genotype::Rr, 500),
            (Genotype::SsInfected, 250),
            (Genotype::SsUninfected, 250),
        ]);
        let mut csv = TrajectoryCsv::new(Vec::new()).unwrap();
        csv.write_set(&set(), &[vec![plants.clone()], vec![plants]])
            .unwrap();
        let text = String::from_utf8(csv.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,0.5,0,0.5,0.25,0,0,500,0,0,250,250");
        assert_eq!(lines[2], "1,0.5,0,0.5,0.25,1,0,500,0,0,250,250");
    }

    #[test]
    fn season_visits_use_fixed_column_order() {
        let mut sink = SeasonVisitsCsv::new(Vec::new()).unwrap();
        let visits = HourlyVisitation::from_counts([(Genotype::Rr, 4), (Genotype::SsInfected, 9)]);
        sink.on_hour(1, &visits);
        sink.on_hour(2, &HourlyVisitation::new());
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "hour,SR,SS_u,SS_i,RR,RS");
        assert_eq!(lines[1], "1,0,0,9,4,0");
        assert_eq!(lines[2], "2,0,0,0,0,0");
    }

    #[test]
    fn diagnostic_season_writes_one_row_per_hour() {
        let dir = temp_dir("visits");
        let config = SeasonConfig {
            season_length_hours: 24,
            ..SeasonConfig::default()
        };
        let plants = mosaic_core::default_initial_population();
        let mut rng = StdRng::seed_from_u64(3);
        record_season_visits(&dir, &plants, &config, &mut rng).unwrap();

        let text = std::fs::read_to_string(dir.join(SEASON_VISITS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 25);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let dir = temp_dir("manifest");
        let mut manifest = RunManifest::start(SweepConfig::default(), 42, 32);
        manifest.finish(96);
        manifest.write(&dir).unwrap();

        let text = std::fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["master_seed"], 42);
        assert_eq!(json["chains"], 96);
        assert_eq!(json["config"]["sweep"]["repeats"], 3);
        assert_eq!(json["config"]["season"]["number_of_bees"], 10);
        assert!(json["finished_at"].is_string());
        std::fs::remove_dir_all(&dir).ok();
    }
}
