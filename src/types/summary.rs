//! Outcomes of single transfers and the aggregate report of one synchronization run.

use crate::types::tier::Tier;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Result of mirroring one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file was fetched and written to its final path.
    Downloaded { bytes: u64 },
    /// The file already existed locally and the tier never refreshes it.
    Skipped,
    /// The transfer failed; the run continues with the next asset.
    Failed { reason: String },
}

impl TransferOutcome {
    /// Whether the asset is available locally after this outcome.
    pub fn is_present(&self) -> bool {
        matches!(
            self,
            TransferOutcome::Downloaded { .. } | TransferOutcome::Skipped
        )
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Downloaded { bytes } => write!(f, "downloaded ({} bytes)", bytes),
            TransferOutcome::Skipped => write!(f, "already exists"),
            TransferOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub name: String,
    pub outcome: TransferOutcome,
}

/// What happened to one station during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationReport {
    /// Position of the station in the catalog listing.
    pub index: usize,
    pub station_id: String,
    pub title: String,
    /// One entry per selected asset. Empty when the station has no files for the tier.
    pub assets: Vec<AssetReport>,
}

impl StationReport {
    /// Counts toward `stations_with_data`: at least one asset is present locally.
    pub fn has_data(&self) -> bool {
        self.assets.iter().any(|a| a.outcome.is_present())
    }

    pub fn files_present(&self) -> usize {
        self.assets
            .iter()
            .filter(|a| a.outcome.is_present())
            .count()
    }
}

/// Aggregate counters of one synchronization run.
///
/// `files_downloaded` counts every selected asset that is present locally at the end
/// of the run, i.e. fresh transfers plus files skipped because they already existed.
/// The finer counters split that number up and add the failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub tier: Tier,
    /// Directory holding the per-station folders of this tier.
    pub output_dir: PathBuf,
    pub stations_processed: usize,
    pub stations_with_data: usize,
    pub files_downloaded: usize,
    pub files_fetched: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-station details in catalog order.
    pub stations: Vec<StationReport>,
}

impl RunSummary {
    pub(crate) fn new(tier: Tier, output_dir: PathBuf, started_at: DateTime<Utc>) -> Self {
        Self {
            tier,
            output_dir,
            stations_processed: 0,
            stations_with_data: 0,
            files_downloaded: 0,
            files_fetched: 0,
            files_skipped: 0,
            files_failed: 0,
            started_at,
            finished_at: started_at,
            stations: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, report: StationReport) {
        self.stations_processed += 1;
        if report.has_data() {
            self.stations_with_data += 1;
        }
        for asset in &report.assets {
            match asset.outcome {
                TransferOutcome::Downloaded { .. } => self.files_fetched += 1,
                TransferOutcome::Skipped => self.files_skipped += 1,
                TransferOutcome::Failed { .. } => self.files_failed += 1,
            }
        }
        self.files_downloaded = self.files_fetched + self.files_skipped;
        self.stations.push(report);
    }

    pub(crate) fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = finished_at;
    }

    /// Assets selected for transfer in this run, whatever their outcome.
    pub fn files_attempted(&self) -> usize {
        self.files_downloaded + self.files_failed
    }

    /// Share of selected assets that could not be mirrored, `0.0` when nothing was selected.
    pub fn failure_rate(&self) -> f64 {
        match self.files_attempted() {
            0 => 0.0,
            attempted => self.files_failed as f64 / attempted as f64,
        }
    }

    /// Whether the run should be reported as failed to the caller.
    pub fn exceeds_failure_rate(&self, max_failure_rate: f64) -> bool {
        self.failure_rate() > max_failure_rate
    }

    pub fn failed_assets(&self) -> impl Iterator<Item = (&StationReport, &AssetReport)> {
        self.stations.iter().flat_map(|station| {
            station
                .assets
                .iter()
                .filter(|a| !a.outcome.is_present())
                .map(move |asset| (station, asset))
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Download Summary")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Stations processed: {}", self.stations_processed)?;
        writeln!(
            f,
            "Stations with {} data: {}",
            self.tier.label(),
            self.stations_with_data
        )?;
        writeln!(f, "Total files downloaded: {}", self.files_downloaded)?;
        writeln!(
            f,
            "  fetched: {}, already present: {}, failed: {}",
            self.files_fetched, self.files_skipped, self.files_failed
        )?;
        writeln!(f, "Output directory: {}", self.output_dir.display())?;
        writeln!(
            f,
            "Duration: {}s",
            (self.finished_at - self.started_at).num_seconds()
        )?;
        write!(f, "{}", rule)
    }
}
