//! The synchronization runner: catalog listing, asset selection and transfers for
//! one tier, folded into a [`RunSummary`].

use crate::catalog::client::CatalogClient;
use crate::catalog::error::CatalogError;
use crate::classify::select;
use crate::config::SyncConfig;
use crate::transfer::fetcher::AssetTransfer;
use crate::types::station::Station;
use crate::types::summary::{AssetReport, RunSummary, StationReport};
use crate::types::tier::Tier;
use crate::utils::ensure_dir_exists;
use bon::bon;
use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::info;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a synchronization run. Failed asset transfers are not among
/// them; they are recorded in the [`RunSummary`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Output path '{0}' exists but is not a directory")]
    OutputDirNotADirectory(PathBuf),

    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Mirrors the station files of one tier from the catalog into a local directory tree.
///
/// # Examples
///
/// ```no_run
/// # use meteoswiss_sync::{SyncConfig, SyncError, Synchronizer, Tier};
/// # #[tokio::main]
/// # async fn main() -> Result<(), SyncError> {
/// let synchronizer = Synchronizer::new(SyncConfig::default())?;
/// let summary = synchronizer.run().tier(Tier::Recent).call().await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub struct Synchronizer {
    config: SyncConfig,
    catalog: CatalogClient,
    transfer: AssetTransfer,
}

#[bon]
impl Synchronizer {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::Client)?;
        let catalog = CatalogClient::new(
            client.clone(),
            &config.api_base,
            config.page_limit,
            config.catalog_timeout,
            config.retry,
        );
        let transfer = AssetTransfer::new(client, config.download_timeout, config.retry);
        Ok(Self {
            config,
            catalog,
            transfer,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs one synchronization of `tier`.
    ///
    /// # Arguments
    ///
    /// * `.tier(Tier)`: **Required.** Which files to mirror.
    /// * `.collection_id(&str)`: Optional. Defaults to [`SyncConfig::collection_id`].
    /// * `.output_root(&Path)`: Optional. Defaults to [`SyncConfig::output_root`].
    ///
    /// Stations are processed independently with at most
    /// [`SyncConfig::concurrency`] in flight; each station's files are transferred
    /// one after the other. The returned summary lists stations in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Catalog`] when the station list cannot be fetched, and the
    /// output directory variants when the tier directory cannot be created. A failed
    /// asset transfer never aborts the run.
    #[builder]
    pub async fn run(
        &self,
        tier: Tier,
        collection_id: Option<&str>,
        output_root: Option<&Path>,
    ) -> Result<RunSummary, SyncError> {
        let started_at = Utc::now();
        let collection_id = collection_id.unwrap_or(&self.config.collection_id);
        let tier_dir = output_root
            .unwrap_or(&self.config.output_root)
            .join(tier.path_segment());
        ensure_dir_exists(&tier_dir).await?;

        let stations = self.catalog.list_stations(collection_id).await?;
        let total = stations.len();

        let mut reports: Vec<StationReport> = stream::iter(stations.into_iter().enumerate())
            .map(|(index, station)| self.sync_station(index, total, station, tier, &tier_dir))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        reports.sort_by_key(|report| report.index);

        let mut summary = RunSummary::new(tier, tier_dir, started_at);
        for report in reports {
            summary.record(report);
        }
        summary.finish(Utc::now());

        info!(
            "Processed {} stations, {} with {} data, {} files downloaded ({} failed)",
            summary.stations_processed,
            summary.stations_with_data,
            tier.label(),
            summary.files_downloaded,
            summary.files_failed
        );
        Ok(summary)
    }

    async fn sync_station(
        &self,
        index: usize,
        total: usize,
        station: Station,
        tier: Tier,
        tier_dir: &Path,
    ) -> StationReport {
        info!("[{}/{}] {}", index + 1, total, station.title);

        let selected = select(&station.assets, tier);
        if selected.is_empty() {
            info!(
                "  No {} files available for {}",
                tier.label(),
                station.id
            );
        } else {
            info!(
                "  Station {}: {} {} files",
                station.id.to_uppercase(),
                selected.len(),
                tier.label()
            );
        }

        let station_dir = tier_dir.join(&station.id);
        let mut assets = Vec::with_capacity(selected.len());
        for asset in selected {
            let outcome = self
                .transfer
                .fetch_asset(asset, &station_dir.join(&asset.name), tier.presence_policy())
                .await;
            info!("    {}: {}", asset.name, outcome);
            assets.push(AssetReport {
                name: asset.name.clone(),
                outcome,
            });
        }

        StationReport {
            index,
            station_id: station.id,
            title: station.title,
            assets,
        }
    }
}
