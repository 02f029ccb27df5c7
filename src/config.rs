//! Run configuration with the defaults of the MeteoSwiss open-data service.

use crate::retry::RetryPolicy;
use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://data.geo.admin.ch/api/stac/v1";
/// SwissMetNet automatic weather stations.
pub const DEFAULT_COLLECTION_ID: &str = "ch.meteoschweiz.ogd-smn";
pub const DEFAULT_OUTPUT_ROOT: &str = "meteoswiss_data";
/// Environment variable overriding [`SyncConfig::output_root`] for the binaries.
pub const OUTPUT_ROOT_ENV: &str = "METEOSWISS_OUTPUT_ROOT";

/// Settings of a [`crate::Synchronizer`].
///
/// Every field has a default, so `SyncConfig::default()` talks to the public
/// MeteoSwiss catalog and writes below `./meteoswiss_data`.
///
/// # Examples
///
/// ```
/// use meteoswiss_sync::SyncConfig;
/// use std::time::Duration;
///
/// let config = SyncConfig::builder()
///     .output_root("/srv/meteoswiss")
///     .concurrency(4)
///     .download_timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.page_limit, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct SyncConfig {
    /// Root of the STAC API, without the trailing `/search`.
    #[builder(into, default = DEFAULT_API_BASE.to_string())]
    pub api_base: String,
    #[builder(into, default = DEFAULT_COLLECTION_ID.to_string())]
    pub collection_id: String,
    /// Local artifacts live at `<output_root>/<tier>/<station_id>/<asset_name>`.
    #[builder(into, default = PathBuf::from(DEFAULT_OUTPUT_ROOT))]
    pub output_root: PathBuf,
    /// Stations per catalog page.
    #[builder(default = 100)]
    pub page_limit: u32,
    /// Bound of one asset transfer, body included.
    #[builder(default = Duration::from_secs(30))]
    pub download_timeout: Duration,
    /// Bound of one catalog search request.
    #[builder(default = Duration::from_secs(60))]
    pub catalog_timeout: Duration,
    /// Stations processed at the same time; also caps concurrent downloads.
    #[builder(default = 8)]
    pub concurrency: usize,
    #[builder(default)]
    pub retry: RetryPolicy,
    /// Share of failed asset transfers above which a run counts as failed.
    #[builder(default = 0.1)]
    pub max_failure_rate: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SyncConfig {
    /// The defaults, with the output root taken from `METEOSWISS_OUTPUT_ROOT` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::builder()
            .maybe_output_root(lookup(OUTPUT_ROOT_ENV).filter(|root| !root.is_empty()))
            .build()
    }
}
