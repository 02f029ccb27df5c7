//! Shared body of the `fetch_*` binaries.

use crate::config::SyncConfig;
use crate::sync::Synchronizer;
use crate::types::tier::Tier;
use crate::utils::error_chain;
use log::error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Installs a stderr logger filtered by `RUST_LOG`, `info` when unset.
///
/// Records emitted through the `log` facade are forwarded as well. Calling this
/// more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Mirrors `tier` with the environment configuration and reports the outcome.
///
/// Exits unsuccessfully when the run aborts or when more than
/// [`SyncConfig::max_failure_rate`] of the attempted transfers failed.
pub async fn run_tier(tier: Tier) -> ExitCode {
    init_logging();
    if sync_tier(tier, SyncConfig::from_env()).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Runs and reports one tier, returning whether the run succeeded.
pub(crate) async fn sync_tier(tier: Tier, config: SyncConfig) -> bool {
    let rule = "=".repeat(70);
    println!("{}", rule);
    println!("MeteoSwiss {} data download", tier.label());
    println!("{}", rule);
    println!("Collection: {}", config.collection_id);
    println!("Output: {}", config.output_root.join(tier.to_string()).display());
    println!();

    let max_failure_rate = config.max_failure_rate;
    let synchronizer = match Synchronizer::new(config) {
        Ok(synchronizer) => synchronizer,
        Err(e) => {
            error!("{}", error_chain(&e));
            return false;
        }
    };

    let summary = match synchronizer.run().tier(tier).call().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("{} sync failed: {}", tier.label(), error_chain(&e));
            return false;
        }
    };

    println!();
    println!("{}", summary);
    println!();
    println!("Note: {}", tier.update_note());

    for (station, asset) in summary.failed_assets() {
        error!("{}/{}: {}", station.station_id, asset.name, asset.outcome);
    }
    if summary.exceeds_failure_rate(max_failure_rate) {
        error!(
            "{:.1}% of {} transfers failed, above the allowed {:.1}%",
            summary.failure_rate() * 100.0,
            summary.files_attempted(),
            max_failure_rate * 100.0
        );
        return false;
    }
    true
}
