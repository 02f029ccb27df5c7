mod catalog;
mod classify;
mod config;
mod entry;
mod retry;
mod staging;
mod sync;
#[cfg(test)]
mod test_support;
mod transfer;
mod types;
mod utils;

pub use config::*;
pub use entry::{init_logging, run_tier};
pub use retry::RetryPolicy;
pub use staging::*;
pub use sync::{SyncError, Synchronizer};

pub use classify::select;
pub use types::station::{Asset, Station, UNKNOWN_TITLE};
pub use types::summary::{AssetReport, RunSummary, StationReport, TransferOutcome};
pub use types::tier::*;

pub use catalog::client::CatalogClient;
pub use catalog::error::CatalogError;
pub use transfer::error::TransferError;
pub use transfer::fetcher::AssetTransfer;
pub use utils::error_chain;
