use crate::retry::RetryPolicy;
use crate::transfer::error::TransferError;
use crate::transfer::locks::PathLocks;
use crate::types::station::Asset;
use crate::types::summary::TransferOutcome;
use crate::types::tier::PresencePolicy;
use crate::utils::error_chain;
use futures_util::TryStreamExt;
use log::{debug, warn};
use reqwest::{Client, Url};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Downloads assets according to their tier's presence policy.
///
/// Bodies are streamed into a temporary file next to the destination and renamed
/// onto it only once complete, so an interrupted transfer never leaves a partial
/// file that a later run would take for a finished one.
#[derive(Debug)]
pub struct AssetTransfer {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    locks: PathLocks,
}

impl AssetTransfer {
    pub fn new(client: Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            retry,
            locks: PathLocks::default(),
        }
    }

    /// Mirrors `asset` to `destination`.
    ///
    /// With [`PresencePolicy::SkipIfExists`] an existing destination is reported as
    /// skipped without any network call; its presence alone marks it complete.
    /// With [`PresencePolicy::AlwaysOverwrite`] the asset is always fetched and
    /// replaces the existing file. Failures are returned as
    /// [`TransferOutcome::Failed`], never as an error.
    pub async fn fetch_asset(
        &self,
        asset: &Asset,
        destination: &Path,
        policy: PresencePolicy,
    ) -> TransferOutcome {
        let _guard = self.locks.lock(destination).await;

        if policy == PresencePolicy::SkipIfExists && fs::metadata(destination).await.is_ok() {
            debug!("{} already exists, skipping", destination.display());
            return TransferOutcome::Skipped;
        }

        match self.download(&asset.href, destination).await {
            Ok(bytes) => TransferOutcome::Downloaded { bytes },
            Err(e) => {
                warn!("Failed to download {}: {}", asset.name, error_chain(&e));
                TransferOutcome::Failed {
                    reason: error_chain(&e),
                }
            }
        }
    }

    async fn download(&self, href: &Url, destination: &Path) -> Result<u64, TransferError> {
        self.retry
            .run(&format!("Download of {}", href), || {
                self.download_once(href, destination)
            })
            .await
    }

    async fn download_once(&self, href: &Url, destination: &Path) -> Result<u64, TransferError> {
        let url = href.as_str();
        let parent = destination.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::Io(parent.to_path_buf(), e))?;

        let response = self
            .client
            .get(href.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransferError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    TransferError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    TransferError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(parent)
            .map_err(|e| TransferError::Io(parent.to_path_buf(), e))?;
        let (std_file, temp_path) = temp.into_parts();
        let mut file = fs::File::from_std(std_file);

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| {
                if e.get_ref().is_some_and(|inner| inner.is::<reqwest::Error>()) {
                    TransferError::Body {
                        url: url.to_string(),
                        source: e,
                    }
                } else {
                    TransferError::Io(temp_path.to_path_buf(), e)
                }
            })?;
        file.flush()
            .await
            .map_err(|e| TransferError::Io(temp_path.to_path_buf(), e))?;
        file.sync_all()
            .await
            .map_err(|e| TransferError::Io(temp_path.to_path_buf(), e))?;
        drop(file);

        temp_path
            .persist(destination)
            .map_err(|e| TransferError::Persist(destination.to_path_buf(), e))?;
        debug!("Wrote {} bytes to {}", bytes, destination.display());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockFile, MockServer};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn transfer() -> AssetTransfer {
        AssetTransfer::new(Client::new(), Duration::from_secs(5), quick_retry())
    }

    fn asset(server: &MockServer, station: &str, name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            href: server.href(station, name),
        }
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.ends_with(".partial"))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn downloads_body_verbatim_and_creates_parents() {
        let server = MockServer::start().await;
        server.set_content("abo", "abo_t_now.csv", "time;tre200s0\n202401010000;1.5\n");
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("now").join("abo").join("abo_t_now.csv");

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_now.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        assert_eq!(outcome, TransferOutcome::Downloaded { bytes: 31 });
        assert_eq!(
            std::fs::read_to_string(&destination).unwrap(),
            "time;tre200s0\n202401010000;1.5\n"
        );
        assert!(leftover_temp_files(destination.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn existing_file_is_skipped_without_network_call() {
        let server = MockServer::start().await;
        server.set_content("abo", "abo_t_historical_1990-1999.csv", "remote");
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_historical_1990-1999.csv");
        std::fs::write(&destination, "local").unwrap();

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_historical_1990-1999.csv"),
                &destination,
                PresencePolicy::SkipIfExists,
            )
            .await;

        assert_eq!(outcome, TransferOutcome::Skipped);
        assert!(server.file_requests().is_empty());
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "local");
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_file() {
        let server = MockServer::start().await;
        server.set_content("abo", "abo_t_recent.csv", "new rows");
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_recent.csv");
        std::fs::write(&destination, "old rows").unwrap();

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_recent.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        assert!(matches!(outcome, TransferOutcome::Downloaded { .. }));
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "new rows");
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let server = MockServer::start().await;
        server.set_file("abo", "abo_t_now.csv", MockFile::Status(StatusCode::NOT_FOUND));
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_now.csv");

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_now.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        match outcome {
            TransferOutcome::Failed { reason } => assert!(reason.contains("404"), "{}", reason),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(server.file_requests().len(), 1);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_previous_file() {
        let server = MockServer::start().await;
        server.set_file(
            "abo",
            "abo_t_now.csv",
            MockFile::Status(StatusCode::FORBIDDEN),
        );
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_now.csv");
        std::fs::write(&destination, "yesterday").unwrap();

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_now.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        assert!(!outcome.is_present());
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "yesterday");
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        server.set_file(
            "abo",
            "abo_t_recent.csv",
            MockFile::FailTimes {
                times: 2,
                status: StatusCode::SERVICE_UNAVAILABLE,
                content: b"finally".to_vec(),
            },
        );
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_recent.csv");

        let outcome = transfer()
            .fetch_asset(
                &asset(&server, "abo", "abo_t_recent.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        assert_eq!(outcome, TransferOutcome::Downloaded { bytes: 7 });
        assert_eq!(server.file_requests().len(), 3);
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "finally");
    }

    #[tokio::test]
    async fn timeout_is_reported_as_failure() {
        let server = MockServer::start().await;
        server.set_file(
            "abo",
            "abo_t_now.csv",
            MockFile::Stall(Duration::from_secs(5)),
        );
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("abo_t_now.csv");
        let transfer = AssetTransfer::new(
            Client::new(),
            Duration::from_millis(100),
            RetryPolicy::none(),
        );

        let outcome = transfer
            .fetch_asset(
                &asset(&server, "abo", "abo_t_now.csv"),
                &destination,
                PresencePolicy::AlwaysOverwrite,
            )
            .await;

        assert!(matches!(outcome, TransferOutcome::Failed { .. }));
        assert!(!destination.exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }
}
