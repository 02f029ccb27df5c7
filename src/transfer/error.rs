use crate::retry::{is_transient_request_error, is_transient_status, Retryable};
use std::path::PathBuf;
use thiserror::Error;

/// Failure to mirror a single asset. Never fatal for a run: it ends up as
/// [`crate::TransferOutcome::Failed`] in the summary.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Raised while streaming the body, the connection dropped or timed out
    #[error("Download of {url} was interrupted")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to move download into place at '{0}'")]
    Persist(PathBuf, #[source] tempfile::PathPersistError),

    #[error("Giving up on {url} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<TransferError>,
    },
}

impl TransferError {
    fn url(&self) -> String {
        match self {
            TransferError::NetworkRequest(url, _)
            | TransferError::HttpStatus { url, .. }
            | TransferError::Body { url, .. }
            | TransferError::RetriesExhausted { url, .. } => url.clone(),
            TransferError::Io(path, _) | TransferError::Persist(path, _) => {
                path.display().to_string()
            }
        }
    }
}

impl Retryable for TransferError {
    fn is_transient(&self) -> bool {
        match self {
            TransferError::NetworkRequest(_, e) => is_transient_request_error(e),
            TransferError::HttpStatus { status, .. } => is_transient_status(*status),
            TransferError::Body { .. } => true,
            _ => false,
        }
    }

    fn exhausted(self, attempts: u32) -> Self {
        TransferError::RetriesExhausted {
            url: self.url(),
            attempts,
            last: Box::new(self),
        }
    }
}
