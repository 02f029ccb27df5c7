use crate::retry::{is_transient_request_error, is_transient_status, Retryable};
use thiserror::Error;

/// Failures while walking the station catalog. Request and response failures end
/// the run: without a complete station list there is nothing to synchronize.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse search response from {url}")]
    JsonParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Raised per feature; the catalog walk skips it and continues.
    #[error("Invalid station feature '{id}': {reason}")]
    InvalidFeature { id: String, reason: String },

    #[error("Giving up on {url} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<CatalogError>,
    },
}

impl CatalogError {
    fn url(&self) -> &str {
        match self {
            CatalogError::NetworkRequest(url, _)
            | CatalogError::HttpStatus { url, .. }
            | CatalogError::JsonParse { url, .. }
            | CatalogError::RetriesExhausted { url, .. } => url,
            CatalogError::InvalidFeature { .. } => "",
        }
    }
}

impl Retryable for CatalogError {
    fn is_transient(&self) -> bool {
        match self {
            CatalogError::NetworkRequest(_, e) => is_transient_request_error(e),
            CatalogError::HttpStatus { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    fn exhausted(self, attempts: u32) -> Self {
        CatalogError::RetriesExhausted {
            url: self.url().to_string(),
            attempts,
            last: Box::new(self),
        }
    }
}
