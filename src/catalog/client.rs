use crate::catalog::error::CatalogError;
use crate::retry::RetryPolicy;
use crate::types::station::{Feature, SearchPage, SearchRequest, Station};
use futures_util::{stream, Stream, TryStreamExt};
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;

/// Walks the `/search` endpoint of a STAC API page by page.
///
/// Every request is bounded by a timeout and retried on transient failures;
/// anything else aborts the walk.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    search_url: String,
    page_limit: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

/// A feature that cannot become a station is skipped so the rest of the walk survives.
fn usable_station(feature: Feature) -> Option<Result<Station, CatalogError>> {
    match Station::try_from(feature) {
        Ok(station) => Some(Ok(station)),
        Err(e) => {
            warn!("Skipping catalog feature: {}", e);
            None
        }
    }
}

enum PageCursor {
    First,
    Next(String),
    Done,
}

impl CatalogClient {
    pub fn new(
        client: Client,
        api_base: &str,
        page_limit: u32,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            search_url: format!("{}/search", api_base.trim_end_matches('/')),
            page_limit,
            timeout,
            retry,
        }
    }

    /// Lazily yields the stations of `collection_id` in catalog order.
    ///
    /// The next page is only requested once the previous page's stations have been
    /// consumed. Pagination ends with the first page that has no `next` link, or
    /// whose `next` link carries no cursor. Features without a usable id are
    /// skipped with a warning. The stream is finite and cannot be restarted; call
    /// this again for a fresh walk.
    pub fn stations<'a>(
        &'a self,
        collection_id: &str,
    ) -> impl Stream<Item = Result<Station, CatalogError>> + 'a {
        let collection_id = collection_id.to_string();
        stream::try_unfold(PageCursor::First, move |cursor| {
            let collection_id = collection_id.clone();
            async move {
                let cursor = match cursor {
                    PageCursor::First => None,
                    PageCursor::Next(cursor) => Some(cursor),
                    PageCursor::Done => return Ok::<_, CatalogError>(None),
                };
                let request = SearchRequest {
                    collections: vec![collection_id],
                    limit: self.page_limit,
                    cursor,
                };
                let page = self.fetch_page(&request).await?;
                let next = match page.next_cursor() {
                    Some(cursor) => PageCursor::Next(cursor),
                    None => PageCursor::Done,
                };
                debug!("Fetched {} stations", page.features.len());
                Ok(Some((page.features, next)))
            }
        })
        .map_ok(|features| stream::iter(features.into_iter().filter_map(usable_station)))
        .try_flatten()
    }

    /// Collects every station of `collection_id`.
    pub async fn list_stations(&self, collection_id: &str) -> Result<Vec<Station>, CatalogError> {
        info!("Fetching stations from {}...", collection_id);
        let stations: Vec<Station> = self.stations(collection_id).try_collect().await?;
        info!("Total stations found: {}", stations.len());
        Ok(stations)
    }

    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage, CatalogError> {
        self.retry
            .run("Catalog search", || self.fetch_page_once(request))
            .await
    }

    async fn fetch_page_once(&self, request: &SearchRequest) -> Result<SearchPage, CatalogError> {
        let url = &self.search_url;
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| CatalogError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    CatalogError::HttpStatus {
                        url: url.clone(),
                        status,
                        source: e,
                    }
                } else {
                    CatalogError::NetworkRequest(url.clone(), e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::NetworkRequest(url.clone(), e))?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::JsonParse {
            url: url.clone(),
            source: e,
        })
    }
}
