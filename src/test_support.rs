//! In-process stand-in for the STAC catalog and its asset host.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What the asset host answers for one file.
#[derive(Debug, Clone)]
pub(crate) enum MockFile {
    Content(Vec<u8>),
    Status(StatusCode),
    /// Answers with `status` the first `times` requests, then with `content`.
    FailTimes {
        times: u32,
        status: StatusCode,
        content: Vec<u8>,
    },
    /// Sleeps before answering, to provoke client timeouts.
    Stall(Duration),
    /// Answers with `content` after `delay`.
    Slow { delay: Duration, content: Vec<u8> },
}

#[derive(Default)]
struct MockState {
    pages: Mutex<Vec<Value>>,
    search_failures: Mutex<VecDeque<StatusCode>>,
    search_stall: Mutex<Option<Duration>>,
    search_requests: Mutex<Vec<Value>>,
    files: Mutex<HashMap<String, MockFile>>,
    file_requests: Mutex<Vec<String>>,
    files_in_flight: AtomicUsize,
    max_files_in_flight: AtomicUsize,
}

pub(crate) struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
}

/// Builds a catalog feature with unreachable asset hrefs. Use [`MockServer::feature`]
/// when the assets have to be downloadable.
pub(crate) fn feature(id: &str, title: &str, asset_names: &[&str]) -> Value {
    feature_with_base("http://127.0.0.1:9", id, title, asset_names)
}

fn feature_with_base(base_url: &str, id: &str, title: &str, asset_names: &[&str]) -> Value {
    let assets: serde_json::Map<String, Value> = asset_names
        .iter()
        .map(|name| {
            (
                name.to_string(),
                json!({
                    "href": format!("{}/files/{}/{}", base_url, id, name),
                    "type": "text/csv"
                }),
            )
        })
        .collect();
    json!({
        "id": id,
        "type": "Feature",
        "properties": {"title": title},
        "assets": assets
    })
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/search", post(search))
            .route("/files/:station/:name", get(file))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state }
    }

    /// A feature whose asset hrefs resolve against this server.
    pub fn feature(&self, id: &str, title: &str, asset_names: &[&str]) -> Value {
        feature_with_base(&self.base_url, id, title, asset_names)
    }

    /// Serves `pages` linked by `next` links whose cursor is the next page index.
    pub fn set_station_pages(&self, pages: Vec<Vec<Value>>) {
        let count = pages.len();
        let raw = pages
            .into_iter()
            .enumerate()
            .map(|(idx, features)| {
                let mut links = vec![json!({"rel": "self", "href": "/search"})];
                if idx + 1 < count {
                    links.push(json!({
                        "rel": "next",
                        "method": "POST",
                        "body": {"cursor": (idx + 1).to_string()}
                    }));
                }
                json!({"type": "FeatureCollection", "features": features, "links": links})
            })
            .collect();
        self.set_raw_pages(raw);
    }

    /// Serves the given bodies verbatim, selected by the numeric cursor.
    pub fn set_raw_pages(&self, pages: Vec<Value>) {
        *self.state.pages.lock().unwrap() = pages;
    }

    /// Upcoming search requests are answered with these statuses first.
    pub fn fail_searches(&self, statuses: Vec<StatusCode>) {
        *self.state.search_failures.lock().unwrap() = statuses.into();
    }

    /// Every search request sleeps this long before being answered.
    pub fn stall_searches(&self, delay: Duration) {
        *self.state.search_stall.lock().unwrap() = Some(delay);
    }

    pub fn search_requests(&self) -> Vec<Value> {
        self.state.search_requests.lock().unwrap().clone()
    }

    pub fn set_file(&self, station: &str, name: &str, file: MockFile) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(format!("{}/{}", station, name), file);
    }

    pub fn set_content(&self, station: &str, name: &str, content: &str) {
        self.set_file(station, name, MockFile::Content(content.as_bytes().to_vec()));
    }

    /// Every asset request so far, as `<station>/<name>`.
    pub fn file_requests(&self) -> Vec<String> {
        self.state.file_requests.lock().unwrap().clone()
    }

    /// Highest number of asset requests that were being answered at the same time.
    pub fn max_files_in_flight(&self) -> usize {
        self.state.max_files_in_flight.load(Ordering::SeqCst)
    }

    pub fn href(&self, station: &str, name: &str) -> reqwest::Url {
        reqwest::Url::parse(&format!("{}/files/{}/{}", self.base_url, station, name)).unwrap()
    }
}

async fn search(State(state): State<Arc<MockState>>, Json(payload): Json<Value>) -> Response {
    let cursor = payload
        .get("cursor")
        .and_then(Value::as_str)
        .map(|c| c.parse::<usize>().unwrap_or(usize::MAX))
        .unwrap_or(0);
    state.search_requests.lock().unwrap().push(payload);

    let stall = *state.search_stall.lock().unwrap();
    if let Some(delay) = stall {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = state.search_failures.lock().unwrap().pop_front() {
        return (status, "catalog unavailable").into_response();
    }

    match state.pages.lock().unwrap().get(cursor) {
        Some(page) => Json(page.clone()).into_response(),
        None => (StatusCode::BAD_REQUEST, "unknown cursor").into_response(),
    }
}

async fn file(
    State(state): State<Arc<MockState>>,
    Path((station, name)): Path<(String, String)>,
) -> Response {
    let in_flight = state.files_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state
        .max_files_in_flight
        .fetch_max(in_flight, Ordering::SeqCst);
    let response = serve_file(&state, station, name).await;
    state.files_in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

async fn serve_file(state: &MockState, station: String, name: String) -> Response {
    let key = format!("{}/{}", station, name);
    state.file_requests.lock().unwrap().push(key.clone());

    let behaviour = {
        let mut files = state.files.lock().unwrap();
        match files.get_mut(&key) {
            Some(MockFile::FailTimes {
                times,
                status,
                content,
            }) => {
                if *times > 0 {
                    *times -= 1;
                    MockFile::Status(*status)
                } else {
                    MockFile::Content(content.clone())
                }
            }
            Some(other) => other.clone(),
            None => MockFile::Status(StatusCode::NOT_FOUND),
        }
    };

    match behaviour {
        MockFile::Content(content) => (StatusCode::OK, Bytes::from(content)).into_response(),
        MockFile::Status(status) => (status, "no such asset").into_response(),
        MockFile::Stall(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, "too late").into_response()
        }
        MockFile::Slow { delay, content } => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Bytes::from(content)).into_response()
        }
        MockFile::FailTimes { .. } => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
