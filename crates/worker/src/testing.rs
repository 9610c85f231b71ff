//! Test doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sw_cache_core::{AppConfig, CacheDb, Error, Request, Response};
use url::Url;

use crate::fetch::Fetcher;
use crate::host::LocalHost;
use crate::worker::Worker;

pub(crate) const ORIGIN: &str = "https://app.test/";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn get(path: &str) -> Request {
    Request::get(url(path))
}

pub(crate) fn post(path: &str) -> Request {
    Request::new("POST", url(path))
        .with_header("content-type", "application/json")
        .with_body(br#"{"image":"a.png"}"#.to_vec())
}

pub(crate) fn test_config() -> AppConfig {
    AppConfig { origin: Url::parse(ORIGIN).unwrap(), ..AppConfig::default() }
}

/// Scripted network. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Result<Response, String>>>,
    offline: AtomicBool,
    calls: Mutex<Vec<Request>>,
}

impl MockFetcher {
    pub(crate) fn respond(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Ok(response));
    }

    /// Make `path` fail as if the network dropped.
    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Err(format!("connection reset: {path}")));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    /// Answer 200 for every manifest entry of `config`.
    pub(crate) fn serve_manifest(fetcher: &MockFetcher, config: &AppConfig) {
        let mut routes = fetcher.routes.lock().unwrap();
        for url in config.manifest_urls().unwrap() {
            let body = format!("asset {}", url.path());
            routes.insert(url.to_string(), Ok(Response::new(200, body)));
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(Error::Network(reason)),
            None => Ok(Response::new(404, "not found")),
        }
    }
}

/// A worker that has not been installed yet.
pub(crate) async fn new_worker() -> (Worker, Arc<MockFetcher>, Arc<LocalHost>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(MockFetcher::default());
    let host = Arc::new(LocalHost::new());
    let worker = Worker::new(test_config(), db, fetcher.clone(), host.clone());
    (worker, fetcher, host)
}

/// An activated worker over an empty current generation.
pub(crate) async fn active_worker() -> (Worker, Arc<MockFetcher>, Arc<LocalHost>) {
    let config = test_config();
    let generation = config.generation_name();
    let db = CacheDb::open_in_memory().await.unwrap();
    db.open_generation(&generation).await.unwrap();
    db.set_current_generation(&generation).await.unwrap();

    let fetcher = Arc::new(MockFetcher::default());
    let host = Arc::new(LocalHost::new());
    let worker = Worker::resume(config, db, fetcher.clone(), host.clone(), generation);
    (worker, fetcher, host)
}
