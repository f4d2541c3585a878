//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::net::TcpListener;

use mirror302::config::ServiceConfig;
use mirror302::influx::{FreshnessSource, Item, QueryError, QueryOutcome};
use mirror302::{Server, Shutdown};

/// A programmable in-memory freshness source.
#[derive(Default)]
pub struct MockSource {
    items: Mutex<HashMap<String, Vec<Item>>>,
    hard_fail: AtomicBool,
    calls: AtomicU32,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_items(&self, cname: &str, items: Vec<Item>) {
        self.items
            .lock()
            .unwrap()
            .insert(cname.to_string(), items);
    }

    pub fn set_hard_fail(&self, fail: bool) {
        self.hard_fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FreshnessSource for MockSource {
    async fn query(&self, cname: &str) -> Result<QueryOutcome, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hard_fail.load(Ordering::SeqCst) {
            return Err(QueryError::Http("mock outage".to_string()));
        }
        let items = self
            .items
            .lock()
            .unwrap()
            .get(cname)
            .cloned()
            .unwrap_or_default();
        Ok(QueryOutcome {
            items,
            warning: None,
        })
    }
}

/// One freshness row.
pub fn item(mirror: &str, path: &str, delta: i64) -> Item {
    Item {
        value: delta,
        mirror: mirror.to_string(),
        path: path.to_string(),
        time: Utc::now(),
    }
}

/// Write an endpoint descriptor file into the mirrorz.d directory.
pub fn write_descriptor(dir: &Path, abbr: &str, endpoints_json: &str) {
    let content = format!(
        r#"{{"site": {{"abbr": "{abbr}"}}, "endpoints": {endpoints_json}}}"#
    );
    std::fs::write(dir.join(format!("{abbr}.json")), content).unwrap();
}

/// A config pointing at the given mirrorz.d directory.
pub fn test_config(mirrorz_d: &Path, cache_secs: u64) -> ServiceConfig {
    ServiceConfig {
        http_bind_address: "127.0.0.1:0".to_string(),
        mirrorz_d_directory: mirrorz_d.to_path_buf(),
        homepage: "mirrors.example.org".to_string(),
        domain_length: 3,
        cache_time: cache_secs,
        ..ServiceConfig::default()
    }
}

/// Start a server on an ephemeral port; returns its address and handles.
#[allow(dead_code)]
pub async fn start_server(
    config: ServiceConfig,
    source: Arc<MockSource>,
) -> (SocketAddr, Arc<Server>, Shutdown) {
    let server = Arc::new(Server::with_source(config, source).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let run_server = server.clone();
    let run_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = run_server.run(listener, run_shutdown).await;
    });

    (addr, server, shutdown)
}

/// An HTTP client that does not follow redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
