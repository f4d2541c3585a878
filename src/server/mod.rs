//! HTTP front handler and request lifecycle.
//!
//! # Data Flow
//! ```text
//! GET /<cname>/<tail>
//!     → redirect_handler (parse meta, create tracer)
//!     → resolve.rs (cache → freshness query → scoring → cache)
//!     → 302 Found / 404 Not Found / 200 trace text
//!
//! GET /            → homepage or label-mapped endpoint
//! GET /api/scoring/<cname> → candidate scores as JSON (debug)
//! ```
//!
//! # Design Decisions
//! - One handler for `/` and the wildcard: the original path decides
//! - The resolver is deliberately free of axum types; handlers translate
//! - 302 responses are hand-built (the framework helpers pick other codes)

mod api;
mod resolve;

pub use resolve::{delta_cutoff, resolve, resolve_best, resolve_exist, ResolveError};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::ResolveCache;
use crate::config::ServiceConfig;
use crate::geo::{CidrGeo, FixedGeo, GeoSource};
use crate::influx::{FreshnessSource, InfluxSource};
use crate::logging::LogSet;
use crate::meta::MetaParser;
use crate::registry::MirrorDb;
use crate::tracer::Tracer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MirrorDb>,
    pub cache: ResolveCache,
    pub source: Arc<dyn FreshnessSource>,
    pub parser: Arc<MetaParser>,
    pub logs: LogSet,
    pub homepage: String,
}

/// The redirect service.
pub struct Server {
    state: AppState,
    config: ServiceConfig,
}

impl Server {
    /// Create a server with the live freshness database.
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let source = Arc::new(InfluxSource::new(&config.influxdb));
        Self::with_source(config, source)
    }

    /// Create a server with an injected freshness source.
    pub fn with_source(
        config: ServiceConfig,
        source: Arc<dyn FreshnessSource>,
    ) -> anyhow::Result<Self> {
        let geo: Arc<dyn GeoSource> = match &config.ipdb_file {
            Some(path) => Arc::new(CidrGeo::load(path)?),
            None => Arc::new(FixedGeo::default()),
        };
        let logs = LogSet::open(config.log_directory.as_deref())?;
        let cache = ResolveCache::new(
            Duration::from_secs(config.cache_time),
            logs.gc.clone(),
        );
        let registry = Arc::new(MirrorDb::new());
        if let Err(e) = registry.load(&config.mirrorz_d_directory) {
            tracing::error!(error = %e, "initial registry load failed, starting empty");
        }

        let state = AppState {
            registry,
            cache,
            source,
            parser: Arc::new(MetaParser::new(config.domain_length, geo)),
            logs,
            homepage: config.homepage.clone(),
        };
        Ok(Self { state, config })
    }

    /// Build the axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(redirect_handler))
            .route("/{*path}", any(redirect_handler))
            .nest("/api", api::router())
            .with_state(self.state.clone())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Start the resolve cache's background sweep.
    pub fn spawn_gc_ticker(&self, shutdown: broadcast::Receiver<()>) {
        self.state.cache.spawn_gc_ticker(shutdown);
    }

    /// Reload the endpoint registry from disk (SIGHUP).
    pub fn reload_registry(&self) {
        if let Err(e) = self.state.registry.load(&self.config.mirrorz_d_directory) {
            tracing::error!(error = %e, "registry reload failed, previous snapshot retained");
        }
    }

    /// Reopen the service log files (SIGUSR2).
    pub fn reopen_logs(&self) {
        if let Err(e) = self.state.logs.reopen_all() {
            tracing::error!(error = %e, "log reopen failed");
        }
    }

    /// Drop every cached resolve decision (SIGWINCH).
    pub fn purge_cache(&self) {
        self.state.cache.clear();
        tracing::info!("resolve cache purged");
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Main redirect handler for `/` and every mirror path.
async fn redirect_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let headers = request.headers();

    if path == "/" {
        // Label shortcut: redirect straight to a known endpoint host.
        let scheme = state.parser.scheme(headers);
        let labels = state.parser.labels(headers);
        if let Some(label) = labels.last() {
            if let Some(resolve) = state.registry.resolve_label(label) {
                return found(&format!("{scheme}://{resolve}"));
            }
        }
        return found(&format!("{}://{}", scheme, state.homepage));
    }

    let trace_enabled = has_trace_flag(request.uri().query());
    let mut tracer = Tracer::new(trace_enabled);
    let meta = state.parser.parse(&path, headers);

    let result = resolve(&state, &mut tracer, &meta).await;

    if tracer.is_enabled() {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            tracer.into_string(),
        )
            .into_response();
    }

    match result {
        Ok(url) if !url.is_empty() => {
            let query = match request.uri().query() {
                Some(q) => format!("?{q}"),
                None => String::new(),
            };
            found(&format!("{}{}{}", url, meta.tail, query))
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn has_trace_flag(query: Option<&str>) -> bool {
    let Some(query) = query else { return false };
    query
        .split('&')
        .any(|pair| pair == "trace" || pair.starts_with("trace="))
}

/// A `302 Found` response. The axum redirect helpers all pick other codes.
fn found(location: &str) -> Response {
    match Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(location, error = %e, "building redirect failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
