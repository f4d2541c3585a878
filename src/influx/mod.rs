//! The time-series freshness collaborator.
//!
//! # Data Flow
//! ```text
//! cname
//!     → Flux query (last delta per mirror, 15 minute window)
//!     → InfluxDB 2.x /api/v2/query (annotated CSV response)
//!     → csv.rs (typed rows, disabled mirrors filtered)
//!     → Vec<Item> { mirror, path, delta, time }
//! ```
//!
//! # Design Decisions
//! - Behind the `FreshnessSource` trait so tests and future sources can
//!   substitute the live database
//! - Untyped column values are converted once at the boundary; the rest of
//!   the service only sees typed items
//! - A result with trailing error rows is a soft failure: items are
//!   returned together with the warning

mod csv;

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::InfluxConfig;

/// One typed row of the freshness result.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Seconds out-of-date; typically negative.
    pub value: i64,
    /// Site abbr this row belongs to.
    pub mirror: String,
    /// Repo path for the redirect.
    pub path: String,
    pub time: DateTime<Utc>,
}

/// A complete query result, possibly carrying a trailing soft error.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub items: Vec<Item>,
    /// Set when the response contained data plus an error table.
    pub warning: Option<String>,
}

/// Error type for freshness queries.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("freshness query request: {0}")]
    Http(String),
    #[error("freshness query status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("freshness query timed out after {0:?}")]
    Timeout(Duration),
    #[error("freshness result parse: {0}")]
    Parse(String),
}

/// A source of per-mirror freshness data.
#[async_trait]
pub trait FreshnessSource: Send + Sync {
    async fn query(&self, cname: &str) -> Result<QueryOutcome, QueryError>;
}

/// The InfluxDB 2.x HTTP implementation.
pub struct InfluxSource {
    url: String,
    token: String,
    org: String,
    bucket: String,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl InfluxSource {
    pub fn new(config: &InfluxConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            timeout: Duration::from_secs(config.query_timeout_secs),
            client,
        }
    }

    fn flux(&self, cname: &str) -> String {
        // Flux string interpolation; deploy with a read-only token.
        format!(
            r#"from(bucket: "{}")
        |> range(start: -15m)
        |> filter(fn: (r) => r._measurement == "repo" and r.name == "{}")
        |> pivot(rowKey:["_time"], columnKey: ["_field"], valueColumn: "_value")
        |> map(fn: (r) => ({{
            _value: r.value,
            mirror: r.mirror,
            _time: r._time,
            path: r.url,
            disable: r.disable
           }}))
        |> tail(n: 1)"#,
            flux_escape(&self.bucket),
            flux_escape(cname),
        )
    }
}

/// Escape a string for embedding in a Flux string literal.
fn flux_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl FreshnessSource for InfluxSource {
    async fn query(&self, cname: &str) -> Result<QueryOutcome, QueryError> {
        let uri = format!("{}/api/v2/query?org={}", self.url, self.org);
        let request = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .header(header::CONTENT_TYPE, "application/vnd.flux")
            .header(header::ACCEPT, "application/csv")
            .body(Body::from(self.flux(cname)))
            .map_err(|e| QueryError::Http(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))?
            .map_err(|e| QueryError::Http(e.to_string()))?;

        let status = response.status();
        let body = axum::body::to_bytes(Body::new(response.into_body()), 8 * 1024 * 1024)
            .await
            .map_err(|e| QueryError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(QueryError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let text = std::str::from_utf8(&body)
            .map_err(|e| QueryError::Parse(e.to_string()))?;
        csv::parse_result(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_escape() {
        assert_eq!(flux_escape("plain"), "plain");
        assert_eq!(flux_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn test_flux_query_shape() {
        let source = InfluxSource::new(&InfluxConfig {
            url: "http://127.0.0.1:8086".into(),
            token: "t".into(),
            org: "o".into(),
            bucket: "mirrorz".into(),
            query_timeout_secs: 5,
        });
        let q = source.flux(r#"ubu"ntu"#);
        assert!(q.contains(r#"from(bucket: "mirrorz")"#));
        assert!(q.contains(r#"r.name == "ubu\"ntu""#));
        assert!(q.contains("tail(n: 1)"));
    }
}
