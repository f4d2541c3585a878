//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML
//! config document. Keys are kebab-case.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the redirect service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Freshness database connection.
    pub influxdb: InfluxConfig,

    /// Optional geo database file (CIDR records).
    pub ipdb_file: Option<PathBuf>,

    /// Listener address (e.g. "0.0.0.0:8080").
    pub http_bind_address: String,

    /// Directory of endpoint descriptor JSON files.
    pub mirrorz_d_directory: PathBuf,

    /// Host the `/` route redirects to when no label matches.
    pub homepage: String,

    /// Number of dotted parts required in `X-Forwarded-Host` before
    /// subdomain labels are trusted.
    pub domain_length: usize,

    /// Resolve cache TTL in seconds.
    pub cache_time: u64,

    /// Directory for resolve/fail/gc logs; logging disabled when unset.
    pub log_directory: Option<PathBuf>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Freshness database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,

    /// Per-query deadline in seconds.
    pub query_timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8086".to_string(),
            token: String::new(),
            org: String::new(),
            bucket: String::new(),
            query_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
