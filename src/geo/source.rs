//! The IP geolocation collaborator.
//!
//! # Responsibilities
//! - Answer `IP → (region name, ISP line)` queries
//! - Load the optional on-disk database at startup
//!
//! # Design Decisions
//! - Behind a trait so the request parser never depends on a concrete
//!   database format
//! - Lookups are pure in-memory after the initial load

use std::fs;
use std::net::IpAddr;
use std::path::Path;

use ipnet::IpNet;
use serde::Deserialize;

/// The two fields of a geo record the service consumes.
///
/// `line` is a slash-separated list of native ISP names.
#[derive(Debug, Clone)]
pub struct IpInfo {
    pub region_name: String,
    pub line: String,
}

/// Error type for geo database operations.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("read geo database: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse geo database: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no geo data for {0}")]
    NotFound(IpAddr),
}

/// A source of per-IP geolocation data.
pub trait GeoSource: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<IpInfo, GeoError>;
}

/// Fallback source used when no database file is configured.
///
/// Returns the same record for every address, mirroring the behaviour of
/// running without a city database.
pub struct FixedGeo {
    info: IpInfo,
}

impl Default for FixedGeo {
    fn default() -> Self {
        Self {
            info: IpInfo {
                region_name: "北京".to_string(),
                line: "教育网".to_string(),
            },
        }
    }
}

impl GeoSource for FixedGeo {
    fn lookup(&self, _ip: IpAddr) -> Result<IpInfo, GeoError> {
        Ok(self.info.clone())
    }
}

#[derive(Deserialize)]
struct CidrRecord {
    cidr: IpNet,
    region: String,
    #[serde(default)]
    line: String,
}

/// Geo database loaded from a JSON file of CIDR records.
///
/// Lookup is longest-prefix over all entries containing the address.
pub struct CidrGeo {
    records: Vec<CidrRecord>,
}

impl CidrGeo {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let content = fs::read_to_string(path)?;
        let records: Vec<CidrRecord> = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), entries = records.len(), "geo database loaded");
        Ok(Self { records })
    }
}

impl GeoSource for CidrGeo {
    fn lookup(&self, ip: IpAddr) -> Result<IpInfo, GeoError> {
        self.records
            .iter()
            .filter(|r| r.cidr.contains(&ip))
            .max_by_key(|r| r.cidr.prefix_len())
            .map(|r| IpInfo {
                region_name: r.region.clone(),
                line: r.line.clone(),
            })
            .ok_or(GeoError::NotFound(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fixed_geo() {
        let geo = FixedGeo::default();
        let info = geo.lookup("203.0.113.1".parse().unwrap()).unwrap();
        assert_eq!(info.region_name, "北京");
        assert_eq!(info.line, "教育网");
    }

    #[test]
    fn test_cidr_geo_longest_prefix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"cidr": "10.0.0.0/8", "region": "北京", "line": "教育网"}},
                {{"cidr": "10.1.0.0/16", "region": "上海", "line": "电信/联通"}},
                {{"cidr": "2001:da8::/32", "region": "北京", "line": "教育网"}}
            ]"#
        )
        .unwrap();

        let geo = CidrGeo::load(file.path()).unwrap();

        let info = geo.lookup("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(info.region_name, "上海");

        let info = geo.lookup("10.2.0.1".parse().unwrap()).unwrap();
        assert_eq!(info.region_name, "北京");

        let info = geo.lookup("2001:da8::1".parse().unwrap()).unwrap();
        assert_eq!(info.line, "教育网");

        assert!(geo.lookup("192.0.2.1".parse().unwrap()).is_err());
    }
}
