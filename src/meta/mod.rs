//! Request metadata extraction.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, headers)
//!     → cname + tail (first path segment, remainder)
//!     → scheme (X-Forwarded-Proto), client IP (X-Real-IP)
//!     → geo lookup → region code + ISP codes
//!     → labels (X-Forwarded-Host subdomain tokens)
//!     → RequestMeta (immutable for the rest of the request)
//! ```
//!
//! # Design Decisions
//! - Missing or malformed headers yield empty/default fields, never errors
//! - Labels are only trusted when the forwarded host has exactly the
//!   configured number of dotted parts
//! - The fingerprint ties a cache entry to (ip, cname, scheme, labels)

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::geo::{self, GeoSource};

/// Per-request client attributes, derived once and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// First path segment: the mirror name, e.g. `ubuntu`.
    pub cname: String,
    /// Remainder of the path, empty or beginning with `/`.
    pub tail: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Client address from `X-Real-IP`, if present and parseable.
    pub ip: Option<IpAddr>,
    /// Two-letter region code, empty if unknown.
    pub region: String,
    /// ISP codes derived from the geo `line` field.
    pub isp: Vec<String>,
    /// Subdomain tokens from `X-Forwarded-Host`.
    pub labels: Vec<String>,
}

impl RequestMeta {
    /// Whether the label host requested an IPv4-only endpoint.
    pub fn v4_only(&self) -> bool {
        self.labels.last().map(String::as_str) == Some("4")
    }

    /// Whether the label host requested an IPv6-only endpoint.
    pub fn v6_only(&self) -> bool {
        self.labels.last().map(String::as_str) == Some("6")
    }

    /// The resolve-cache key for this request.
    ///
    /// None of the fields legally contain `+`, so the join is collision-free
    /// for realistic inputs.
    pub fn fingerprint(&self) -> String {
        let ip = self.ip.map(|ip| ip.to_string()).unwrap_or_default();
        let labels = self.labels.join("-");
        [
            ip.as_str(),
            self.cname.as_str(),
            self.scheme.as_str(),
            labels.as_str(),
        ]
        .join("+")
    }
}

impl fmt::Display for RequestMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ip = match self.ip {
            Some(ip) => ip.to_string(),
            None => "<none>".to_string(),
        };
        write!(
            f,
            "{}:{} ({}, {}/{}) {:?}",
            self.scheme,
            self.cname,
            ip,
            self.region,
            self.isp.join(","),
            self.labels,
        )
    }
}

/// Parses `RequestMeta` out of incoming requests.
pub struct MetaParser {
    domain_length: usize,
    geo: Arc<dyn GeoSource>,
}

impl MetaParser {
    pub fn new(domain_length: usize, geo: Arc<dyn GeoSource>) -> Self {
        Self { domain_length, geo }
    }

    /// Derive all client attributes from the request path and headers.
    pub fn parse(&self, path: &str, headers: &HeaderMap) -> RequestMeta {
        let (cname, tail) = cname_and_tail(path);
        let mut meta = RequestMeta {
            cname,
            tail,
            scheme: self.scheme(headers),
            ip: self.ip(headers),
            labels: self.labels(headers),
            ..RequestMeta::default()
        };
        if let Some(ip) = meta.ip {
            match self.geo.lookup(ip) {
                Ok(info) => {
                    if let Some(code) = geo::region_name_to_code(&info.region_name) {
                        meta.region = code.to_string();
                    }
                    meta.isp = info
                        .line
                        .split('/')
                        .filter_map(geo::isp_name_to_code)
                        .map(str::to_string)
                        .collect();
                }
                Err(e) => {
                    tracing::warn!(ip = %ip, error = %e, "geo lookup failed");
                }
            }
        }
        meta
    }

    /// Request scheme from `X-Forwarded-Proto`, defaulting to `https`.
    pub fn scheme(&self, headers: &HeaderMap) -> String {
        header_str(headers, "x-forwarded-proto")
            .filter(|s| !s.is_empty())
            .unwrap_or("https")
            .to_string()
    }

    /// Client address from `X-Real-IP`, if parseable.
    pub fn ip(&self, headers: &HeaderMap) -> Option<IpAddr> {
        header_str(headers, "x-real-ip")?.parse().ok()
    }

    /// Subdomain tokens from `X-Forwarded-Host`.
    ///
    /// Only populated when the dotted host has exactly `domain_length`
    /// parts; the first part is then split on `-`.
    pub fn labels(&self, headers: &HeaderMap) -> Vec<String> {
        let Some(host) = header_str(headers, "x-forwarded-host") else {
            return Vec::new();
        };
        let dots: Vec<&str> = host.split('.').collect();
        if dots.len() != self.domain_length {
            return Vec::new();
        }
        dots[0].split('-').map(str::to_string).collect()
    }
}

/// Split a request path into the mirror name and the remaining tail.
pub fn cname_and_tail(path: &str) -> (String, String) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.split_once('/') {
        Some((cname, rest)) => (cname.to_string(), format!("/{rest}")),
        None => (trimmed.to_string(), String::new()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::FixedGeo;
    use axum::http::HeaderValue;

    fn parser(domain_length: usize) -> MetaParser {
        MetaParser::new(domain_length, Arc::new(FixedGeo::default()))
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_cname_and_tail() {
        assert_eq!(cname_and_tail("/ubuntu"), ("ubuntu".into(), "".into()));
        assert_eq!(
            cname_and_tail("/ubuntu/dists/jammy"),
            ("ubuntu".into(), "/dists/jammy".into())
        );
        assert_eq!(cname_and_tail("/"), ("".into(), "".into()));
    }

    #[test]
    fn test_scheme_default() {
        let p = parser(3);
        assert_eq!(p.scheme(&headers(&[])), "https");
        assert_eq!(p.scheme(&headers(&[("x-forwarded-proto", "http")])), "http");
    }

    #[test]
    fn test_labels_require_domain_length() {
        let p = parser(3);
        let h = headers(&[("x-forwarded-host", "cn-bj-tuna.example.org")]);
        assert_eq!(p.labels(&h), vec!["cn", "bj", "tuna"]);

        // Wrong dot count disables label matching entirely.
        let h = headers(&[("x-forwarded-host", "cn-bj-tuna.mirrors.example.org")]);
        assert!(p.labels(&h).is_empty());
        assert!(p.labels(&headers(&[])).is_empty());
    }

    #[test]
    fn test_v4_v6_only() {
        let mut meta = RequestMeta {
            labels: vec!["tuna".into(), "4".into()],
            ..RequestMeta::default()
        };
        assert!(meta.v4_only());
        assert!(!meta.v6_only());

        meta.labels = vec!["6".into()];
        assert!(meta.v6_only());

        meta.labels.clear();
        assert!(!meta.v4_only());
        assert!(!meta.v6_only());
    }

    #[test]
    fn test_fingerprint() {
        let p = parser(3);
        let h = headers(&[
            ("x-real-ip", "203.0.113.7"),
            ("x-forwarded-proto", "http"),
            ("x-forwarded-host", "bj-tuna.example.org"),
        ]);
        let meta = p.parse("/ubuntu/dists", &h);
        assert_eq!(meta.fingerprint(), "203.0.113.7+ubuntu+http+bj-tuna");

        // Distinct attribute sets yield distinct keys.
        let other = p.parse("/debian/dists", &h);
        assert_ne!(meta.fingerprint(), other.fingerprint());

        let no_ip = p.parse("/ubuntu/dists", &headers(&[]));
        assert_eq!(no_ip.fingerprint(), "+ubuntu+https+");
    }

    #[test]
    fn test_parse_geo_mapping() {
        // FixedGeo reports 北京 / 教育网 for every address.
        let p = parser(3);
        let h = headers(&[("x-real-ip", "203.0.113.7")]);
        let meta = p.parse("/ubuntu", &h);
        assert_eq!(meta.region, "BJ");
        assert_eq!(meta.isp, vec!["CERNET"]);

        // No IP means no geo lookup at all.
        let meta = p.parse("/ubuntu", &headers(&[]));
        assert!(meta.region.is_empty());
        assert!(meta.isp.is_empty());
    }
}
