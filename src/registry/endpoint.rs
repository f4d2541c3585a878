//! Endpoint descriptors and the request-match predicate.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::Deserialize;

use crate::meta::RequestMeta;

/// Capability bits parsed from the descriptor `filter` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    pub v4: bool,
    pub v4_only: bool,
    pub v6: bool,
    pub v6_only: bool,
    pub ssl: bool,
    pub nossl: bool,
    /// Unrecognised filter tokens, kept for observability.
    pub special: Vec<String>,
}

/// One physical serving location of a site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "EndpointJson")]
pub struct Endpoint {
    /// Identifier, with `-` stripped.
    pub label: String,
    /// Hostname this endpoint redirects to.
    pub resolve: String,
    /// Non-public endpoints only serve callers inside their ranges.
    pub public: bool,
    pub filter: EndpointFilter,
    pub range_region: Vec<String>,
    pub range_isp: Vec<String>,
    pub range_cidr: Vec<IpNet>,
}

/// Raw descriptor shape, converted into [`Endpoint`] at parse time.
#[derive(Deserialize)]
struct EndpointJson {
    #[serde(default)]
    label: String,
    #[serde(default)]
    resolve: String,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    filter: Vec<String>,
    #[serde(default)]
    range: Vec<String>,
}

impl From<EndpointJson> for Endpoint {
    fn from(j: EndpointJson) -> Self {
        let mut e = Endpoint {
            label: j.label.replace('-', ""),
            resolve: j.resolve,
            public: j.public,
            ..Endpoint::default()
        };
        for d in j.filter {
            match d.as_str() {
                "V4" => e.filter.v4 = true,
                "V6" => e.filter.v6 = true,
                "SSL" => e.filter.ssl = true,
                "NOSSL" => e.filter.nossl = true,
                _ => e.filter.special.push(d),
            }
        }
        e.filter.v4_only = e.filter.v4 && !e.filter.v6;
        e.filter.v6_only = e.filter.v6 && !e.filter.v4;
        for d in j.range {
            if let Some(region) = d.strip_prefix("REGION:") {
                e.range_region.push(region.to_string());
            } else if let Some(isp) = d.strip_prefix("ISP:") {
                e.range_isp.push(isp.to_string());
            } else if is_legacy_asn(&d) {
                // Legacy descriptors carry `AS<digits>` in place of `ISP:`.
                e.range_isp.push(d[2..].to_string());
            } else if let Ok(net) = d.parse::<IpNet>() {
                e.range_cidr.push(net);
            }
            // Unparseable CIDRs are dropped.
        }
        e
    }
}

fn is_legacy_asn(s: &str) -> bool {
    s.len() > 2 && s.starts_with("AS") && s[2..].bytes().all(|b| b.is_ascii_digit())
}

impl Endpoint {
    /// Check whether this endpoint can serve the request.
    ///
    /// Returns the first failing reason. An absent client IP counts as IPv6.
    pub fn matches(&self, meta: &RequestMeta) -> Result<(), &'static str> {
        let remote_v4 = matches!(meta.ip, Some(IpAddr::V4(_)));
        if remote_v4 && !self.filter.v4 {
            Err("not v4 endpoint")
        } else if !remote_v4 && !self.filter.v6 {
            Err("not v6 endpoint")
        } else if meta.scheme == "http" && !self.filter.nossl {
            Err("not nossl endpoint")
        } else if meta.scheme == "https" && !self.filter.ssl {
            Err("not ssl endpoint")
        } else if meta.v4_only() && !self.filter.v4_only {
            Err("label v4only but endpoint not v4only")
        } else if meta.v6_only() && !self.filter.v6_only {
            Err("label v6only but endpoint not v6only")
        } else if !self.public && !self.match_isps(&meta.isp) && self.match_ip_mask(meta.ip) == 0 {
            Err("private endpoint")
        } else {
            Ok(())
        }
    }

    /// Whether the given ISP code is preferred by this endpoint.
    pub fn match_isp(&self, isp: &str) -> bool {
        self.range_isp.iter().any(|r| r == isp)
    }

    /// Whether any of the given ISP codes is preferred by this endpoint.
    pub fn match_isps(&self, isps: &[String]) -> bool {
        isps.iter().any(|isp| self.match_isp(isp))
    }

    /// Longest prefix length among the endpoint CIDRs containing `ip`,
    /// 0 if none.
    pub fn match_ip_mask(&self, ip: Option<IpAddr>) -> u8 {
        let Some(ip) = ip else { return 0 };
        self.range_cidr
            .iter()
            .filter(|net| net.contains(&ip))
            .map(|net| net.prefix_len())
            .max()
            .unwrap_or(0)
    }
}

/// Site identity from the descriptor header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub abbr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(json: &str) -> Endpoint {
        serde_json::from_str(json).unwrap()
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            scheme: "https".into(),
            ip: Some("203.0.113.7".parse().unwrap()),
            ..RequestMeta::default()
        }
    }

    #[test]
    fn test_parse_filters() {
        let e = endpoint(
            r#"{"label": "bj-tuna", "resolve": "mirrors.tuna.example",
                "public": true, "filter": ["V4", "SSL", "EXOTIC"], "range": []}"#,
        );
        assert_eq!(e.label, "bjtuna");
        assert!(e.filter.v4 && !e.filter.v6);
        assert!(e.filter.v4_only && !e.filter.v6_only);
        assert!(e.filter.ssl && !e.filter.nossl);
        assert_eq!(e.filter.special, vec!["EXOTIC"]);
    }

    #[test]
    fn test_parse_ranges() {
        let e = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": false,
                "filter": ["V4", "V6", "SSL"],
                "range": ["REGION:BJ", "ISP:CERNET", "AS4538",
                          "101.6.0.0/15", "2001:da8::/32", "garbage"]}"#,
        );
        assert_eq!(e.range_region, vec!["BJ"]);
        assert_eq!(e.range_isp, vec!["CERNET", "4538"]);
        assert_eq!(e.range_cidr.len(), 2); // "garbage" silently dropped
    }

    #[test]
    fn test_match_family_and_scheme() {
        let e = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": true,
                "filter": ["V4", "SSL"], "range": []}"#,
        );
        let mut m = meta();
        assert_eq!(e.matches(&m), Ok(()));

        m.ip = Some("2001:da8::1".parse().unwrap());
        assert_eq!(e.matches(&m), Err("not v6 endpoint"));

        // No IP at all is treated as an IPv6 client.
        m.ip = None;
        assert_eq!(e.matches(&m), Err("not v6 endpoint"));

        let mut m = meta();
        m.scheme = "http".into();
        assert_eq!(e.matches(&m), Err("not nossl endpoint"));

        let nossl = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": true,
                "filter": ["V4", "NOSSL"], "range": []}"#,
        );
        assert_eq!(nossl.matches(&m), Ok(()));
        let m = meta();
        assert_eq!(nossl.matches(&m), Err("not ssl endpoint"));
    }

    #[test]
    fn test_match_label_families() {
        let e = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": true,
                "filter": ["V4", "V6", "SSL"], "range": []}"#,
        );
        let mut m = meta();
        m.labels = vec!["tuna".into(), "4".into()];
        assert_eq!(e.matches(&m), Err("label v4only but endpoint not v4only"));

        m.labels = vec!["tuna".into(), "6".into()];
        m.ip = Some("2001:da8::1".parse().unwrap());
        assert_eq!(e.matches(&m), Err("label v6only but endpoint not v6only"));
    }

    #[test]
    fn test_match_privacy_gate() {
        let e = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": false,
                "filter": ["V4", "SSL"],
                "range": ["ISP:CERNET", "101.6.0.0/15"]}"#,
        );
        let m = meta();
        assert_eq!(e.matches(&m), Err("private endpoint"));

        let mut m = meta();
        m.isp = vec!["CERNET".into()];
        assert_eq!(e.matches(&m), Ok(()));

        let mut m = meta();
        m.ip = Some("101.6.6.6".parse().unwrap());
        assert_eq!(e.matches(&m), Ok(()));
    }

    #[test]
    fn test_match_ip_mask_longest() {
        let e = endpoint(
            r#"{"label": "x", "resolve": "x.example", "public": true,
                "filter": ["V4", "V6", "SSL"],
                "range": ["101.6.0.0/15", "101.6.6.0/24"]}"#,
        );
        assert_eq!(e.match_ip_mask(Some("101.6.6.6".parse().unwrap())), 24);
        assert_eq!(e.match_ip_mask(Some("101.7.0.1".parse().unwrap())), 15);
        assert_eq!(e.match_ip_mask(Some("8.8.8.8".parse().unwrap())), 0);
        assert_eq!(e.match_ip_mask(None), 0);
    }
}
