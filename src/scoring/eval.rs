//! Scoring a matched endpoint against the request.

use crate::geo;
use crate::meta::RequestMeta;
use crate::registry::Endpoint;

use super::Score;

/// Calculate the score for an endpoint with a given request.
///
/// `delta`, `abbr` and `repo` are supplied later by the caller from the
/// freshness item.
pub fn eval(endpoint: &Endpoint, meta: &RequestMeta) -> Score {
    let mut score = Score {
        geo: f64::INFINITY,
        label: endpoint.label.clone(),
        resolve: endpoint.resolve.clone(),
        ..Score::default()
    };
    for (index, label) in meta.labels.iter().enumerate() {
        if *label == endpoint.label {
            // The last matching label takes precedence.
            score.pos = index + 1;
        }
    }
    for region in &endpoint.range_region {
        let d = geo::distance(&meta.region, region);
        if d < score.geo {
            score.geo = d;
        }
    }
    if endpoint.match_isps(&meta.isp) {
        score.isp = 1;
    }
    score.mask = endpoint.match_ip_mask(meta.ip);
    score
}
