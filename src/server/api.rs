//! Scoring debug API.
//!
//! `GET /api/scoring/<cname>` evaluates every candidate endpoint for the
//! caller exactly as the resolver would, and returns the sorted list as
//! JSON. No cache is consulted and nothing is stored.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::scoring::{self, Scores};

use super::resolve::delta_cutoff;
use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/scoring/{cname}", get(scoring_handler))
}

#[derive(Serialize)]
struct ScoringResponse {
    scores: Scores,
}

async fn scoring_handler(
    State(state): State<AppState>,
    Path(cname): Path<String>,
    headers: HeaderMap,
) -> Response {
    let meta = state.parser.parse(&format!("/{cname}"), &headers);

    let outcome = match state.source.query(&meta.cname).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(cname = %meta.cname, error = %e, "scoring API query failed");
            return (StatusCode::BAD_GATEWAY, "freshness query failed").into_response();
        }
    };

    let cutoff = delta_cutoff(&outcome.items);
    let mut scores = Scores::new();
    for item in &outcome.items {
        let Some(endpoints) = state.registry.lookup(&item.mirror) else {
            continue;
        };
        for endpoint in endpoints.iter() {
            if endpoint.matches(&meta).is_err() {
                continue;
            }
            let mut score = scoring::eval(endpoint, &meta);
            score.abbr = item.mirror.clone();
            score.delta = item.value;
            score.repo = item.path.clone();
            if score.delta < cutoff {
                continue;
            }
            if !endpoint.public && score.mask == 0 && score.isp == 0 {
                continue;
            }
            scores.push(score);
        }
    }
    scores.sort();

    Json(ScoringResponse { scores }).into_response()
}
