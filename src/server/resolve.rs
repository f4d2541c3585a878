//! The resolver pipeline.

use crate::cache::{CacheState, Resolved};
use crate::influx::{Item, QueryError};
use crate::meta::RequestMeta;
use crate::scoring::{self, Score, Scores};
use crate::tracef;
use crate::tracer::Tracer;

use super::AppState;

/// Error type for resolve failures that surface to the client as 404.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Resolve a request to a redirect URL.
///
/// An empty URL is a valid outcome: the caller answers 404 and the negative
/// decision is cached like any other.
pub async fn resolve(
    state: &AppState,
    tracer: &mut Tracer,
    meta: &RequestMeta,
) -> Result<String, ResolveError> {
    tracef!(tracer, "Labels: {:?}\n", meta.labels);
    tracef!(tracer, "IP: {:?}\n", meta.ip);
    tracef!(tracer, "Scheme: {}\n", meta.scheme);

    let key = meta.fingerprint();
    let (cached, cache_state) = state.cache.load(&key);

    if cache_state == CacheState::Fresh {
        // Refresh the read horizon and reuse the decision.
        state.cache.store(key, cached.clone());
        metrics::counter!("mirror302_cache_hits_total").increment(1);
        log_outcome(state, tracer, meta, &cached.url, &Score::default(), 'C');
        return Ok(cached.url);
    }

    let outcome = match state.source.query(&meta.cname).await {
        Ok(outcome) => {
            if let Some(warning) = &outcome.warning {
                tracing::warn!(cname = %meta.cname, warning = %warning, "freshness query soft error");
            }
            outcome
        }
        Err(e) => {
            tracing::error!(cname = %meta.cname, error = %e, "freshness query failed");
            metrics::counter!("mirror302_resolve_failures_total").increment(1);
            return Err(e.into());
        }
    };

    let mut revalidated = false;
    let mut resolve = String::new();
    let mut repo = String::new();

    if cache_state == CacheState::Stale {
        if let Some((r, p)) = resolve_exist(state, tracer, &outcome.items, &cached.resolve) {
            resolve = r;
            repo = p;
            revalidated = true;
        }
    }

    let mut chosen = Score::default();
    if resolve.is_empty() && repo.is_empty() {
        chosen = resolve_best(state, tracer, &outcome.items, meta);
        resolve = chosen.resolve.clone();
        repo = chosen.repo.clone();
    }

    let url = if resolve.is_empty() && repo.is_empty() {
        String::new()
    } else if repo.starts_with("http://") || repo.starts_with("https://") {
        repo.clone()
    } else {
        format!("{}://{}{}", meta.scheme, resolve, repo)
    };

    let entry = if revalidated {
        // Keep the original decision time so the entry still ages out.
        cached.revalidated(url.clone(), resolve)
    } else {
        Resolved::new(url.clone(), resolve)
    };
    state.cache.store(key, entry);

    metrics::counter!("mirror302_resolves_total").increment(1);
    if url.is_empty() {
        metrics::counter!("mirror302_resolve_failures_total").increment(1);
    }
    log_outcome(state, tracer, meta, &url, &chosen, 'R');
    Ok(url)
}

fn log_outcome(
    state: &AppState,
    tracer: &mut Tracer,
    meta: &RequestMeta,
    url: &str,
    score: &Score,
    kind: char,
) {
    if !url.is_empty() {
        let line = format!("{kind}: {url} {meta} {score}");
        state.logs.resolve.log(&line);
        tracef!(tracer, "{}\n", line);
    } else {
        let line = format!("F: {meta}");
        state.logs.fail.log(&line);
        tracef!(tracer, "{}\n", line);
    }
}

/// Freshness cutoff: round(μ − 2σ) over the negative deltas.
///
/// With no negative items the cutoff is 0 and nothing is dropped.
pub fn delta_cutoff(items: &[Item]) -> i64 {
    let negatives: Vec<f64> = items
        .iter()
        .filter(|item| item.value < 0)
        .map(|item| item.value as f64)
        .collect();
    if negatives.is_empty() {
        return 0;
    }
    let n = negatives.len() as f64;
    let mean = negatives.iter().sum::<f64>() / n;
    let variance = negatives.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean - 2.0 * variance.sqrt()).round() as i64
}

/// Find the best mirror for the request across the whole freshness result.
pub fn resolve_best(
    state: &AppState,
    tracer: &mut Tracer,
    items: &[Item],
    meta: &RequestMeta,
) -> Score {
    let mut scores = Scores::new();
    let cutoff = delta_cutoff(items);

    for item in items {
        let abbr = &item.mirror;
        tracef!(tracer, "abbr: {}\n", abbr);
        let Some(endpoints) = state.registry.lookup(abbr) else {
            continue;
        };
        let mut endpoint_scores = Scores::new();
        for endpoint in endpoints.iter() {
            tracef!(tracer, "  endpoint: {} {}\n", endpoint.resolve, endpoint.label);
            if let Err(reason) = endpoint.matches(meta) {
                tracef!(tracer, "    {}\n", reason);
                continue;
            }
            let mut score = scoring::eval(endpoint, meta);
            score.abbr = abbr.clone();
            score.delta = item.value;
            score.repo = item.path.clone();
            tracef!(tracer, "    score: {}\n", score);

            if score.delta < cutoff {
                tracef!(tracer, "    not up-to-date enough\n");
                continue;
            }
            if !endpoint.public && score.mask == 0 && score.isp == 0 {
                tracef!(tracer, "    not hit private\n");
                continue;
            }
            endpoint_scores.push(score);
        }

        if endpoint_scores.is_empty() {
            tracef!(tracer, "  no score found\n");
            continue;
        }

        // Keep the non-dominated scores of this site, or its first one.
        let optimal = endpoint_scores.optimals_except_delta(); // delta all the same
        if !optimal.is_empty() && optimal.len() != endpoint_scores.len() {
            for (index, score) in optimal.iter().enumerate() {
                tracef!(tracer, "  optimal scores: {} {}\n", index, score);
                scores.push(score.clone());
            }
        } else {
            tracef!(tracer, "  first score: {}\n", endpoint_scores.0[0]);
            scores.push(endpoint_scores.0[0].clone());
        }
    }
    if scores.is_empty() {
        return Score::default();
    }

    for (index, score) in scores.iter().enumerate() {
        tracef!(tracer, "scores: {} {}\n", index, score);
    }
    let optimal_scores = scores.optimals();
    if optimal_scores.is_empty() {
        tracing::warn!("optimal scores empty, algorithm implemented wrong");
        return scores.0[0].clone();
    }

    let all_delta = scores.all_delta();
    let all_equal_except_delta = optimal_scores.all_equal_except_delta();
    if all_equal_except_delta || all_delta {
        // all_delta implies all_equal_except_delta
        let mut candidates = if all_delta { scores } else { optimal_scores };
        // Randomly choose one mirror from the better half; on a single
        // candidate this always picks it.
        candidates.sort();
        for (index, score) in candidates.iter().enumerate() {
            tracef!(tracer, "sorted delta scores: {} {}\n", index, score);
        }
        candidates.random_half()
    } else {
        let mut optimal_scores = optimal_scores;
        optimal_scores.sort();
        for (index, score) in optimal_scores.iter().enumerate() {
            tracef!(tracer, "optimal scores: {} {}\n", index, score);
        }
        optimal_scores.0[0].clone()
    }
}

/// Refresh a stale decision: find the freshness item whose site still
/// carries the previously chosen endpoint and reuse it.
pub fn resolve_exist(
    state: &AppState,
    tracer: &mut Tracer,
    items: &[Item],
    old_resolve: &str,
) -> Option<(String, String)> {
    for item in items {
        tracef!(tracer, "abbr: {}\n", item.mirror);
        let Some(endpoints) = state.registry.lookup(&item.mirror) else {
            continue;
        };
        for endpoint in endpoints.iter() {
            tracef!(tracer, "  endpoint: {} {}\n", endpoint.resolve, endpoint.label);
            if endpoint.resolve == old_resolve {
                tracef!(tracer, "exist\n");
                return Some((endpoint.resolve.clone(), item.path.clone()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(value: i64) -> Item {
        Item {
            value,
            mirror: String::new(),
            path: String::new(),
            time: Utc::now(),
        }
    }

    #[test]
    fn test_delta_cutoff_reference() {
        let mut data = vec![-11];
        data.extend([-1; 9]);
        data.extend(0..=10);
        let items: Vec<Item> = data.into_iter().map(item).collect();
        // mean = -2, stddev = 3; zero and positive values are ignored
        assert_eq!(delta_cutoff(&items), -8);
    }

    #[test]
    fn test_delta_cutoff_no_negatives() {
        let items: Vec<Item> = vec![item(0), item(5), item(60)];
        assert_eq!(delta_cutoff(&items), 0);
        assert_eq!(delta_cutoff(&[]), 0);
    }

    #[test]
    fn test_delta_cutoff_drops_ten_day_straggler() {
        let mut items: Vec<Item> = (-60..0).map(item).collect();
        items.push(item(-864_000));
        let cutoff = delta_cutoff(&items);
        assert!(cutoff > -864_000, "straggler must fall below the cutoff");
        assert!(cutoff < -60, "healthy mirrors must survive the cutoff");
    }
}
