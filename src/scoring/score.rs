//! The per-candidate score and its orderings.

use std::fmt;

use rand::Rng;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::geo;

/// Stand-in for an infinite geo distance in JSON output.
pub const JSON_INF_REPLACEMENT: f64 = 1e100;

/// Evaluation of one endpoint for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    /// 1-based position of the matching request label; bigger is better.
    pub pos: usize,
    /// Longest matching CIDR prefix length.
    pub mask: u8,
    /// Geographical distance in metres.
    pub geo: f64,
    /// 1 iff the endpoint's ISP set intersects the client's.
    pub isp: u8,
    /// Freshness signal in seconds, often negative.
    pub delta: i64,

    // payload
    pub abbr: String,
    pub label: String,
    pub resolve: String,
    pub repo: String,
}

impl Score {
    /// Whether `self` strictly ranks before `r`.
    ///
    /// This is a strict weak order: criteria are consulted in turn and the
    /// first discriminating one decides.
    pub fn ranks_before(&self, r: &Score) -> bool {
        if self.pos != r.pos {
            return self.pos > r.pos;
        }
        if self.mask != r.mask {
            return self.mask > r.mask;
        }
        // Favor a matching ISP over raw geo distance.
        let l_geo = if self.isp > 0 { self.geo / 2.0 } else { self.geo };
        let r_geo = if r.isp > 0 { r.geo / 2.0 } else { r.geo };
        if (l_geo - r_geo).abs() > geo::DISTANCE_EPSILON {
            return l_geo < r_geo;
        }
        if self.isp != r.isp {
            return self.isp > r.isp;
        }
        // Delta: zero (unknown) is worst, negative beats positive,
        // closer-to-zero wins among negatives, smaller wins among positives.
        if self.delta == 0 {
            false
        } else if r.delta == 0 {
            true
        } else if self.delta < 0 && r.delta > 0 {
            true
        } else if r.delta < 0 && self.delta > 0 {
            false
        } else if self.delta > 0 && r.delta > 0 {
            self.delta < r.delta
        } else {
            self.delta > r.delta
        }
    }

    /// Legacy dominance ignoring delta: at least as good a label position
    /// and a strictly better range hit.
    pub fn dominate_except_delta(&self, r: &Score) -> bool {
        let range_dominate =
            self.mask > r.mask || (self.mask == r.mask && self.isp >= r.isp && r.isp == 0);
        self.pos >= r.pos && range_dominate
    }

    /// Legacy dominance, additionally requiring same-sign-and-better delta.
    pub fn dominate(&self, r: &Score) -> bool {
        let delta_dominate = (self.delta == 0 && r.delta == 0)
            || (self.delta < 0 && r.delta < 0 && self.delta > r.delta)
            || (self.delta > 0 && r.delta > 0 && self.delta < r.delta);
        self.dominate_except_delta(r) && delta_dominate
    }

    /// Whether only delta carries information for this candidate.
    pub fn delta_only(&self) -> bool {
        self.pos == 0 && self.mask == 0 && self.isp == 0
    }

    pub fn equal_except_delta(&self, r: &Score) -> bool {
        self.pos == r.pos && self.mask == r.mask && self.isp == r.isp
    }

    /// Whether this is the zero score (used as a placeholder in logs).
    pub fn is_empty(&self) -> bool {
        *self == Score::default()
    }

    fn rounded_geo_km(&self) -> f64 {
        (self.geo / 1e4).round() * 10.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<empty>");
        }
        let geo_string = if self.geo.is_finite() {
            format!("{:.0}km", self.rounded_geo_km())
        } else {
            format!("{}", self.geo)
        };
        write!(
            f,
            "{{{}, /{}, {}, {}, {:+}, {}:{}, {}}}",
            self.pos, self.mask, geo_string, self.isp, self.delta,
            self.label, self.resolve, self.repo,
        )
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let geo = if self.geo.is_infinite() {
            JSON_INF_REPLACEMENT
        } else {
            self.rounded_geo_km()
        };
        let mut s = serializer.serialize_struct("Score", 9)?;
        s.serialize_field("pos", &self.pos)?;
        s.serialize_field("mask", &self.mask)?;
        s.serialize_field("geo", &geo)?;
        s.serialize_field("isp", &self.isp)?;
        s.serialize_field("delta", &self.delta)?;
        s.serialize_field("abbr", &self.abbr)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("resolve", &self.resolve)?;
        s.serialize_field("repo", &self.repo)?;
        s.end()
    }
}

/// An ordered collection of candidate scores.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Scores(pub Vec<Score>);

impl Scores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, score: Score) {
        self.0.push(score);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Score> {
        self.0.iter()
    }

    /// Sort best-first by the strict order.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| {
            if a.ranks_before(b) {
                std::cmp::Ordering::Less
            } else if b.ranks_before(a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
    }

    /// Scores not dominated (ignoring delta) by any other.
    pub fn optimals_except_delta(&self) -> Scores {
        self.non_dominated(Score::dominate_except_delta)
    }

    /// Scores not dominated by any other.
    pub fn optimals(&self) -> Scores {
        self.non_dominated(Score::dominate)
    }

    fn non_dominated(&self, dominates: fn(&Score, &Score) -> bool) -> Scores {
        let mut out = Scores::new();
        for (i, l) in self.0.iter().enumerate() {
            let dominated = self
                .0
                .iter()
                .enumerate()
                .any(|(j, r)| i != j && dominates(r, l));
            if !dominated {
                out.push(l.clone());
            }
        }
        out
    }

    /// Whether every score carries only delta information.
    pub fn all_delta(&self) -> bool {
        self.0.iter().all(Score::delta_only)
    }

    /// Whether all scores are equal apart from delta.
    pub fn all_equal_except_delta(&self) -> bool {
        match self.0.first() {
            Some(first) => self.0.iter().all(|s| s.equal_except_delta(first)),
            None => true,
        }
    }

    /// Uniform pick among the first `r` scores. Panics on an empty range.
    pub fn random_range(&self, r: usize) -> Score {
        let i = rand::thread_rng().gen_range(0..r);
        self.0[i].clone()
    }

    /// Uniform pick from the better half (rounded up) of a sorted list.
    ///
    /// Always succeeds on a non-empty list.
    pub fn random_half(&self) -> Score {
        self.random_range((self.len() + 1) / 2)
    }
}

impl IntoIterator for Scores {
    type Item = Score;
    type IntoIter = std::vec::IntoIter<Score>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
