//! Candidate scoring subsystem.
//!
//! # Data Flow
//! ```text
//! (matched endpoint, request meta)
//!     → eval.rs (label position, CIDR mask, geo distance, ISP hit)
//!     → Score (+ delta and repo path from the freshness source)
//!
//! Selection:
//!     Scores → sort by the strict order (score.rs)
//!            → or the legacy dominance filter + random-half tie-break
//! ```
//!
//! # Design Decisions
//! - `pos` (user intent) dominates `mask` (IP locality) dominates
//!   geo/ISP proximity; `delta` only breaks remaining ties
//! - A matching ISP halves the effective geo distance
//! - Two scoring modes coexist: the strict total order is the main path,
//!   the dominance predicates remain for the legacy tie-clustering mode

mod eval;
mod score;

pub use eval::eval;
pub use score::{Score, Scores, JSON_INF_REPLACEMENT};
