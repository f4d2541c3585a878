//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and resolver produce:
//!     → tracing events (structured diagnostics, stdout)
//!     → metrics counters (requests, cache hits, failures)
//!
//! Consumers:
//!     → Metrics endpoint (Prometheus scrape, config-gated)
//!     → Service log streams live in `crate::logging`
//! ```
//!
//! # Design Decisions
//! - Counters are cheap atomic increments on the hot path
//! - The Prometheus listener is off by default

pub mod metrics;
