//! Endpoint registry subsystem.
//!
//! # Data Flow
//! ```text
//! mirrorz.d directory (*.json descriptors)
//!     → db.rs (scan, parse, build maps)
//!     → atomic snapshot publication:
//!         abbr  → [Endpoint]   (resolver candidate lookup)
//!         label → resolve      (the `/` homepage shortcut)
//!
//! Per request:
//!     endpoint.rs (Match: filter + privacy predicates)
//! ```
//!
//! # Design Decisions
//! - Reload replaces the whole snapshot atomically; readers see either the
//!   old or the new registry, never a mix
//! - Per-file parse errors skip the file, the rest of the load proceeds
//! - Endpoint slices are never mutated after publication

mod db;
mod endpoint;

pub use db::{MirrorDb, RegistryError, SiteFile};
pub use endpoint::{Endpoint, EndpointFilter, Site};
