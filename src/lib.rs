//! mirror302: HTTP redirect service for software mirrors.
//!
//! Given `GET /<cname>/<tail>`, pick the best physical mirror endpoint for
//! the caller and answer `302 Found`. Selection weighs subdomain label
//! hints, CIDR locality, geo/ISP proximity and a live freshness signal;
//! decisions are cached per request fingerprint with dual-horizon
//! staleness.

pub mod cache;
pub mod config;
pub mod geo;
pub mod influx;
pub mod lifecycle;
pub mod logging;
pub mod meta;
pub mod observability;
pub mod registry;
pub mod scoring;
pub mod server;
pub mod tracer;

pub use config::ServiceConfig;
pub use lifecycle::Shutdown;
pub use server::Server;
