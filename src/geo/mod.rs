//! Geolocation subsystem.
//!
//! # Data Flow
//! ```text
//! Client IP
//!     → source.rs (GeoSource lookup: region name + ISP line)
//!     → tables.rs (name → region code, ISP name → ISP code)
//!     → RequestMeta.region / RequestMeta.isp
//!
//! Scoring:
//!     (meta.region, endpoint range_region)
//!     → distance() (Haversine over the region coordinate table)
//!     → Score.geo
//! ```
//!
//! # Design Decisions
//! - The IP database is an external collaborator behind the `GeoSource`
//!   trait; the core only consumes `(region name, ISP line)`
//! - Region and ISP code tables are fixed at compile time
//! - Unknown codes yield an infinite distance, never an error

mod source;
mod tables;

pub use source::{CidrGeo, FixedGeo, GeoError, GeoSource, IpInfo};
pub use tables::{
    distance, haversine, isp_name_to_code, region_info, region_name_to_code, RegionInfo,
    DISTANCE_EPSILON, EARTH_RADIUS,
};
