//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML document on disk
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a reload signal
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Startup violations are fatal; reload-time violations are logged and
//!   the previous configuration retained

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{InfluxConfig, ObservabilityConfig, ServiceConfig};
pub use validation::{validate_config, ValidationError};
