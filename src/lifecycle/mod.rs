//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build server → Start GC ticker → Listen
//!
//! Signals (signals.rs):
//!     SIGHUP   → reload endpoint registry
//!     SIGUSR1  → re-read config document
//!     SIGUSR2  → reopen service log files
//!     SIGWINCH → purge resolve cache
//!     ctrl-c   → graceful shutdown (shutdown.rs)
//! ```
//!
//! # Design Decisions
//! - Every signal action is an idempotent method on the server
//! - Shutdown fans out over a broadcast channel; tasks subscribe once

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
