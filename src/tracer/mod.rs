//! Per-request debug scratchpad.
//!
//! # Responsibilities
//! - Accumulate formatted resolver trace output when `?trace` is set
//! - Discard everything otherwise, at zero cost on the hot path
//!
//! # Design Decisions
//! - An enum rather than a trait object: the disabled variant compiles to a
//!   single discriminant check
//! - Created once per request and threaded through the resolver by
//!   mutable reference

use std::fmt::{self, Write};

/// A per-request trace buffer, either recording or discarding.
///
/// A tracer cannot be toggled after it is created.
#[derive(Debug)]
pub enum Tracer {
    Buffered(String),
    Disabled,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            Tracer::Buffered(String::new())
        } else {
            Tracer::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Tracer::Buffered(_))
    }

    /// Append formatted output. A format string without arguments is
    /// written verbatim.
    pub fn log(&mut self, args: fmt::Arguments<'_>) {
        if let Tracer::Buffered(buf) = self {
            // Writing to a String cannot fail.
            let _ = buf.write_fmt(args);
        }
    }

    /// The accumulated output; empty for a disabled tracer.
    pub fn as_str(&self) -> &str {
        match self {
            Tracer::Buffered(buf) => buf,
            Tracer::Disabled => "",
        }
    }

    /// Consume the tracer, returning the accumulated output.
    pub fn into_string(self) -> String {
        match self {
            Tracer::Buffered(buf) => buf,
            Tracer::Disabled => String::new(),
        }
    }
}

/// Append a formatted line to a [`Tracer`].
#[macro_export]
macro_rules! tracef {
    ($tracer:expr, $($arg:tt)*) => {
        $tracer.log(::std::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_accumulates() {
        let mut t = Tracer::new(true);
        assert!(t.is_enabled());

        tracef!(t, "ta{}ky", "o");
        assert_eq!(t.as_str(), "taoky");
        tracef!(t, " str{}ng", "o");
        assert_eq!(t.as_str(), "taoky strong");
        // Repeated reads do not change the result.
        assert_eq!(t.as_str(), "taoky strong");
    }

    #[test]
    fn test_verbatim_without_args() {
        let mut t = Tracer::new(true);
        tracef!(t, "100% {{literal}}");
        assert_eq!(t.as_str(), "100% {literal}");
    }

    #[test]
    fn test_disabled_discards() {
        let mut t = Tracer::new(false);
        assert!(!t.is_enabled());

        tracef!(t, "ta{}ky", "o");
        assert_eq!(t.as_str(), "");
        assert_eq!(t.into_string(), "");
    }
}
