//! Error types for the cachesim library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a simulator configuration is rejected at
//!   construction time (unknown sketch type, zero capacity, bad learning rate).
//! - [`InvariantError`]: Returned by `check_invariants` methods when internal
//!   bookkeeping disagrees with the linked structures it describes.
//!
//! Configuration errors are fatal at construction; nothing on the per-access
//! path returns an error. Invariant errors are audited from
//! [`Policy::finished`](crate::traits::Policy::finished), which panics on
//! violation.
//!
//! ## Example Usage
//!
//! ```
//! use cachesim::config::{SimulatorConfig, SketchType};
//! use cachesim::error::ConfigError;
//!
//! let bad: Result<SketchType, ConfigError> = "bloom".parse();
//! assert!(bad.unwrap_err().to_string().contains("bloom"));
//!
//! let err = SimulatorConfig::builder(0).try_build().unwrap_err();
//! assert!(err.message().contains("maximum_size"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal policy invariants are violated.
///
/// Produced by `check_invariants` methods on rings, histories, sketches and
/// policies. Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

/// Returns `Err(InvariantError)` built from the formatted message when the
/// condition does not hold.
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::InvariantError::new(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_invariant;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when simulator configuration parameters are invalid.
///
/// Produced by `FromStr` implementations of the configuration enums, by
/// [`ConfigBuilder::try_build`](crate::config::ConfigBuilder::try_build) and by
/// the fallible `try_new` constructors of policies and sketches.
///
/// # Example
///
/// ```
/// use cachesim::config::ResetStrategy;
///
/// let err = "sometimes".parse::<ResetStrategy>().unwrap_err();
/// assert!(err.to_string().contains("reset strategy"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
