//! Optimistic-concurrency version counter and guard.
//!
//! The version is the sole authority for lost-update detection: it starts at
//! 1, increments by exactly 1 on every successful mutation, and never changes
//! on a failed one. Guards compare a caller-supplied expectation against the
//! stored value inside the same atomic unit of work as the write.

use super::error::ParseVersionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic per-item mutation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Version assigned to a freshly created item.
    pub const INITIAL: Self = Self(1);

    /// Creates a validated version from a persisted value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseVersionError`] when the value is below 1, which no
    /// successful write sequence can produce.
    pub const fn new(value: i64) -> Result<Self, ParseVersionError> {
        if value < 1 {
            return Err(ParseVersionError(value));
        }
        Ok(Self(value))
    }

    /// Returns the version following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller intent for the optimistic-concurrency check of a mutation.
///
/// `Unchecked` is the unconditional-write escape hatch: the comparison is
/// skipped but the write still increments the version. It must be named
/// explicitly by the caller; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "expected", rename_all = "snake_case")]
pub enum VersionGuard {
    /// Fail with a conflict unless the stored version equals the expectation.
    Expect(Version),
    /// Skip the comparison and write unconditionally.
    Unchecked,
}

impl VersionGuard {
    /// Compares the guard against the currently stored version.
    ///
    /// # Errors
    ///
    /// Returns [`VersionMismatch`] when an expected version does not match
    /// the stored one. `Unchecked` guards always pass.
    pub const fn check(self, current: Version) -> Result<(), VersionMismatch> {
        match self {
            Self::Expect(expected) if expected.value() != current.value() => {
                Err(VersionMismatch { expected, current })
            }
            Self::Expect(_) | Self::Unchecked => Ok(()),
        }
    }
}

/// Outcome of a failed guard comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatch {
    /// The version the caller expected.
    pub expected: Version,
    /// The version currently stored.
    pub current: Version,
}
