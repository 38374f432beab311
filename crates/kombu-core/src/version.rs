//! Semantic version triple for serialized artifacts.
//!
//! The native container format stamps every file with the library's format
//! version so readers can reject incompatible layouts with a real error
//! instead of a decode failure.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A three-part version identifier, formatted as `v{major}.{minor}.{patch}`.
///
/// Ordering is lexicographic on `(major, minor, patch)`. The numbers
/// roughly follow semantic versioning: major bumps break the format, minor
/// bumps add backward-compatible fields, patch bumps fix bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a version from its components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse one dot-separated component as a plain base-10 integer.
///
/// Stricter than `u64::from_str`: signs, whitespace, and empty strings are
/// all rejected so formatting round-trips exactly.
fn parse_component(source: &str, part: &str) -> Result<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "invalid version component `{part}` in `{source}`"
        )));
    }
    part.parse::<u64>()
        .map_err(|_| Error::Parse(format!("version component `{part}` out of range in `{source}`")))
}

impl FromStr for Version {
    type Err = Error;

    /// Accepts exactly `v{major}.{minor}.{patch}`.
    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix('v')
            .ok_or_else(|| Error::Parse(format!("version `{s}` does not begin with 'v'")))?;

        let mut parts = rest.split('.');
        let mut next = || {
            parts
                .next()
                .ok_or_else(|| Error::Parse(format!("version `{s}` has too few components")))
        };
        let major = parse_component(s, next()?)?;
        let minor = parse_component(s, next()?)?;
        let patch = parse_component(s, next()?)?;
        if parts.next().is_some() {
            return Err(Error::Parse(format!("version `{s}` has too many components")));
        }

        Ok(Version::new(major, minor, patch))
    }
}
