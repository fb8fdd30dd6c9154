//! Schema version comparison.

use std::fmt;

/// A `major.minor.patch` schema version.
///
/// Parsing is lenient: missing or non-numeric components count as zero, so
/// `"2"` equals `"2.0.0"` and a garbage string sorts as `0.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SchemaVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl SchemaVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a dotted version string. Components past the third are ignored.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut parts = input
            .trim()
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0));
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }

    /// Returns true if `self` is strictly older than `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_partial_versions() {
        assert_eq!(SchemaVersion::parse("1.2.3"), SchemaVersion::new(1, 2, 3));
        assert_eq!(SchemaVersion::parse("2"), SchemaVersion::new(2, 0, 0));
        assert_eq!(SchemaVersion::parse("2.1"), SchemaVersion::new(2, 1, 0));
        assert_eq!(SchemaVersion::parse("junk"), SchemaVersion::default());
    }

    #[test]
    fn compares_component_wise() {
        let v1 = SchemaVersion::parse("1.9.9");
        let v2 = SchemaVersion::parse("2.0.0");
        assert!(v1.is_before(&v2));
        assert!(!v2.is_before(&v1));
        assert!(!v2.is_before(&SchemaVersion::parse("2")));
        assert!(SchemaVersion::parse("1.10.0") > SchemaVersion::parse("1.9.0"));
    }

    #[test]
    fn displays_dotted() {
        assert_eq!(SchemaVersion::parse("3.1").to_string(), "3.1.0");
    }
}
