//! Post-discovery adjustments to node metadata.
//!
//! The ingress serves the v1 system tables regardless of what release the
//! backend reports, so a 4.x release string would steer drivers toward
//! `system.peers_v2` queries the ingress cannot answer. Drivers apply
//! [`effective_release_version`] to the version each discovered node
//! reports before choosing their query set.

use std::fmt;

/// Release version reported by a backend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReleaseVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl ReleaseVersion {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a reported version string.
    ///
    /// Missing components default to zero and trailing build components
    /// ("4.0.0.6816") are ignored; `None` means the string was not a
    /// version at all and the caller should keep the report as-is.
    #[must_use]
    pub fn parse(reported: &str) -> Option<Self> {
        let mut parts = reported.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = match parts.next() {
            Some(part) => part.trim().parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => part.trim().parse().ok()?,
            None => 0,
        };
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The newest release whose system tables the ingress actually serves.
const MAX_SERVED: ReleaseVersion = ReleaseVersion::new(3, 11, 0);

/// Pin reported versions to what the ingress can serve.
///
/// Reports of 4.0 and above come back as 3.11.0; anything older passes
/// through unchanged.
#[must_use]
pub const fn effective_release_version(reported: ReleaseVersion) -> ReleaseVersion {
    if reported.major >= 4 {
        MAX_SERVED
    } else {
        reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        assert_eq!(ReleaseVersion::parse("3.11.4"), Some(ReleaseVersion::new(3, 11, 4)));
    }

    #[test]
    fn test_parse_tolerates_build_component() {
        assert_eq!(
            ReleaseVersion::parse("4.0.0.6816"),
            Some(ReleaseVersion::new(4, 0, 0))
        );
    }

    #[test]
    fn test_parse_short_version() {
        assert_eq!(ReleaseVersion::parse("4.0"), Some(ReleaseVersion::new(4, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_non_versions() {
        assert_eq!(ReleaseVersion::parse("unknown"), None);
        assert_eq!(ReleaseVersion::parse(""), None);
    }

    #[test]
    fn test_modern_reports_are_pinned() {
        let reported = ReleaseVersion::new(4, 0, 0);
        assert_eq!(effective_release_version(reported), ReleaseVersion::new(3, 11, 0));
    }

    #[test]
    fn test_older_reports_pass_through() {
        let reported = ReleaseVersion::new(3, 11, 4);
        assert_eq!(effective_release_version(reported), reported);
    }

    #[test]
    fn test_display_round_trip() {
        let version = ReleaseVersion::new(3, 11, 0);
        assert_eq!(ReleaseVersion::parse(&version.to_string()), Some(version));
    }
}
