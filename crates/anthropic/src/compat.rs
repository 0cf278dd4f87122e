//! Vendor SDK version-compatibility check.
//!
//! Advisory only: an out-of-range version logs a warning and is reported to
//! `doctor`, but never blocks constructing a tracked client.

use serde::Serialize;
use tracing::warn;

/// Lowest vendor SDK version the tracking layer is known to work with.
pub const MIN_SUPPORTED_SDK: &str = "0.21.0";
/// Highest vendor SDK version the tracking layer has been tested against.
pub const MAX_TESTED_SDK: &str = "0.40.0";

/// Compatibility verdict for an installed vendor SDK version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    /// Within the tested range.
    Supported,
    /// Below the minimum, or unparseable.
    Unsupported,
    /// Newer than anything tested; expected to work, with a warning.
    UntestedNewer,
}

impl std::fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supported => write!(f, "supported"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::UntestedNewer => write!(f, "untested_newer"),
        }
    }
}

/// Compatibility report for diagnostics output.
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityInfo {
    pub version: String,
    pub level: SupportLevel,
    pub min_supported: &'static str,
    pub max_tested: &'static str,
}

fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    // "0.25.1" — extra segments and pre-release suffixes are ignored.
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts
        .next()
        .map(|p| {
            p.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    Some((major, minor, patch))
}

/// Check an installed vendor SDK version against the tested range.
pub fn check_sdk_version(version: &str) -> SupportLevel {
    let Some(parsed) = parse_version(version) else {
        warn!(version, "Could not parse vendor SDK version; treating as unsupported");
        return SupportLevel::Unsupported;
    };

    // These constants are well-formed by construction.
    let min = parse_version(MIN_SUPPORTED_SDK).unwrap_or((0, 0, 0));
    let max = parse_version(MAX_TESTED_SDK).unwrap_or((u64::MAX, 0, 0));

    if parsed < min {
        warn!(
            version,
            min = MIN_SUPPORTED_SDK,
            "Vendor SDK version is below minimum supported; tracking may misbehave"
        );
        SupportLevel::Unsupported
    } else if parsed > max {
        warn!(
            version,
            max = MAX_TESTED_SDK,
            "Vendor SDK version is newer than tested; tracking should work but is unverified"
        );
        SupportLevel::UntestedNewer
    } else {
        SupportLevel::Supported
    }
}

/// Full compatibility report for a version, for `doctor`-style output.
pub fn compatibility_info(version: &str) -> CompatibilityInfo {
    CompatibilityInfo {
        version: version.to_string(),
        level: check_sdk_version(version),
        min_supported: MIN_SUPPORTED_SDK,
        max_tested: MAX_TESTED_SDK,
    }
}
