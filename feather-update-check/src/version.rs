use semver::{BuildMetadata, Version};
use std::cmp::Ordering;

/// Parse a release version.
///
/// Accepts strict semver, an optional leading `v`, and versions with missing
/// minor or patch components (`1.3-beta` is read as `1.3.0-beta`).
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);

    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let (core, suffix) = match raw.find(['-', '+']) {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };

    let mut parts = core.split('.').collect::<Vec<_>>();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    parts.resize(3, "0");

    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

/// Whether `candidate` is strictly newer than `current`.
///
/// Build metadata plays no part in the ordering, and anything that fails to
/// parse is never newer.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (parse_version(candidate), parse_version(current)) {
        (Some(candidate), Some(current)) => cmp_precedence(&candidate, &current).is_gt(),
        _ => false,
    }
}

/// Compare two versions by semver precedence.
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    let strip = |v: &Version| Version {
        build: BuildMetadata::EMPTY,
        ..v.clone()
    };

    strip(a).cmp(&strip(b))
}
