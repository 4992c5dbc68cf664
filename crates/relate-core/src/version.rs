//! Version specifier handling
//!
//! A version argument is one of three things, decided purely from its syntax:
//!
//! ```text
//! "4.0.4", "4.0", ">=4.1"        → SemverRange
//! "https://host/neo4j.tar.gz"    → Url
//! "./neo4j-4.0.4.tar.gz", "/x"   → FilesystemPath
//! ```
//!
//! Semver is tried first, so a string such as `4.0` is always a version even if
//! a directory with that name happens to exist in the working directory.

use reqwest::Url;
use semver::{Comparator, Op, Version, VersionReq};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{SUPPORTED_MIN_VERSION, SUPPORTED_VERSION_RANGE, WILDCARD_VERSION};
use crate::error::{RelateError, Result};

pub const VERSION_REQUIRED_MSG: &str = "Version must be specified";
pub const INVALID_VERSION_MSG: &str = "Provided version argument is not valid semver, url or path.";

#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    SemverRange(VersionReq),
    Url(Url),
    FilesystemPath(PathBuf),
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::SemverRange(req) => write!(f, "{}", req),
            VersionSpec::Url(url) => write!(f, "{}", url),
            VersionSpec::FilesystemPath(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Classify a version argument.
///
/// Only an empty (or whitespace-only) argument is rejected here; whether a path
/// exists is checked later by the caller.
pub fn classify(spec: &str) -> Result<VersionSpec> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(RelateError::InvalidArgument(VERSION_REQUIRED_MSG.to_string()));
    }

    if let Some(req) = parse_requirement(spec) {
        return Ok(VersionSpec::SemverRange(req));
    }

    if let Some(url) = parse_url(spec) {
        return Ok(VersionSpec::Url(url));
    }

    Ok(VersionSpec::FilesystemPath(PathBuf::from(spec)))
}

/// Parse a semver requirement.
///
/// A bare version (`4.0.4`, `4.0`, `4`) pins to that version or series rather
/// than taking cargo's caret default, so `4.0.4` never resolves to `4.1.0`.
pub fn parse_requirement(spec: &str) -> Option<VersionReq> {
    let spec = spec.trim();
    if spec.is_empty() || spec.contains(['/', '\\']) {
        return None;
    }

    let starts_bare = spec.chars().next().is_some_and(|c| c.is_ascii_digit());
    let is_single = !spec.contains([',', ' ', '*', 'x', 'X']);
    let candidate = if starts_bare && is_single {
        format!("={}", spec)
    } else {
        spec.to_string()
    };

    VersionReq::parse(&candidate).ok()
}

fn parse_url(spec: &str) -> Option<Url> {
    let url = Url::parse(spec).ok()?;
    match url.scheme() {
        "http" | "https" | "ftp" if url.host().is_some() => Some(url),
        "file" => Some(url),
        _ => None,
    }
}

/// Lowest version a requirement can match, if it has a lower bound at all.
pub fn lower_bound(req: &VersionReq) -> Option<Version> {
    req.comparators.iter().filter_map(comparator_floor).max()
}

fn comparator_floor(cmp: &Comparator) -> Option<Version> {
    let floor = Version::new(cmp.major, cmp.minor.unwrap_or(0), cmp.patch.unwrap_or(0));
    match cmp.op {
        Op::Exact | Op::GreaterEq | Op::Tilde | Op::Caret | Op::Wildcard => Some(floor),
        Op::Greater => Some(match (cmp.minor, cmp.patch) {
            (None, _) => Version::new(cmp.major + 1, 0, 0),
            (Some(minor), None) => Version::new(cmp.major, minor + 1, 0),
            (Some(minor), Some(patch)) => Version::new(cmp.major, minor, patch + 1),
        }),
        _ => None,
    }
}

/// Reject requirements that can reach below the supported range.
pub fn ensure_supported(req: &VersionReq) -> Result<()> {
    match lower_bound(req) {
        Some(floor) if floor >= SUPPORTED_MIN_VERSION => Ok(()),
        _ => Err(RelateError::NotSupported(format!(
            "version not in range {}",
            SUPPORTED_VERSION_RANGE
        ))),
    }
}

/// Whether a discovered version string may enter a candidate set.
pub fn is_resolvable(version: &str) -> bool {
    version == WILDCARD_VERSION || Version::parse(version).is_ok()
}

/// Pick the greatest version in `candidates` that satisfies `req`.
///
/// Wildcard and unparsable entries are skipped.
pub fn best_match<'a, T, F>(req: &VersionReq, candidates: &'a [T], version_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    candidates
        .iter()
        .filter_map(|c| Version::parse(version_of(c)).ok().map(|v| (v, c)))
        .filter(|(v, _)| req.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, c)| c)
}

/// Loose version extraction: the first `major[.minor[.patch]]` run in `input`,
/// missing parts filled with zero.
pub fn coerce(input: &str) -> Option<Version> {
    let bytes = input.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;

    let mut parts: Vec<u64> = Vec::with_capacity(3);
    let mut current = String::new();
    for &b in &bytes[start..] {
        if b.is_ascii_digit() {
            current.push(b as char);
        } else if b == b'.' && !current.is_empty() && parts.len() < 2 {
            parts.push(current.parse().ok()?);
            current.clear();
        } else {
            break;
        }
    }
    if !current.is_empty() {
        parts.push(current.parse().ok()?);
    }

    let major = *parts.first()?;
    Some(Version::new(
        major,
        parts.get(1).copied().unwrap_or(0),
        parts.get(2).copied().unwrap_or(0),
    ))
}
