use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::kind::PreReleaseKind;

// ---------------------------------------------------------------------------
// PreRelease
// ---------------------------------------------------------------------------

/// A pre-release part: a kind and a number (`beta.3`). Number `0` is written
/// without suffix (`beta`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u32,
}

impl PreRelease {
    #[must_use]
    pub const fn new(kind: PreReleaseKind) -> Self {
        Self { kind, number: 0 }
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.number == 0 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.number)
        }
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// A release version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<PreRelease>,
}

/// Error from parsing a string that must be a [`Version`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid version `{value}`: expected [v]MAJOR.MINOR.PATCH[-KIND[.N]]")]
pub struct VersionParseError {
    pub value: String,
}

impl Version {
    /// A stable release `major.minor.patch`.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// This version's core with the given pre-release.
    #[must_use]
    pub const fn with_pre(self, kind: PreReleaseKind, number: u32) -> Self {
        Self {
            pre: Some(PreRelease { kind, number }),
            ..self
        }
    }

    /// The release this version leads to (drops the pre-release).
    #[must_use]
    pub const fn core(self) -> Self {
        Self { pre: None, ..self }
    }

    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Parse a tag name. Returns `None` for anything that is not a version;
    /// tag names that do not parse are simply not version tags.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let body = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);
        let (core, pre) = match body.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (body, None),
        };

        let mut parts = core.split('.');
        let major = parse_number(parts.next()?)?;
        let minor = parse_number(parts.next()?)?;
        let patch = parse_number(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        let pre = match pre {
            None => None,
            Some(pre) => {
                let (name, number) = match pre.split_once('.') {
                    Some((name, n)) => {
                        let n = parse_number(n)?;
                        // `beta.0` is spelled `beta`.
                        if n == 0 {
                            return None;
                        }
                        (name, n)
                    }
                    None => (pre, 0),
                };
                let kind = name.parse::<PreReleaseKind>().ok()?;
                Some(PreRelease { kind, number })
            }
        };

        Some(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// The family of a core: every first pre-release of it, then the release.
    fn family(major: u32, minor: u32, patch: u32) -> impl Iterator<Item = Self> {
        let core = Self::new(major, minor, patch);
        PreReleaseKind::ALL
            .into_iter()
            .map(move |kind| core.with_pre(kind, 0))
            .chain(std::iter::once(core))
    }

    /// The versions that may be released first in a repository without any
    /// version: the families of `0.0.0`, `0.1.0` and `1.0.0`.
    #[must_use]
    pub fn first_possible_versions() -> Vec<Self> {
        Self::family(0, 0, 0)
            .chain(Self::family(0, 1, 0))
            .chain(Self::family(1, 0, 0))
            .collect()
    }

    /// The versions that may directly follow `from` (ascending, no
    /// duplicates). `None` yields [`Version::first_possible_versions`].
    #[must_use]
    pub fn direct_successors(from: Option<&Self>) -> Vec<Self> {
        let Some(v) = from else {
            return Self::first_possible_versions();
        };
        let (major, minor, patch) = (v.major, v.minor, v.patch);
        let minor_bump = || Self::family(major, minor.saturating_add(1), 0);
        let major_bump = || Self::family(major.saturating_add(1), 0, 0);

        let mut out: Vec<Self> = match v.pre {
            None => Self::family(major, minor, patch.saturating_add(1))
                .chain(minor_bump())
                .chain(major_bump())
                .collect(),
            Some(pre) => {
                let core = v.core();
                let mut out = vec![core.with_pre(pre.kind, pre.number.saturating_add(1))];
                out.extend(pre.kind.above().map(|kind| core.with_pre(kind, 0)));
                out.push(core);
                // Bumps that were already open after the release preceding
                // this pre-release's core.
                if patch > 0 || (minor == 0 && major == 0) {
                    out.extend(minor_bump());
                    out.extend(major_bump());
                } else if minor > 0 {
                    out.extend(major_bump());
                }
                out
            }
        };
        out.sort();
        out.dedup();
        out
    }

    /// `true` if `self` may be released directly after `prev`.
    #[must_use]
    pub fn is_direct_successor_of(&self, prev: Option<&Self>) -> bool {
        Self::direct_successors(prev).contains(self)
    }

    /// Format a release-anchored CI build version: `depth` commits past this
    /// version on the branch labelled `label`.
    ///
    /// The result sorts after `self` and before every real successor.
    #[must_use]
    pub fn ci_build(&self, label: &str, depth: u32) -> String {
        match self.pre {
            None => format!(
                "{}.{}.{}--{depth:04}-{label}",
                self.major,
                self.minor,
                self.patch.saturating_add(1)
            ),
            Some(pre) => format!(
                "{}.{}.{}-{}.{}.1--{depth:04}-{label}",
                self.major, self.minor, self.patch, pre.kind, pre.number
            ),
        }
    }
}

fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| VersionParseError {
            value: s.to_owned(),
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
