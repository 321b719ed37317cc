//! Value types shared between the [`Repository`](crate::Repository) trait and
//! its callers. No gix types appear here; the backend is an implementation
//! detail.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A git object identifier (SHA-1, 20 bytes).
///
/// Used both for commit ids and for tree ids (content identity). Displays as
/// 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    /// The zero OID (`0000...0000`).
    pub const ZERO: Self = Self([0; 20]);

    /// Create a `GitOid` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Return `true` if this is the zero OID.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The first 7 hex characters, as printed by `git log --oneline`.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(7);
        s
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({})", self.short())
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks(2)) {
            let digit = |b: u8| {
                char::from(b).to_digit(16).ok_or_else(|| OidParseError {
                    value: s.to_owned(),
                    reason: format!("invalid hex digit '{}'", char::from(b)),
                })
            };
            let hi = digit(pair[0])?;
            let lo = digit(pair[1])?;
            *slot = u8::try_from((hi << 4) | lo).unwrap_or_default();
        }
        Ok(Self(bytes))
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// CommitInfo
// ---------------------------------------------------------------------------

/// The parts of a commit object the version engine reads.
///
/// Returned by [`Repository::lookup`](crate::Repository::lookup).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit id.
    pub id: GitOid,
    /// OID of the tree this commit produced. Two commits with the same tree
    /// produced byte-identical content.
    pub tree_oid: GitOid,
    /// OIDs of parent commits (empty for root commits).
    pub parents: Vec<GitOid>,
    /// Author timestamp, in seconds since the Unix epoch (UTC).
    pub time: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
