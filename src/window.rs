//! Legal version windows: the versions that may be released next.
//!
//! The window above a floor version is its direct successors, bounded:
//!
//! - below by the starting version (exclusive);
//! - above by the smallest already-cataloged version past the floor
//!   (exclusive), so a release can neither skip nor collide with a
//!   published version;
//! - by the `single_major` and `only_patch` filters.
//!
//! Without a floor the window is the starting version, or the first
//! possible versions when there is none.

use gitstamp_version::Version;

use crate::catalog::Catalog;
use crate::config::Policy;

/// The policy knobs that shape a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowRules {
    pub starting_version: Option<Version>,
    pub single_major: Option<u32>,
    pub only_patch: bool,
}

impl WindowRules {
    #[must_use]
    pub fn new(policy: &Policy, starting_version: Option<Version>) -> Self {
        Self {
            starting_version,
            single_major: policy.single_major,
            only_patch: policy.only_patch,
        }
    }

    /// The same rules without the `single_major` and `only_patch` filters.
    #[must_use]
    pub const fn unfiltered(self) -> Self {
        Self {
            single_major: None,
            only_patch: false,
            ..self
        }
    }

    /// `version` passes the `single_major` filter.
    #[must_use]
    pub fn allows_major(&self, version: &Version) -> bool {
        self.single_major.is_none_or(|m| version.major == m)
    }

    /// `version` passes the `only_patch` filter above `floor`.
    #[must_use]
    pub fn allows_patch(&self, floor: Option<&Version>, version: &Version) -> bool {
        match floor {
            Some(f) if self.only_patch => f.major == version.major && f.minor == version.minor,
            _ => true,
        }
    }
}

/// Versions legally releasable directly above `floor`, ignoring cataloged
/// tags of version `excluded`. Ascending, without duplicates.
#[must_use]
pub fn possible_versions(
    catalog: &Catalog,
    rules: &WindowRules,
    floor: Option<&Version>,
    excluded: Option<&Version>,
) -> Vec<Version> {
    let start = rules.starting_version.as_ref();
    let candidates = match (floor, start) {
        (None, Some(start)) => vec![*start],
        _ => Version::direct_successors(floor)
            .into_iter()
            .filter(|v| start.is_none_or(|s| v > s))
            .collect(),
    };
    let bound = catalog.next_above(floor, excluded);

    let mut out: Vec<Version> = candidates
        .into_iter()
        .filter(|v| bound.is_none_or(|b| v < b))
        .filter(|v| rules.allows_major(v))
        .filter(|v| rules.allows_patch(floor, v))
        .collect();
    out.dedup();
    out
}
