//! Structured resolution outcomes.
//!
//! Every expected failure of a resolution run is a [`ResolveError`]: an
//! [`ErrorCode`] a release pipeline can match on, plus a message written for
//! the person reading the build log. Each code carries a "To fix:" hint so
//! the message alone says what to do next.
//!
//! Repository I/O failures are not expected outcomes and travel separately
//! as [`gitstamp_git::GitError`]. Engine steps that can hit both return
//! [`Error`].

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// The enumerated failure kinds of a resolution run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    // Repository state
    UninitializedRepository,
    CommitNotFound,
    BranchNotFound,

    // Working tree
    DirtyWorkingFolder,

    // Configuration
    InvalidStartingVersion,
    StartingVersionConflictsWithSingleMajor,
    InvalidOverride,

    // Catalog
    MultipleVersionTagConflict,
    CheckExistingVersionFirstMissing,
    CheckExistingVersionStartingVersionNotFound,
    CheckExistingVersionHoleFound,

    // Release tag validation
    ReleaseTagIsNotPossible,
    ReleaseTagConflictsWithSingleMajor,
    ReleaseTagConflictsWithOnlyPatch,

    // CI pseudo-version
    CiBranchNameTooLong,
    CiNoBranchConfiguration,
    CiDisabledOnBranch,
    CiDetachedHead,

    // Content already released
    AlreadyExistingVersion,
}

impl ErrorCode {
    /// What the user can do about it.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::UninitializedRepository => "create a first commit.",
            Self::CommitNotFound => "check `starting_commit` (or --commit) against `git log`.",
            Self::BranchNotFound => {
                "check `starting_branch` (or --branch); fetch the branch if it only exists remotely."
            }
            Self::DirtyWorkingFolder => {
                "commit or stash local changes, or set `ignore_dirty_working_folder = true`."
            }
            Self::InvalidStartingVersion => {
                "set `starting_version` to a valid version such as \"1.0.0\"."
            }
            Self::StartingVersionConflictsWithSingleMajor => {
                "make `starting_version` and `single_major` agree on the major version."
            }
            Self::InvalidOverride => {
                "use `head` or the sha of an existing commit as key of [overridden_tags]."
            }
            Self::MultipleVersionTagConflict => {
                "delete the wrong tag(s) so that each commit carries a single version."
            }
            Self::CheckExistingVersionFirstMissing => {
                "tag the first release with a first possible version, or set `starting_version`."
            }
            Self::CheckExistingVersionStartingVersionNotFound => {
                "tag a commit with `starting_version`, or change `starting_version`."
            }
            Self::CheckExistingVersionHoleFound => {
                "tag the missing version(s), or set `check_existing_versions = false`."
            }
            Self::ReleaseTagIsNotPossible => {
                "delete the tag and use one of the possible versions listed above."
            }
            Self::ReleaseTagConflictsWithSingleMajor => {
                "delete the tag, or change `single_major`."
            }
            Self::ReleaseTagConflictsWithOnlyPatch => "delete the tag, or unset `only_patch`.",
            Self::CiBranchNameTooLong => {
                "set a `label` of at most 8 characters for this branch in [[branches]]."
            }
            Self::CiNoBranchConfiguration => {
                "add a [[branches]] entry for this branch, or tag the commit with a release."
            }
            Self::CiDisabledOnBranch => {
                "set `ci_mode` for this branch, or tag the commit with a release."
            }
            Self::CiDetachedHead => {
                "check out a branch, or set `starting_branch` (or --branch)."
            }
            Self::AlreadyExistingVersion => {
                "reuse the existing artifacts, or set `ignore_already_existing_version = true`."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

/// A structured resolution failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}\n  To fix: {hint}", hint = .code.hint())]
pub struct ResolveError {
    pub code: ErrorCode,
    pub message: String,
}

impl ResolveError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure of an engine step: either the repository could not be read, or
/// the run ended in a structured outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Git(#[from] gitstamp_git::GitError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl Error {
    pub(crate) fn resolve(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Resolve(ResolveError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_message_and_hint() {
        let err = ResolveError::new(ErrorCode::DirtyWorkingFolder, "2 files changed");
        let text = err.to_string();
        assert!(text.starts_with("DirtyWorkingFolder: 2 files changed"), "{text}");
        assert!(text.contains("To fix: commit or stash"), "{text}");
    }

    #[test]
    fn serializes_code_by_name() {
        let err = ResolveError::new(ErrorCode::CiDetachedHead, "no branch");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CiDetachedHead");
        assert_eq!(json["message"], "no branch");
    }
}
