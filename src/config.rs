//! Resolution policy (`gitstamp.toml`).
//!
//! Defines [`Policy`], the read-only knobs of a resolution run: which tags
//! count, which versions may be released, and how each branch produces CI
//! versions. Missing file → all defaults (no error).
//!
//! ```toml
//! starting_version = "1.0.0"
//! single_major = 1
//! check_existing_versions = true
//!
//! [overridden_tags]
//! head = ["v1.2.0"]
//!
//! [[branches]]
//! name = "develop"
//! ci_mode = "release-anchored"
//! label = "dev"
//! ```
//!
//! Syntax and unknown fields are rejected here with line-level detail.
//! Semantic checks that need the repository (a starting version that does not
//! parse, an override key that names no commit) are reported by the resolver
//! as structured errors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use gitstamp_version::{PreReleaseKind, Version};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ResolveError};

/// File name looked up at the repository root when no path is given.
pub const DEFAULT_FILE_NAME: &str = "gitstamp.toml";

/// Longest label a CI version may embed.
pub const MAX_LABEL_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Top-level resolution policy.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Versions below this one are ignored; when nothing is below a commit,
    /// this is the only version that may be released first.
    #[serde(default)]
    pub starting_version: Option<String>,

    /// Only versions with this major number are considered.
    #[serde(default)]
    pub single_major: Option<u32>,

    /// Only patch releases (same major and minor) may follow a version.
    #[serde(default)]
    pub only_patch: bool,

    /// Require the existing version tags to form a hole-free sequence.
    #[serde(default)]
    pub check_existing_versions: bool,

    /// Produce a version even when the same content was already released.
    #[serde(default)]
    pub ignore_already_existing_version: bool,

    /// Resolve HEAD even when the working tree has uncommitted changes.
    #[serde(default)]
    pub ignore_dirty_working_folder: bool,

    /// Resolve the tip of this branch instead of HEAD. Also names the branch
    /// used for CI versions.
    #[serde(default)]
    pub starting_branch: Option<String>,

    /// Resolve this commit (sha or revision) instead of HEAD.
    #[serde(default)]
    pub starting_commit: Option<String>,

    /// Remote whose tracking branches stand in for local ones.
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Extra tags applied as if they existed: commit sha (or `head`) → names.
    #[serde(default)]
    pub overridden_tags: BTreeMap<String, Vec<String>>,

    /// Per-branch CI behaviour. Order matters: when several configured
    /// branches point at a commit, the first entry wins.
    #[serde(default)]
    pub branches: Vec<BranchPolicy>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            starting_version: None,
            single_major: None,
            only_patch: false,
            check_existing_versions: false,
            ignore_already_existing_version: false,
            ignore_dirty_working_folder: false,
            starting_branch: None,
            starting_commit: None,
            remote_name: default_remote_name(),
            overridden_tags: BTreeMap::new(),
            branches: Vec::new(),
        }
    }
}

fn default_remote_name() -> String {
    "origin".to_owned()
}

/// Key of [`Policy::overridden_tags`] that designates the resolved commit.
pub const HEAD_OVERRIDE_KEY: &str = "head";

impl Policy {
    /// The configuration for `name`, if any.
    #[must_use]
    pub fn branch(&self, name: &str) -> Option<&BranchPolicy> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Parse and check `starting_version` against `single_major`.
    ///
    /// # Errors
    /// `InvalidStartingVersion` or `StartingVersionConflictsWithSingleMajor`.
    pub fn starting_version(&self) -> Result<Option<Version>, ResolveError> {
        let Some(text) = self.starting_version.as_deref() else {
            return Ok(None);
        };
        let version = Version::parse(text).ok_or_else(|| {
            ResolveError::new(
                ErrorCode::InvalidStartingVersion,
                format!("starting version '{text}' is not a valid version."),
            )
        })?;
        if let Some(major) = self.single_major
            && major != version.major
        {
            return Err(ResolveError::new(
                ErrorCode::StartingVersionConflictsWithSingleMajor,
                format!("starting version '{version}' is not in single major {major}."),
            ));
        }
        Ok(Some(version))
    }
}

// ---------------------------------------------------------------------------
// BranchPolicy
// ---------------------------------------------------------------------------

/// How one branch produces CI versions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchPolicy {
    /// Branch name, without remote prefix.
    pub name: String,

    /// CI version mode (default: disabled).
    #[serde(default)]
    pub ci_mode: CiMode,

    /// Short name embedded in CI versions; defaults to the branch name.
    #[serde(default)]
    pub label: Option<String>,

    /// Pre-releases of this kind or above build in `Release` configuration;
    /// unset means only stable versions do.
    #[serde(default)]
    pub release_from: Option<PreReleaseKind>,
}

impl BranchPolicy {
    /// A branch entry with the given mode and no label.
    pub fn new(name: impl Into<String>, ci_mode: CiMode) -> Self {
        Self {
            name: name.into(),
            ci_mode,
            label: None,
            release_from: None,
        }
    }

    /// The label CI versions embed.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// CI version synthesis mode of a branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiMode {
    /// No CI version: only tagged commits get a version.
    #[default]
    Disabled,
    /// `0.0.0--<time>-<label>`, independent of releases.
    TimeAnchored,
    /// `<next>--<depth>-<label>`, counted from the last release below.
    ReleaseAnchored,
}

impl fmt::Display for CiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::TimeAnchored => write!(f, "time-anchored"),
            Self::ReleaseAnchored => write!(f, "release-anchored"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A policy file that could not be read or parsed.
#[derive(Debug, thiserror::Error)]
#[error("{location}: {message}", location = location(.path.as_deref()))]
pub struct ConfigError {
    /// File the policy came from; `None` for in-memory text.
    pub path: Option<PathBuf>,
    /// What went wrong, prefixed with `line N:` for syntax and schema errors.
    pub message: String,
}

fn location(path: Option<&Path>) -> String {
    path.map_or_else(|| "policy".to_owned(), |p| p.display().to_string())
}

/// 1-based line of byte `offset` in `text`.
fn line_at(text: &str, offset: usize) -> usize {
    text.get(..offset)
        .map_or(0, |head| head.bytes().filter(|&b| b == b'\n').count())
        + 1
}

impl Policy {
    /// Read the policy at `path`. A missing file is the default policy.
    ///
    /// # Errors
    /// The file exists but cannot be read, or does not match the schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no policy file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("cannot read policy: {e}"),
                });
            }
        };
        Self::parse(&text).map_err(|e| ConfigError {
            path: Some(path.to_owned()),
            ..e
        })
    }

    /// Parse policy TOML. Only the schema is checked; version strings and
    /// override keys are validated when resolving.
    ///
    /// # Errors
    /// Malformed TOML, unknown keys or values of the wrong type.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| {
            let message = match e.span() {
                Some(span) => format!("line {}: {}", line_at(text, span.start), e.message()),
                None => e.message().to_owned(),
            };
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
