//! Resolution of one commit's version.
//!
//! [`resolve`] runs the whole pipeline for the target commit:
//!
//! 1. select the target (`starting_commit`, `starting_branch` or HEAD) and
//!    refuse a dirty working tree when the target is HEAD;
//! 2. build the [`Catalog`] and fail on tag conflicts (and, if requested,
//!    on holes in the existing versions);
//! 3. walk the lineage and compute the window for descendants;
//! 4. validate the commit's own release tag against the window below it,
//!    or synthesize a CI version for the commit's branch;
//! 5. refuse to version content that was already released elsewhere,
//!    unless the policy allows it or only the build configuration differs;
//! 6. classify the build and compose the informational version.
//!
//! Expected failures end up in [`ResolutionResult::error`]; only repository
//! I/O errors are returned as `Err`. Resolving the same snapshot twice gives
//! equal results.

use chrono::{DateTime, Utc};
use gitstamp_git::{GitError, GitOid, Repository};
use gitstamp_version::{PreReleaseKind, Version, ZERO_VERSION};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, TagCommit};
use crate::ci::{self, CiVersion};
use crate::classify::{BuildConfiguration, Classifier, Classify};
use crate::config::Policy;
use crate::error::{Error, ErrorCode, ResolveError};
use crate::lineage::{Lineage, LineageInfo};
use crate::window::{WindowRules, possible_versions};

// ---------------------------------------------------------------------------
// ResolutionResult
// ---------------------------------------------------------------------------

/// A version tag, as reported to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagRef {
    pub name: String,
    pub version: Version,
    pub commit: String,
}

impl From<&TagCommit> for TagRef {
    fn from(tag: &TagCommit) -> Self {
        Self {
            name: tag.name.clone(),
            version: tag.version,
            commit: tag.commit.to_string(),
        }
    }
}

/// Everything a resolution run found out about its target commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// The resolved commit, once selected.
    pub commit: Option<String>,
    /// The configured branch the commit was attributed to, if any.
    pub branch: Option<String>,
    /// The version to build with; [`ZERO_VERSION`] on error.
    pub final_version: String,
    /// `{final}/{sha}/{YYYY-MM-DD HH:MM:SSZ}`.
    pub informational_version: String,
    pub build_configuration: BuildConfiguration,
    /// The commit's own version tag.
    pub release_tag: Option<TagRef>,
    pub ci_version: Option<CiVersion>,
    /// Versions that may be released on this commit.
    pub possible_versions: Vec<Version>,
    /// Versions that may be released on this commit's descendants.
    pub next_possible_versions: Vec<Version>,
    /// A tag another commit with the same content carries.
    pub already_existing_version: Option<TagRef>,
    /// The nearest version strictly below on the graph.
    pub best_commit_below: Option<TagRef>,
    /// History was truncated during the walk, or the repository is a
    /// shallow clone.
    pub shallow: bool,
    pub error: Option<ResolveError>,
}

impl Default for ResolutionResult {
    fn default() -> Self {
        Self {
            commit: None,
            branch: None,
            final_version: ZERO_VERSION.to_owned(),
            informational_version: ZERO_VERSION.to_owned(),
            build_configuration: BuildConfiguration::Debug,
            release_tag: None,
            ci_version: None,
            possible_versions: Vec::new(),
            next_possible_versions: Vec::new(),
            already_existing_version: None,
            best_commit_below: None,
            shallow: false,
            error: None,
        }
    }
}

impl ResolutionResult {
    /// `true` if a usable version was produced.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The error code, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Resolve the version of the policy's target commit.
///
/// `classify` decides the build configuration of tags and CI builds; pass
/// [`default_classifier`](crate::classify::default_classifier) unless the
/// pipeline has its own rules.
///
/// # Errors
/// Only when the repository cannot be read. Every expected failure is
/// reported in [`ResolutionResult::error`].
#[instrument(skip_all)]
pub fn resolve(
    repo: &dyn Repository,
    policy: &Policy,
    classify: Classifier<'_>,
) -> Result<ResolutionResult, GitError> {
    let mut run = Run {
        repo,
        policy,
        classify,
        result: ResolutionResult::default(),
        time: None,
    };
    match run.execute() {
        Ok(()) => {
            info!(version = %run.result.final_version, "resolved");
        }
        Err(Error::Resolve(err)) => {
            warn!(code = %err.code, "resolution failed");
            run.fail(err);
        }
        Err(Error::Git(err)) => return Err(err),
    }
    run.finish();
    Ok(run.result)
}

struct Run<'a> {
    repo: &'a dyn Repository,
    policy: &'a Policy,
    classify: Classifier<'a>,
    result: ResolutionResult,
    time: Option<DateTime<Utc>>,
}

/// How the final version was produced.
enum Outcome {
    Release(Version),
    Ci(CiVersion),
}

impl Run<'_> {
    fn execute(&mut self) -> Result<(), Error> {
        let starting = self.policy.starting_version()?;
        let (id, is_head) = self.target()?;
        let Some(commit) = self.repo.lookup(id)? else {
            return Err(Error::resolve(
                ErrorCode::CommitNotFound,
                format!("{id} is not a commit of this repository."),
            ));
        };
        self.result.commit = Some(id.to_string());
        self.time = Some(DateTime::from_timestamp(commit.time, 0).unwrap_or_default());

        if is_head && !self.policy.ignore_dirty_working_folder && self.repo.is_dirty()? {
            return Err(Error::resolve(
                ErrorCode::DirtyWorkingFolder,
                "the working tree has uncommitted changes.",
            ));
        }

        let catalog = Catalog::build(self.repo, self.policy, starting.as_ref(), id)?;
        if let Some(err) = catalog.conflict_error() {
            return Err(err.into());
        }
        if self.policy.check_existing_versions {
            catalog.check_existing(starting.as_ref())?;
        }

        let rules = WindowRules::new(self.policy, starting);
        let mut lineage = Lineage::new(self.repo, &catalog);
        let here = lineage.get(id, None)?;
        self.result.shallow = here.shallow || self.repo.is_shallow()?;
        if self.result.shallow {
            warn!(commit = %id.short(), "history is shallow; versions below the boundary are not visible");
        }
        self.result.next_possible_versions =
            possible_versions(&catalog, &rules, here.best_version(&catalog), None);
        self.result.best_commit_below = here
            .best_below()
            .map(|anchor| TagRef::from(catalog.tag(anchor.tag)));
        let existing = catalog.already_existing(commit.tree_oid, id);
        self.result.already_existing_version = existing.map(TagRef::from);

        let (outcome, threshold) = if let Some(tag) = catalog.tag_on(id) {
            self.validate_release(tag, &catalog, &rules, &mut lineage)?;
            let threshold = self.branch_threshold(id, is_head)?;
            (Outcome::Release(tag.version), threshold)
        } else if let Some(version) = catalog.out_of_major_on(id) {
            let floor = here.best_version(&catalog);
            self.result
                .possible_versions
                .clone_from(&self.result.next_possible_versions);
            return Err(reject_release(
                &version.to_string(),
                version,
                floor,
                &self.result.possible_versions,
                &catalog,
                &rules,
            ));
        } else {
            self.result
                .possible_versions
                .clone_from(&self.result.next_possible_versions);
            let ci = self.ci_version(id, is_head, &catalog, &here)?;
            let threshold = self
                .result
                .branch
                .as_deref()
                .and_then(|name| self.policy.branch(name))
                .and_then(|b| b.release_from);
            (Outcome::Ci(ci), threshold)
        };

        let (final_version, configuration) = match &outcome {
            Outcome::Release(version) => (
                version.to_string(),
                (self.classify)(&Classify::Tag { version, threshold }),
            ),
            Outcome::Ci(ci) => (ci.version.clone(), (self.classify)(&Classify::Ci(ci))),
        };
        self.result.final_version = final_version;
        self.result.build_configuration = configuration;
        if let Outcome::Ci(ci) = outcome {
            self.result.ci_version = Some(ci);
        }

        if let Some(existing) = existing
            && !self.policy.ignore_already_existing_version
        {
            self.guard_already_existing(existing, threshold)?;
        }
        Ok(())
    }

    fn target(&self) -> Result<(GitOid, bool), Error> {
        if let Some(spec) = &self.policy.starting_commit {
            let id = self.repo.resolve(spec)?.ok_or_else(|| {
                Error::resolve(
                    ErrorCode::CommitNotFound,
                    format!("starting commit '{spec}' not found."),
                )
            })?;
            return Ok((id, false));
        }
        if let Some(name) = &self.policy.starting_branch {
            let remote = format!("{}/{name}", self.policy.remote_name);
            let id = match self.repo.branch_tip(name)? {
                Some(id) => id,
                None => self.repo.branch_tip(&remote)?.ok_or_else(|| {
                    Error::resolve(
                        ErrorCode::BranchNotFound,
                        format!("starting branch '{name}' not found (nor '{remote}')."),
                    )
                })?,
            };
            return Ok((id, false));
        }
        let id = self.repo.head()?.ok_or_else(|| {
            Error::resolve(
                ErrorCode::UninitializedRepository,
                "HEAD does not point at a commit.",
            )
        })?;
        Ok((id, true))
    }

    /// Check the commit's own tag against the window of the view where that
    /// version does not exist yet.
    fn validate_release(
        &mut self,
        tag: &TagCommit,
        catalog: &Catalog,
        rules: &WindowRules,
        lineage: &mut Lineage<'_>,
    ) -> Result<(), Error> {
        let version = &tag.version;
        let below = lineage.get(tag.commit, Some(version))?;
        let floor = below.best_version(catalog);
        let possible = possible_versions(catalog, rules, floor, Some(version));
        self.result.release_tag = Some(TagRef::from(tag));
        self.result.possible_versions.clone_from(&possible);

        if possible.contains(version) {
            return Ok(());
        }
        Err(reject_release(&tag.name, version, floor, &possible, catalog, rules))
    }

    fn ci_version(
        &mut self,
        id: GitOid,
        is_head: bool,
        catalog: &Catalog,
        here: &LineageInfo,
    ) -> Result<CiVersion, Error> {
        let branch = ci::select_branch(self.repo, self.policy, id, is_head)?;
        self.result.branch = Some(branch.name.clone());
        ci::ensure_enabled(branch)?;
        let time = self.time.unwrap_or_default();
        Ok(ci::synthesize(
            branch,
            here.best_version(catalog),
            here.depth(),
            time,
        )?)
    }

    /// The `release_from` threshold of the commit's branch, when one is
    /// configured. A release tag does not need a branch.
    fn branch_threshold(
        &mut self,
        id: GitOid,
        is_head: bool,
    ) -> Result<Option<PreReleaseKind>, Error> {
        match ci::select_branch(self.repo, self.policy, id, is_head) {
            Ok(branch) => {
                self.result.branch = Some(branch.name.clone());
                Ok(branch.release_from)
            }
            Err(Error::Resolve(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Content already released: refuse, except for a release-anchored CI
    /// build right on the released content whose configuration differs.
    fn guard_already_existing(
        &self,
        existing: &TagCommit,
        threshold: Option<PreReleaseKind>,
    ) -> Result<(), Error> {
        if let Some(ci) = &self.result.ci_version
            && ci.release_anchored
            && ci.depth == 0
        {
            let released = (self.classify)(&Classify::Tag {
                version: &existing.version,
                threshold,
            });
            if released != self.result.build_configuration {
                return Ok(());
            }
        }
        Err(Error::resolve(
            ErrorCode::AlreadyExistingVersion,
            format!(
                "this content was already released as '{}' on commit {}.",
                existing.name,
                existing.commit.short()
            ),
        ))
    }

    fn fail(&mut self, err: ResolveError) {
        self.result.final_version = ZERO_VERSION.to_owned();
        self.result.build_configuration = BuildConfiguration::Debug;
        self.result.error = Some(err);
    }

    fn finish(&mut self) {
        self.result.informational_version = match (&self.result.commit, self.time) {
            (Some(sha), Some(time)) => format!(
                "{}/{sha}/{}",
                self.result.final_version,
                time.format("%Y-%m-%d %H:%M:%SZ")
            ),
            _ => self.result.final_version.clone(),
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// The error for a release of `version` named `name` above `floor` that is
/// not in `possible`. A filter conflict is only reported when the version
/// would be legal without the `single_major` and `only_patch` filters.
fn reject_release(
    name: &str,
    version: &Version,
    floor: Option<&Version>,
    possible: &[Version],
    catalog: &Catalog,
    rules: &WindowRules,
) -> Error {
    let floor_text = floor.map_or_else(|| "no version".to_owned(), ToString::to_string);
    let legal = possible_versions(catalog, &rules.unfiltered(), floor, Some(version))
        .contains(version);
    if legal && !rules.allows_major(version) {
        return Error::resolve(
            ErrorCode::ReleaseTagConflictsWithSingleMajor,
            format!(
                "release tag '{name}' is outside single major {}.",
                rules.single_major.unwrap_or_default()
            ),
        );
    }
    if legal && !rules.allows_patch(floor, version) {
        return Error::resolve(
            ErrorCode::ReleaseTagConflictsWithOnlyPatch,
            format!(
                "release tag '{name}' is not a patch of {floor_text} and only patches are allowed."
            ),
        );
    }
    let listed: Vec<String> = possible.iter().map(ToString::to_string).collect();
    Error::resolve(
        ErrorCode::ReleaseTagIsNotPossible,
        format!(
            "release tag '{name}' cannot follow {floor_text}.\n  Possible versions: {}",
            if listed.is_empty() {
                "none".to_owned()
            } else {
                listed.join(", ")
            }
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::default_classifier;
    use crate::config::{BranchPolicy, CiMode};
    use gitstamp_git::MemoryRepo;

    fn develop_policy() -> Policy {
        Policy {
            branches: vec![BranchPolicy::new("develop", CiMode::ReleaseAnchored)],
            ..Policy::default()
        }
    }

    #[test]
    fn unborn_head_is_uninitialized() {
        let repo = MemoryRepo::new();
        let result = resolve(&repo, &Policy::default(), &default_classifier).unwrap();
        assert_eq!(result.error_code(), Some(ErrorCode::UninitializedRepository));
        assert_eq!(result.final_version, ZERO_VERSION);
        assert_eq!(result.informational_version, ZERO_VERSION);
        assert_eq!(result.commit, None);
    }

    #[test]
    fn tagged_head_resolves_to_tag() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.tag("v1.0.0", c);
        repo.branch("main", c);
        repo.checkout("main");

        let result = resolve(&repo, &Policy::default(), &default_classifier).unwrap();
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.final_version, "1.0.0");
        assert_eq!(result.build_configuration, BuildConfiguration::Release);
        assert_eq!(result.release_tag.as_ref().unwrap().name, "v1.0.0");
        assert_eq!(result.branch, None);
        assert!(result.informational_version.starts_with(&format!("1.0.0/{c}/")));
        assert!(result.informational_version.ends_with('Z'));
    }

    #[test]
    fn dirty_head_is_refused_unless_ignored() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.tag("v1.0.0", c);
        repo.branch("main", c);
        repo.checkout("main");
        repo.set_dirty(true);

        let result = resolve(&repo, &Policy::default(), &default_classifier).unwrap();
        assert_eq!(result.error_code(), Some(ErrorCode::DirtyWorkingFolder));

        let policy = Policy {
            ignore_dirty_working_folder: true,
            ..Policy::default()
        };
        let result = resolve(&repo, &policy, &default_classifier).unwrap();
        assert_eq!(result.final_version, "1.0.0");

        let policy = Policy {
            starting_commit: Some(c.to_string()),
            ..Policy::default()
        };
        let result = resolve(&repo, &policy, &default_classifier).unwrap();
        assert!(result.is_ok(), "dirty tree only matters for HEAD");
    }

    #[test]
    fn ci_version_on_develop() {
        let mut repo = MemoryRepo::new();
        let base = repo.commit(&[]);
        repo.tag("v1.0.0", base);
        let ids = repo.chain(base, 3);
        repo.branch("develop", ids[2]);
        repo.checkout("develop");

        let result = resolve(&repo, &develop_policy(), &default_classifier).unwrap();
        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.final_version, "1.0.1--0003-develop");
        assert_eq!(result.branch.as_deref(), Some("develop"));
        assert_eq!(result.build_configuration, BuildConfiguration::Debug);
        assert_eq!(result.possible_versions, result.next_possible_versions);
        assert_eq!(
            result.best_commit_below.as_ref().map(|t| t.version),
            Some(Version::new(1, 0, 0))
        );
    }

    #[test]
    fn missing_targets_are_reported() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.branch("main", c);
        repo.checkout("main");

        let policy = Policy {
            starting_commit: Some("nope".to_owned()),
            ..Policy::default()
        };
        let result = resolve(&repo, &policy, &default_classifier).unwrap();
        assert_eq!(result.error_code(), Some(ErrorCode::CommitNotFound));

        let policy = Policy {
            starting_branch: Some("nope".to_owned()),
            ..Policy::default()
        };
        let result = resolve(&repo, &policy, &default_classifier).unwrap();
        assert_eq!(result.error_code(), Some(ErrorCode::BranchNotFound));
    }
}
