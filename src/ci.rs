//! CI pseudo-versions for commits without a release tag.
//!
//! Two shapes, chosen by the branch's [`CiMode`]:
//!
//! - release-anchored: `1.0.1--0003-develop`, three commits past `1.0.0`;
//! - time-anchored: `0.0.0--<time>-develop[+1.0.0]`, ordered by commit
//!   time. Also used by release-anchored branches before the first release.
//!
//! The branch is picked from the configured `starting_branch`, the checked
//! out branch, or (detached HEAD, as CI servers check out) the branches that
//! point at the commit.

use chrono::{DateTime, Utc};
use gitstamp_git::{GitOid, Repository};
use gitstamp_version::{Version, zero_timed};
use serde::Serialize;
use tracing::debug;

use crate::config::{BranchPolicy, CiMode, MAX_LABEL_LEN, Policy};
use crate::error::{Error, ErrorCode, ResolveError};

/// A synthesized CI build version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CiVersion {
    /// The release the build counts from, if any.
    pub base: Option<Version>,
    /// Commits between `base` and the build (longest path).
    pub depth: u32,
    pub version: String,
    /// `true` for `<next>--<depth>-<label>`, `false` for zero-timed.
    pub release_anchored: bool,
    pub label: String,
}

/// Build the CI version of a commit.
///
/// `base`/`depth` come from the lineage walk; `time` is the commit time.
///
/// # Errors
/// `CiBranchNameTooLong` if the branch label exceeds the allowed length.
pub fn synthesize(
    branch: &BranchPolicy,
    base: Option<&Version>,
    depth: u32,
    time: DateTime<Utc>,
) -> Result<CiVersion, ResolveError> {
    let label = branch.label();
    if label.chars().count() > MAX_LABEL_LEN {
        let hint = if branch.label.is_some() { "label" } else { "branch name" };
        return Err(ResolveError::new(
            ErrorCode::CiBranchNameTooLong,
            format!(
                "{hint} '{label}' of branch '{}' is longer than {MAX_LABEL_LEN} characters.",
                branch.name
            ),
        ));
    }

    let ci = match (branch.ci_mode, base) {
        (CiMode::ReleaseAnchored, Some(base)) => CiVersion {
            base: Some(*base),
            depth,
            version: base.ci_build(label, depth),
            release_anchored: true,
            label: label.to_owned(),
        },
        _ => CiVersion {
            base: base.copied(),
            depth,
            version: zero_timed(label, time, base),
            release_anchored: false,
            label: label.to_owned(),
        },
    };
    debug!(branch = %branch.name, version = %ci.version, "ci version");
    Ok(ci)
}

/// The branch names that may describe `commit`, most specific first.
///
/// # Errors
/// Repository read errors.
pub fn candidate_branches(
    repo: &dyn Repository,
    policy: &Policy,
    commit: GitOid,
    target_is_head: bool,
) -> Result<Vec<String>, Error> {
    if let Some(name) = &policy.starting_branch {
        return Ok(vec![name.clone()]);
    }
    if target_is_head && let Some(name) = repo.head_branch()? {
        return Ok(vec![name]);
    }

    let prefix = format!("{}/", policy.remote_name);
    let mut names: Vec<String> = Vec::new();
    for name in repo.branches_pointing_at(commit)? {
        let name = name
            .strip_prefix(&prefix)
            .map_or_else(|| name.clone(), str::to_owned);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// The configured branch that applies to `commit`: the first entry of the
/// policy table among the candidate branches.
///
/// # Errors
/// `CiDetachedHead` when no branch describes the commit,
/// `CiNoBranchConfiguration` when none of them is configured.
pub fn select_branch<'p>(
    repo: &dyn Repository,
    policy: &'p Policy,
    commit: GitOid,
    target_is_head: bool,
) -> Result<&'p BranchPolicy, Error> {
    let names = candidate_branches(repo, policy, commit, target_is_head)?;
    if names.is_empty() {
        return Err(Error::resolve(
            ErrorCode::CiDetachedHead,
            format!("no branch points at commit {}.", commit.short()),
        ));
    }
    policy
        .branches
        .iter()
        .find(|b| names.contains(&b.name))
        .ok_or_else(|| {
            Error::resolve(
                ErrorCode::CiNoBranchConfiguration,
                format!("no configuration for branch(es) {}.", names.join(", ")),
            )
        })
}

/// Reject a branch whose CI mode is disabled.
///
/// # Errors
/// `CiDisabledOnBranch`.
pub fn ensure_enabled(branch: &BranchPolicy) -> Result<(), ResolveError> {
    if branch.ci_mode == CiMode::Disabled {
        return Err(ResolveError::new(
            ErrorCode::CiDisabledOnBranch,
            format!("CI versions are disabled on branch '{}'.", branch.name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gitstamp_git::MemoryRepo;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_164_645, 0).unwrap()
    }

    fn code(err: Error) -> ErrorCode {
        match err {
            Error::Resolve(e) => e.code,
            Error::Git(e) => panic!("unexpected git error: {e}"),
        }
    }

    #[test]
    fn release_anchored_counts_from_base() {
        let develop = BranchPolicy::new("develop", CiMode::ReleaseAnchored);
        let ci = synthesize(&develop, Some(&v("1.0.0")), 3, time()).unwrap();
        assert_eq!(ci.version, "1.0.1--0003-develop");
        assert!(ci.release_anchored);
        assert_eq!(ci.base, Some(v("1.0.0")));
        assert_eq!(ci.depth, 3);
    }

    #[test]
    fn release_anchored_without_base_falls_back_to_time() {
        let develop = BranchPolicy::new("develop", CiMode::ReleaseAnchored);
        let ci = synthesize(&develop, None, 4, time()).unwrap();
        assert!(!ci.release_anchored);
        assert!(ci.version.starts_with("0.0.0--"), "{}", ci.version);
        assert!(ci.version.ends_with("-develop"), "{}", ci.version);
    }

    #[test]
    fn time_anchored_carries_base_as_metadata() {
        let mut feature = BranchPolicy::new("feature/long-name", CiMode::TimeAnchored);
        feature.label = Some("feat".to_owned());
        let ci = synthesize(&feature, Some(&v("1.2.0")), 2, time()).unwrap();
        assert!(!ci.release_anchored);
        assert!(ci.version.ends_with("-feat+1.2.0"), "{}", ci.version);
        assert_eq!(ci.label, "feat");
    }

    #[test]
    fn label_longer_than_eight_is_rejected() {
        let branch = BranchPolicy::new("features", CiMode::TimeAnchored);
        assert!(synthesize(&branch, None, 0, time()).is_ok());

        let branch = BranchPolicy::new("feature-x", CiMode::TimeAnchored);
        let err = synthesize(&branch, None, 0, time()).unwrap_err();
        assert_eq!(err.code, ErrorCode::CiBranchNameTooLong);
        assert!(err.message.contains("feature-x"));
    }

    #[test]
    fn disabled_branch_is_rejected() {
        let branch = BranchPolicy::new("main", CiMode::Disabled);
        let err = ensure_enabled(&branch).unwrap_err();
        assert_eq!(err.code, ErrorCode::CiDisabledOnBranch);
        assert!(ensure_enabled(&BranchPolicy::new("dev", CiMode::TimeAnchored)).is_ok());
    }

    #[test]
    fn selects_checked_out_branch() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.branch("develop", c);
        repo.branch("main", c);
        repo.checkout("develop");

        let policy = Policy {
            branches: vec![
                BranchPolicy::new("main", CiMode::Disabled),
                BranchPolicy::new("develop", CiMode::ReleaseAnchored),
            ],
            ..Policy::default()
        };
        let branch = select_branch(&repo, &policy, c, true).unwrap();
        assert_eq!(branch.name, "develop");
    }

    #[test]
    fn detached_head_uses_branches_in_policy_order() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.remote_branch("origin", "develop", c);
        repo.remote_branch("origin", "main", c);
        repo.detach(c);

        let policy = Policy {
            branches: vec![
                BranchPolicy::new("develop", CiMode::ReleaseAnchored),
                BranchPolicy::new("main", CiMode::Disabled),
            ],
            ..Policy::default()
        };
        assert_eq!(
            candidate_branches(&repo, &policy, c, true).unwrap(),
            ["develop", "main"]
        );
        let branch = select_branch(&repo, &policy, c, true).unwrap();
        assert_eq!(branch.name, "develop");
    }

    #[test]
    fn starting_branch_wins() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.branch("main", c);
        repo.checkout("main");
        let policy = Policy {
            starting_branch: Some("release".to_owned()),
            branches: vec![
                BranchPolicy::new("main", CiMode::TimeAnchored),
                BranchPolicy::new("release", CiMode::ReleaseAnchored),
            ],
            ..Policy::default()
        };
        assert_eq!(select_branch(&repo, &policy, c, true).unwrap().name, "release");
    }

    #[test]
    fn no_branch_is_detached_head() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.detach(c);
        let err = select_branch(&repo, &Policy::default(), c, true).unwrap_err();
        assert_eq!(code(err), ErrorCode::CiDetachedHead);
    }

    #[test]
    fn unconfigured_branch_is_reported() {
        let mut repo = MemoryRepo::new();
        let c = repo.commit(&[]);
        repo.branch("topic", c);
        repo.checkout("topic");
        let err = select_branch(&repo, &Policy::default(), c, true).unwrap_err();
        assert_eq!(code(err), ErrorCode::CiNoBranchConfiguration);
    }
}
